mod common;

use std::fs;
use std::path::PathBuf;

use arena_ext_sort::sort::ExternalSort;

fn run_sort(dir: &PathBuf, tag: &str, input: &[u8]) -> Vec<u8> {
    let input_path = dir.join(format!("in_{tag}.txt"));
    let output_path = dir.join(format!("out_{tag}.txt"));
    fs::write(&input_path, input).unwrap();

    let mut sort = ExternalSort::new(input_path, output_path.clone());
    sort.with_tmp_dir(dir.join(format!("tmp_{tag}")));
    sort.with_max_memory_usage_bytes(8192);
    sort.with_max_write_buffer_bytes(1024);
    sort.with_max_files_per_phase(4);
    sort.sort().unwrap();

    fs::read(&output_path).unwrap()
}

#[test]
fn output_is_a_permutation_of_input_records() {
    let dir = tempfile::tempdir().unwrap();
    let records = common::random_records(300, 12);
    let mut input = String::new();
    for r in &records {
        input.push_str(r);
        input.push('\n');
    }

    let output = run_sort(dir.path(), "perm", input.as_bytes());
    let output_str = String::from_utf8(output).unwrap();
    let mut actual: Vec<&str> = output_str.lines().collect();
    let mut expected: Vec<&str> = records.iter().map(String::as_str).collect();
    actual.sort();
    expected.sort();
    assert_eq!(actual, expected);
}

#[test]
fn output_byte_length_matches_input_and_keeps_trailing_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let input = b"banana\napple\ncherry\n".to_vec();
    let output = run_sort(dir.path(), "len", &input);
    assert_eq!(output.len(), input.len());
    assert_eq!(*output.last().unwrap(), b'\n');
}

#[test]
fn sorting_is_deterministic_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let records = common::random_records(500, 16);
    let mut input = String::new();
    for r in &records {
        input.push_str(r);
        input.push('\n');
    }

    let first = run_sort(dir.path(), "det1", input.as_bytes());
    let second = run_sort(dir.path(), "det2", input.as_bytes());
    assert_eq!(first, second);
}

#[test]
fn sorting_an_already_sorted_file_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let input = b"a\nb\nc\nd\ne\n".to_vec();
    let output = run_sort(dir.path(), "idem", &input);
    assert_eq!(output, input);
}

use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use data_encoding::HEXLOWER;

#[allow(dead_code)]
pub fn read_lines(path: &PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &PathBuf) -> PathBuf {
    let mut result = dir.clone();
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

#[allow(dead_code)]
pub fn write_records(path: &PathBuf, records: &[String]) {
    let mut file = File::create(path).unwrap();
    for record in records {
        writeln!(file, "{record}").unwrap();
    }
}

#[allow(dead_code)]
pub fn random_records(count: usize, len: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let bytes: Vec<u8> = (0..len).map(|_| b'a' + rand::random::<u8>() % 26).collect();
            String::from_utf8(bytes).unwrap()
        })
        .collect()
}

#[allow(dead_code)]
pub fn ensure_dir(path: &PathBuf) {
    fs::create_dir_all(path).unwrap();
}

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use log::info;

use crate::config::Config;
use crate::fs_util;
use crate::merger::{merge_runs, MergeReport};
use crate::run_generator::generate_runs;
use crate::temp_paths::TempPathSource;

/// Totals returned from a completed [`ExternalSort::sort`] run: how many
/// sorted runs the generator produced and how the merge phase spent its
/// work. An addition beyond the distilled CLI-only interface, justified
/// because the teacher's own `Sort` exposes a rich builder API rather than
/// only a binary (`SPEC_FULL.md` §6).
#[derive(Default, Debug, Clone, Copy)]
pub struct SortReport {
    pub runs_generated: usize,
    pub merge_tasks: usize,
    pub bytes_merged: u64,
}

/// Memory-bounded external sort of a line-delimited text file.
///
/// # Examples
/// ```no_run
/// use std::path::PathBuf;
/// use arena_ext_sort::sort::ExternalSort;
///
/// fn sort_file(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut external_sort = ExternalSort::new(input, output);
///
///     // bound total resident bytes used by the sort/merge buffers
///     external_sort.with_max_memory_usage_bytes(16 * 1024 * 1024);
///
///     // directory for intermediate runs; defaults to std::env::temp_dir()
///     external_sort.with_tmp_dir(tmp);
///
///     external_sort.sort().map(|_report| ())
/// }
/// ```
pub struct ExternalSort {
    input: PathBuf,
    output: PathBuf,
    tmp_dir: PathBuf,
    max_memory_usage_bytes: usize,
    max_write_buffer_bytes: usize,
    max_files_per_phase: usize,
    delimiter: u8,
    remove_temp_files: bool,
}

impl ExternalSort {
    /// Creates a default sort definition.
    ///
    /// Defaults: 16 MiB arena, 128 KiB write-buffer cap, 16 files merged per
    /// phase, `\n` delimiter, the system temp directory, and temp-file
    /// cleanup enabled.
    pub fn new(input: PathBuf, output: PathBuf) -> ExternalSort {
        let defaults = Config::default();
        ExternalSort {
            input,
            output,
            tmp_dir: defaults.temp_dir,
            max_memory_usage_bytes: defaults.arena_bytes,
            max_write_buffer_bytes: defaults.max_write_buffer_bytes,
            max_files_per_phase: defaults.max_files_per_phase,
            delimiter: defaults.delimiter,
            remove_temp_files: defaults.remove_temp_files,
        }
    }

    pub fn with_tmp_dir(&mut self, tmp_dir: PathBuf) -> &mut ExternalSort {
        self.tmp_dir = tmp_dir;
        self
    }

    pub fn with_max_memory_usage_bytes(&mut self, bytes: usize) -> &mut ExternalSort {
        self.max_memory_usage_bytes = bytes;
        self
    }

    pub fn with_max_write_buffer_bytes(&mut self, bytes: usize) -> &mut ExternalSort {
        self.max_write_buffer_bytes = bytes;
        self
    }

    pub fn with_max_files_per_phase(&mut self, files: usize) -> &mut ExternalSort {
        self.max_files_per_phase = files;
        self
    }

    pub fn with_delimiter(&mut self, delimiter: u8) -> &mut ExternalSort {
        self.delimiter = delimiter;
        self
    }

    pub fn with_remove_temp_files(&mut self, remove: bool) -> &mut ExternalSort {
        self.remove_temp_files = remove;
        self
    }

    fn create_config(&self) -> Config {
        Config {
            arena_bytes: self.max_memory_usage_bytes,
            max_write_buffer_bytes: self.max_write_buffer_bytes,
            max_files_per_phase: self.max_files_per_phase,
            delimiter: self.delimiter,
            temp_dir: self.tmp_dir.clone(),
            remove_temp_files: self.remove_temp_files,
        }
    }

    /// Runs the sort: partitions one arena, streams `input` into sorted
    /// runs, then phase-merges the runs into `output`.
    pub fn sort(&self) -> Result<SortReport> {
        let config = self.create_config();

        if !fs_util::exists(&self.input) {
            return Err(anyhow!("input file does not exist: {}", self.input.display()));
        }
        if fs_util::exists(&self.output) {
            return Err(anyhow!("output file already exists: {}", self.output.display()));
        }
        if config.arena_bytes == 0 {
            return Err(anyhow!("max memory usage must be at least 1 byte"));
        }
        if config.max_files_per_phase < 2 {
            return Err(anyhow!("max files per phase must be at least 2"));
        }

        let timestamp_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let run_dir = fs_util::create_unique_subdir(&config.temp_dir, timestamp_nanos)
            .with_context(|| format!("preparing temp dir under {}", config.temp_dir.display()))?;
        let temp_paths = TempPathSource::new(run_dir)
            .with_context(|| format!("preparing temp dir under {}", config.temp_dir.display()))?;

        info!("sorting {} into {}", self.input.display(), self.output.display());
        let runs = generate_runs(
            &self.input,
            config.arena_bytes,
            config.max_write_buffer_bytes,
            config.delimiter,
            &temp_paths,
        )?;
        let runs_generated = runs.len();

        let MergeReport { merge_tasks, bytes_merged } = merge_runs(
            runs,
            &self.output,
            config.arena_bytes,
            config.max_write_buffer_bytes,
            config.max_files_per_phase,
            config.delimiter,
            &temp_paths,
            config.remove_temp_files,
        )?;

        if config.remove_temp_files {
            let _ = fs_util::remove_dir_all(temp_paths.dir());
        }

        info!(
            "sort complete: {} run(s), {} merge task(s), {} bytes merged",
            runs_generated, merge_tasks, bytes_merged
        );

        Ok(SortReport {
            runs_generated,
            merge_tasks,
            bytes_merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sorts_small_unsorted_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, b"banana\napple\ncherry\n").unwrap();

        let mut sort = ExternalSort::new(input, output.clone());
        sort.with_tmp_dir(dir.path().join("tmp"));
        sort.with_max_memory_usage_bytes(4096);
        let report = sort.sort().unwrap();

        assert_eq!(fs::read(&output).unwrap(), b"apple\nbanana\ncherry\n");
        assert_eq!(report.runs_generated, 1);
    }

    #[test]
    fn sorts_empty_input_to_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, b"").unwrap();

        let mut sort = ExternalSort::new(input, output.clone());
        sort.with_tmp_dir(dir.path().join("tmp"));
        sort.sort().unwrap();

        assert_eq!(fs::read(&output).unwrap(), b"");
    }

    #[test]
    fn rejects_preexisting_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, b"a\n").unwrap();
        fs::write(&output, b"stale\n").unwrap();

        let mut sort = ExternalSort::new(input, output);
        sort.with_tmp_dir(dir.path().join("tmp"));
        assert!(sort.sort().is_err());
    }

    #[test]
    fn length_aware_order_places_shorter_prefix_first() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, b"ab\na\nabc\n").unwrap();

        let mut sort = ExternalSort::new(input, output.clone());
        sort.with_tmp_dir(dir.path().join("tmp"));
        sort.sort().unwrap();

        assert_eq!(fs::read(&output).unwrap(), b"a\nab\nabc\n");
    }
}

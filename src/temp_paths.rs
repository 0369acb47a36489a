use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::fs_util;

/// Generates distinct file paths under one run directory, named
/// `{role}_{timestamp}_{sequence}`. Grounded on the reference's
/// `SimpleFilePathsEnumerator`, which hands out `{prefix}{counter}{suffix}`
/// paths from a mutex-guarded counter; the timestamp component is added so
/// paths stay unique across process restarts sharing the same directory.
pub(crate) struct TempPathSource {
    dir: PathBuf,
    timestamp: u128,
    sequence: Mutex<u64>,
}

impl TempPathSource {
    pub(crate) fn new(dir: PathBuf) -> Result<TempPathSource> {
        fs_util::ensure_dir_exists(&dir)?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Ok(TempPathSource {
            dir,
            timestamp,
            sequence: Mutex::new(0),
        })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the next path for `role` (`"sort"` or `"merge"`, per
    /// `SPEC_FULL.md` §6); never repeats within the lifetime of this source.
    pub(crate) fn next_path(&self, role: &str) -> PathBuf {
        let mut guard = self.sequence.lock().expect("temp path sequence mutex poisoned");
        let seq = *guard;
        *guard += 1;
        self.dir.join(format!("{role}_{}_{seq}", self.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_distinct_and_role_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let source = TempPathSource::new(dir.path().to_path_buf()).unwrap();
        let a = source.next_path("sort");
        let b = source.next_path("sort");
        let c = source.next_path("merge");
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("sort_"));
        assert!(c.file_name().unwrap().to_str().unwrap().starts_with("merge_"));
    }
}

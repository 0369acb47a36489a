use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Filesystem helpers used by the driver and the run generator/merger.
/// Grounded on the reference's `Utils::Fs` module (same responsibilities:
/// existence, size, atomic rename, recursive remove, unique directory
/// creation) but implemented with native `std::fs` calls rather than
/// shelling out to `mkdir`/`mv`/`rm` (see `SPEC_FULL.md` §9).
pub(crate) fn exists(path: &Path) -> bool {
    path.exists()
}

pub(crate) fn size(path: &Path) -> Result<u64> {
    Ok(path
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len())
}

/// Opens `path` for writing, failing if it already exists.
pub(crate) fn create_new_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("create {}", path.display()))
}

pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("mkdir -p {}", path.display()))
}

pub(crate) fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).with_context(|| format!("rename {} -> {}", from.display(), to.display()))
}

pub(crate) fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("remove {}", path.display()))
}

pub(crate) fn remove_dir_all(path: &Path) -> Result<()> {
    fs::remove_dir_all(path).with_context(|| format!("rmdir -r {}", path.display()))
}

pub(crate) fn append_path(parent: &Path, child: &str) -> PathBuf {
    parent.join(child)
}

/// Creates a fresh subdirectory of `temp_dir` named after the current
/// monotonic timestamp, matching the reference's
/// `AppendPath(tempDirPath, now.time_since_epoch())` scheme.
pub(crate) fn create_unique_subdir(temp_dir: &Path, timestamp_nanos: u128) -> Result<PathBuf> {
    let unique = append_path(temp_dir, &timestamp_nanos.to_string());
    if exists(&unique) {
        return Err(anyhow!("temp dir already exists: {}", unique.display()));
    }
    ensure_dir_exists(&unique)?;
    Ok(unique)
}

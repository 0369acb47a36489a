//! A memory-bounded external sort for line-delimited text files: CSV, TSV,
//! pg_dump, GTFS, or any other data file composed of records separated by a
//! single delimiter byte.
//!
//! The input is streamed through a fixed-size byte arena in two phases: a
//! run generator partitions the arena into descriptor storage and a read
//! buffer, sorting as many records as fit before writing each batch out as a
//! sorted run file; a phased k-way merger then partitions the same arena
//! into per-run read buffers and merges the runs down to the requested
//! output, respecting a configured cap on files merged per phase.
//!
//! # Examples
//! ```no_run
//! use std::path::PathBuf;
//! use arena_ext_sort::sort::ExternalSort;
//!
//! fn sort_file(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut external_sort = ExternalSort::new(input, output);
//!
//!     // bound total resident bytes used by the sort/merge buffers
//!     external_sort.with_max_memory_usage_bytes(16 * 1024 * 1024);
//!
//!     // directory for intermediate runs; defaults to std::env::temp_dir()
//!     external_sort.with_tmp_dir(tmp);
//!
//!     external_sort.sort().map(|_report| ())
//! }
//! ```

pub(crate) mod arena;
pub(crate) mod chunk_enumerator;
pub(crate) mod config;
pub(crate) mod fs_util;
pub(crate) mod merge_sort;
pub(crate) mod merger;
pub(crate) mod record;
pub(crate) mod run_generator;
pub(crate) mod temp_paths;

pub mod sort;

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::arena::partition_sort_arena;
use crate::chunk_enumerator::ChunkEnumerator;
use crate::fs_util;
use crate::merge_sort::merge_sort;
use crate::record::{compare_records, RecordSlice};
use crate::temp_paths::TempPathSource;

/// Accumulated, not-yet-flushed record descriptors plus the completed run
/// paths. Held behind a `RefCell` so both the main accumulation loop and the
/// enumerator's pre-read observer closure can reach it without the closure
/// holding an exclusive borrow across `next_record` calls it doesn't
/// participate in.
struct FlushState {
    live: Vec<RecordSlice>,
    scratch: Vec<RecordSlice>,
    runs: Vec<PathBuf>,
}

/// Streams `input` through the chunk enumerator, accumulating record
/// descriptors in the arena's descriptor area until it is full or the
/// buffer is about to be refilled, sorting each batch and writing it out as
/// a fresh run file. Grounded on the sort phase of the reference's
/// `MergeSortSorter`, reorganized around a pre-read observer closure rather
/// than a named event (see `SPEC_FULL.md` §4.2, §9).
///
/// `arena_len` is a byte *budget*, not a pre-allocated buffer: the read
/// buffer, the live/scratch descriptor vectors, and the output write buffer
/// are each sized from `partition_sort_arena`'s split of that budget and
/// allocated only at their own size, so the three together — not a separate
/// full-`arena_len` allocation plus those three on top of it — account for
/// the whole resident footprint (`SPEC_FULL.md` §8 bound-compliance).
pub(crate) fn generate_runs(
    input: &Path,
    arena_len: usize,
    max_write_buffer_bytes: usize,
    delimiter: u8,
    temp_paths: &TempPathSource,
) -> Result<Vec<PathBuf>> {
    let layout = partition_sort_arena(arena_len, max_write_buffer_bytes)?;

    let input_size = fs_util::size(input)?;
    if input_size == 0 {
        let empty_run = temp_paths.next_path("sort");
        fs_util::create_new_file(&empty_run)?;
        info!("run generator: empty input, wrote empty run {}", empty_run.display());
        return Ok(vec![empty_run]);
    }

    let mut read_buffer = vec![0u8; layout.read_buffer_bytes];

    let state = RefCell::new(FlushState {
        live: Vec::with_capacity(layout.live_capacity),
        scratch: Vec::with_capacity(layout.scratch_capacity),
        runs: Vec::new(),
    });

    {
        let mut enumerator = ChunkEnumerator::open(input, &mut read_buffer, delimiter)?;
        enumerator.set_observer(|valid| {
            let mut s = state.borrow_mut();
            flush(&mut s, valid, layout.write_buffer_bytes, delimiter, temp_paths)
        });

        loop {
            match enumerator.next_record()? {
                Some(slice) => {
                    let mut s = state.borrow_mut();
                    s.live.push(slice);
                    let at_capacity = s.live.len() == layout.live_capacity;
                    drop(s);
                    if at_capacity {
                        let mut s = state.borrow_mut();
                        flush(&mut s, enumerator.buffer(), layout.write_buffer_bytes, delimiter, temp_paths)?;
                    }
                }
                None => break,
            }
        }

        // Any descriptors accumulated since the last flush still reference
        // the enumerator's buffer, which is untouched since `next_record`
        // returned `None` (no further refill happens past EOF); flush them
        // here, while the enumerator and its buffer are still alive.
        let mut s = state.borrow_mut();
        flush(&mut s, enumerator.buffer(), layout.write_buffer_bytes, delimiter, temp_paths)?;
    }

    let mut s = state.into_inner();
    if s.runs.is_empty() {
        let empty_run = temp_paths.next_path("sort");
        fs_util::create_new_file(&empty_run)?;
        s.runs.push(empty_run);
    }

    info!("run generator: produced {} run(s) from {}", s.runs.len(), input.display());
    Ok(s.runs)
}

fn flush(
    state: &mut FlushState,
    buffer: &[u8],
    write_buffer_bytes: usize,
    delimiter: u8,
    temp_paths: &TempPathSource,
) -> Result<()> {
    if state.live.is_empty() {
        return Ok(());
    }

    state.scratch.resize(state.live.len(), RecordSlice::new(0, 0));
    merge_sort(&mut state.live, &mut state.scratch, &|a, b| {
        compare_records(a.bytes(buffer), b.bytes(buffer)) == std::cmp::Ordering::Less
    });

    let path = temp_paths.next_path("sort");
    let file = fs_util::create_new_file(&path)?;
    let mut writer = BufWriter::with_capacity(write_buffer_bytes.max(1), file);
    for slice in state.live.iter() {
        writer.write_all(slice.bytes(buffer)).with_context(|| format!("write run {}", path.display()))?;
        writer.write_all(&[delimiter]).with_context(|| format!("write run {}", path.display()))?;
    }
    writer.flush().with_context(|| format!("flush run {}", path.display()))?;

    state.live.clear();
    state.runs.push(path);
    Ok(())
}

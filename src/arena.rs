use anyhow::{anyhow, Result};

use crate::record::RecordSlice;

/// Byte layout of the arena during the sort (run-generation) phase: a write
/// buffer, a descriptor capacity (split into a live half and a merge-sort
/// scratch half), and a read buffer. Descriptors are kept in their own
/// `Vec<RecordSlice>` rather than reinterpreted in place inside the byte
/// arena (see `SPEC_FULL.md` §4.2), so only the write and read buffer sizes
/// are byte ranges of the arena; `live_capacity`/`scratch_capacity` size the
/// descriptor `Vec`s instead.
pub(crate) struct SortArenaLayout {
    pub(crate) write_buffer_bytes: usize,
    pub(crate) read_buffer_bytes: usize,
    pub(crate) live_capacity: usize,
    pub(crate) scratch_capacity: usize,
}

pub(crate) fn partition_sort_arena(arena_len: usize, max_write_buffer_bytes: usize) -> Result<SortArenaLayout> {
    if arena_len == 0 {
        return Err(anyhow!("arena is empty"));
    }

    let write_buffer_bytes = max_write_buffer_bytes.min(arena_len / 10).max(1).min(arena_len);
    let remaining = arena_len - write_buffer_bytes;
    let descriptor_region_bytes = remaining / 2;
    let read_buffer_bytes = remaining - descriptor_region_bytes;

    if read_buffer_bytes == 0 {
        return Err(anyhow!(
            "arena of {arena_len} bytes is too small to carve out a read buffer (write buffer took {write_buffer_bytes} bytes)"
        ));
    }

    let descriptor_size = std::mem::size_of::<RecordSlice>();
    let descriptor_capacity = descriptor_region_bytes / descriptor_size;
    if descriptor_capacity < 2 {
        return Err(anyhow!(
            "arena of {arena_len} bytes leaves only {descriptor_region_bytes} bytes for record descriptors, not enough for a single live/scratch pair"
        ));
    }

    let live_capacity = descriptor_capacity / 2 - (descriptor_capacity % 2);
    let scratch_capacity = descriptor_capacity - live_capacity;

    Ok(SortArenaLayout {
        write_buffer_bytes,
        read_buffer_bytes,
        live_capacity,
        scratch_capacity,
    })
}

/// Byte layout of the arena for one merge task: a write buffer and `n`
/// equally sized (modulo a one-byte-per-buffer remainder) read buffers, one
/// per input run.
pub(crate) struct MergeArenaLayout {
    pub(crate) write_buffer_bytes: usize,
    pub(crate) read_buffer_sizes: Vec<usize>,
}

pub(crate) fn partition_merge_arena(
    arena_len: usize,
    max_write_buffer_bytes: usize,
    inputs: usize,
) -> Result<MergeArenaLayout> {
    if inputs == 0 {
        return Err(anyhow!("merge task has no inputs"));
    }

    let write_buffer_bytes = max_write_buffer_bytes
        .min(arena_len / (inputs + 1))
        .max(1)
        .min(arena_len);
    let remaining = arena_len - write_buffer_bytes;

    if remaining < inputs {
        return Err(anyhow!(
            "buffer too small: {remaining} bytes remain for {inputs} read buffers"
        ));
    }

    let base = remaining / inputs;
    let remainder = remaining % inputs;
    let read_buffer_sizes: Vec<usize> = (0..inputs)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect();

    Ok(MergeArenaLayout {
        write_buffer_bytes,
        read_buffer_sizes,
    })
}

/// Split a mutable byte arena into `n` disjoint read buffers of the given
/// sizes, in one pass of successive `split_at_mut` calls so the borrow
/// checker can see the regions as non-overlapping. The write-buffer portion
/// of a layout is not carved out of the arena at all: `std::io::BufWriter`
/// owns its buffer internally, so the write-buffer byte count is used only
/// as a capacity hint passed to `BufWriter::with_capacity` (see
/// `run_generator.rs`/`merger.rs`), leaving the whole arena available for
/// read buffers.
pub(crate) fn split_read_buffers<'a>(arena: &'a mut [u8], read_lens: &[usize]) -> Vec<&'a mut [u8]> {
    let mut rest = arena;
    let mut read_buffers = Vec::with_capacity(read_lens.len());
    for &len in read_lens {
        let (head, tail) = rest.split_at_mut(len);
        read_buffers.push(head);
        rest = tail;
    }
    read_buffers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_layout_splits_write_buffer_as_minimum() {
        let layout = partition_sort_arena(1_000_000, 4_096).unwrap();
        assert_eq!(layout.write_buffer_bytes, 4_096);
        assert!(layout.read_buffer_bytes > 0);
        assert!(layout.live_capacity > 0);
        assert!(layout.scratch_capacity >= layout.live_capacity);
    }

    #[test]
    fn sort_layout_caps_write_buffer_at_one_tenth_arena() {
        let layout = partition_sort_arena(1_000, 1_000_000).unwrap();
        assert_eq!(layout.write_buffer_bytes, 100);
    }

    #[test]
    fn merge_layout_distributes_remainder_bytes() {
        let layout = partition_merge_arena(1_003, 10, 4).unwrap();
        assert_eq!(layout.read_buffer_sizes.len(), 4);
        let total: usize = layout.read_buffer_sizes.iter().sum();
        assert_eq!(total + layout.write_buffer_bytes, 1_003);
        // first (1003 - write_buffer) % 4 buffers get one extra byte
        let remaining = 1_003 - layout.write_buffer_bytes;
        let remainder = remaining % 4;
        for (i, &size) in layout.read_buffer_sizes.iter().enumerate() {
            if i < remainder {
                assert_eq!(size, remaining / 4 + 1);
            } else {
                assert_eq!(size, remaining / 4);
            }
        }
    }

    #[test]
    fn merge_layout_rejects_too_small_arena() {
        let result = partition_merge_arena(3, 1, 10);
        assert!(result.is_err());
    }

    #[test]
    fn split_read_buffers_produces_disjoint_regions() {
        let mut arena = vec![0u8; 90];
        let read_buffers = split_read_buffers(&mut arena, &[30, 30, 30]);
        assert_eq!(read_buffers.len(), 3);
        for rb in &read_buffers {
            assert_eq!(rb.len(), 30);
        }
    }
}

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::record::RecordSlice;

/// Reads as many bytes as the file has left, up to `buf.len()`, looping
/// past any short reads that are not end-of-file. Mirrors `fread`'s
/// "short count only at EOF or on error" contract, which the backward-scan
/// and short-read branches of [`ChunkEnumerator::next_record`] rely on.
fn fill_fully(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).context("reading input file")?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Lazily enumerates delimited record slices out of a read buffer backed by
/// a single open file, re-filling the buffer from disk as records are
/// consumed. Single-pass, non-restartable, and allocates nothing per
/// record: every yielded [`RecordSlice`] is a view into `buffer`.
pub(crate) struct ChunkEnumerator<'a> {
    file: Option<File>,
    buffer: &'a mut [u8],
    delimiter: u8,
    cur: usize,
    end: usize,
    tail_len: usize,
    eof: bool,
    observer: Option<Box<dyn FnMut(&[u8]) -> Result<()> + 'a>>,
}

impl<'a> ChunkEnumerator<'a> {
    /// Opens `path` and prepares to enumerate its records into `buffer`.
    /// A zero-length file yields an enumerator that always returns
    /// `Ok(None)`, matching the reference's `EmptyEnumerator` short-circuit.
    pub(crate) fn open(path: &Path, buffer: &'a mut [u8], delimiter: u8) -> Result<ChunkEnumerator<'a>> {
        if buffer.is_empty() {
            return Err(anyhow!("read buffer must not be empty"));
        }

        let size = path
            .metadata()
            .with_context(|| format!("stat {}", path.display()))?
            .len();

        if size == 0 {
            return Ok(ChunkEnumerator {
                file: None,
                buffer,
                delimiter,
                cur: 0,
                end: 0,
                tail_len: 0,
                eof: true,
                observer: None,
            });
        }

        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;

        Ok(ChunkEnumerator {
            file: Some(file),
            buffer,
            delimiter,
            cur: 0,
            end: 0,
            tail_len: 0,
            eof: false,
            observer: None,
        })
    }

    /// Installs a callback fired immediately before a disk read that is
    /// about to overwrite buffered bytes not yet consumed by the caller. The
    /// callback receives the buffer's current valid contents (`[0, end)`) so
    /// it can copy out or process anything it still needs without holding a
    /// borrow of the enumerator itself. Replaces the reference's
    /// string-identified `"before-read-buffer"` event with a plain closure
    /// (see `SPEC_FULL.md` §9).
    pub(crate) fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&[u8]) -> Result<()> + 'a,
    {
        self.observer = Some(Box::new(observer));
    }

    /// The buffer's currently valid contents, `[0, end)`. Only meaningful to
    /// call between `next_record` calls; a [`RecordSlice`] returned by the
    /// most recent `next_record` call is always a sub-range of this.
    pub(crate) fn buffer(&self) -> &[u8] {
        &self.buffer[..self.end]
    }

    pub(crate) fn next_record(&mut self) -> Result<Option<RecordSlice>> {
        loop {
            if self.cur < self.end {
                let rel = self.buffer[self.cur..self.end]
                    .iter()
                    .position(|&b| b == self.delimiter)
                    .ok_or_else(|| anyhow!("internal error: buffer range [cur, end) has no delimiter"))?;
                let delim_pos = self.cur + rel;
                let slice = RecordSlice::new(self.cur, delim_pos - self.cur);
                self.cur = delim_pos + 1;
                return Ok(Some(slice));
            }

            if self.eof {
                return Ok(None);
            }

            if let Some(hook) = self.observer.as_mut() {
                hook(&self.buffer[..self.end])?;
            }

            let old_tail_len = self.tail_len;
            if old_tail_len > 0 {
                self.buffer.copy_within(self.end..self.end + old_tail_len, 0);
            }

            let capacity = self.buffer.len();
            let space = capacity - old_tail_len;
            let file = self.file.as_mut().expect("non-empty enumerator always has a file");
            let r = fill_fully(file, &mut self.buffer[old_tail_len..capacity])?;
            let filled = old_tail_len + r;

            if r < space {
                self.eof = true;
                if filled == 0 {
                    if old_tail_len > 0 {
                        return Err(anyhow!("unexpected EOF without trailing delimiter"));
                    }
                    return Ok(None);
                }
                if self.buffer[filled - 1] != self.delimiter {
                    return Err(anyhow!("unexpected EOF without trailing delimiter"));
                }
                self.cur = 0;
                self.end = filled;
                self.tail_len = 0;
            } else {
                let mut d = filled - 1;
                loop {
                    if self.buffer[d] == self.delimiter {
                        break;
                    }
                    if d == old_tail_len {
                        return Err(anyhow!(
                            "record length exceeds read buffer capacity ({capacity} bytes)"
                        ));
                    }
                    d -= 1;
                }
                self.cur = 0;
                self.end = d + 1;
                self.tail_len = filled - self.end;
            }
        }
    }
}

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use udx_error::{Result, UdxError};

use super::file::{fill_output, open_file, opened};
use crate::stream::buffer::ByteBuffer;
use crate::stream::{Source, StreamState};

/// Byte range of a file assigned to one source instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Portion {
    pub offset: u64,
    pub size: u64,
    /// Whether this is the first portion of the file. Later portions may
    /// start inside a token that belongs to the previous portion.
    pub is_first: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadPhase {
    /// Reading bytes inside the portion's range.
    Body,
    /// Past the range, finishing the token that straddles the end.
    Tail,
}

/// Reads one [`Portion`] of a local file, aligned to whole tokens.
///
/// A token (a run of ASCII digits) belongs to the portion holding its first
/// byte. A portion after the first skips a token it starts inside of, and
/// every portion reads past its end until the token straddling the end is
/// complete. Together the portions of a file produce every token exactly
/// once, wherever the offsets land.
#[derive(Debug)]
pub struct FilePortionSource {
    path: PathBuf,
    portion: Portion,
    handle: Option<BufReader<File>>,
    remaining: u64,
    phase: ReadPhase,
    /// Whether the last byte produced was part of a token.
    in_token: bool,
}

impl FilePortionSource {
    pub fn new(path: impl Into<PathBuf>, portion: Portion) -> Self {
        FilePortionSource {
            path: path.into(),
            portion,
            handle: None,
            remaining: portion.size,
            phase: ReadPhase::Body,
            in_token: false,
        }
    }

    fn seek_err(&self, offset: u64, e: std::io::Error) -> UdxError {
        UdxError::resource("Disk seek failed")
            .with_field("path", self.path.display())
            .with_field("offset", offset)
            .with_source(e)
    }
}

fn is_token_byte(b: &u8) -> bool {
    b.is_ascii_digit()
}

fn read_err(path: &Path, e: std::io::Error) -> UdxError {
    UdxError::resource("Error reading file")
        .with_field("path", path.display())
        .with_source(e)
}

fn fill_buf<'a>(reader: &'a mut BufReader<File>, path: &Path) -> Result<&'a [u8]> {
    reader.fill_buf().map_err(|e| read_err(path, e))
}

/// Consume the token bytes at the reader's position.
///
/// Returns how many bytes were skipped.
fn skip_token(reader: &mut BufReader<File>, path: &Path) -> Result<u64> {
    let mut skipped = 0;
    loop {
        let buf = fill_buf(reader, path)?;
        if buf.is_empty() {
            return Ok(skipped);
        }
        let n = buf.iter().take_while(|b| is_token_byte(b)).count();
        let len = buf.len();
        reader.consume(n);
        skipped += n as u64;
        if n < len {
            return Ok(skipped);
        }
    }
}

/// Copy the token bytes at the reader's position into `output`.
///
/// Returns whether the token ended, either on a separator or at end of file.
fn copy_token(reader: &mut BufReader<File>, output: &mut ByteBuffer, path: &Path) -> Result<bool> {
    loop {
        let buf = fill_buf(reader, path)?;
        if buf.is_empty() {
            return Ok(true);
        }
        let n = buf.iter().take_while(|b| is_token_byte(b)).count();
        let take = n.min(output.spare_capacity());
        let ended = take == n && n < buf.len();
        output.put_slice(&buf[..take])?;
        reader.consume(take);
        if ended {
            return Ok(true);
        }
        if output.spare_capacity() == 0 {
            return Ok(false);
        }
    }
}

impl Source for FilePortionSource {
    fn setup(&mut self) -> Result<()> {
        let offset = self.portion.offset;
        let look_back = !self.portion.is_first && offset > 0;
        let start = if look_back { offset - 1 } else { offset };

        let mut file = open_file(&self.path)?;
        file.seek(SeekFrom::Start(start))
            .map_err(|e| self.seek_err(start, e))?;
        let mut reader = BufReader::new(file);

        let mut skipped = 0;
        if look_back {
            let mut prev = [0; 1];
            let got = reader
                .read(&mut prev)
                .map_err(|e| read_err(&self.path, e))?;
            if got == 1 && is_token_byte(&prev[0]) {
                skipped = skip_token(&mut reader, &self.path)?;
                trace!(offset, skipped, "skipped token owned by previous portion");
            }
        }

        // A token running past the end leaves nothing for this portion.
        skipped = skipped.min(self.portion.size);

        debug!(
            path = %self.path.display(),
            offset,
            size = self.portion.size,
            skipped,
            "opened file portion source"
        );

        self.handle = Some(reader);
        self.remaining = self.portion.size - skipped;
        self.phase = ReadPhase::Body;
        self.in_token = false;
        Ok(())
    }

    fn process(&mut self, output: &mut ByteBuffer) -> Result<StreamState> {
        let handle = opened(&mut self.handle, &self.path)?;

        if self.phase == ReadPhase::Body {
            let (n, eof) = fill_output(handle, output, self.remaining, &self.path)?;
            self.remaining -= n as u64;
            if n > 0 {
                self.in_token = output.filled().last().is_some_and(is_token_byte);
            }

            if eof || (self.remaining == 0 && !self.in_token) {
                return Ok(StreamState::Done);
            }
            if self.remaining > 0 {
                return Ok(StreamState::NeedsOutputSpace);
            }
            self.phase = ReadPhase::Tail;
            if output.spare_capacity() == 0 {
                return Ok(StreamState::NeedsOutputSpace);
            }
        }

        if copy_token(handle, output, &self.path)? {
            Ok(StreamState::Done)
        } else {
            Ok(StreamState::NeedsOutputSpace)
        }
    }

    fn destroy(&mut self) -> Result<()> {
        self.handle = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn read_all(source: &mut dyn Source, buf_size: usize) -> Vec<u8> {
        source.setup().unwrap();
        let mut out = ByteBuffer::with_capacity(buf_size);
        let mut got = Vec::new();
        loop {
            let state = source.process(&mut out).unwrap();
            got.extend(out.take_filled());
            if state == StreamState::Done {
                break;
            }
        }
        source.destroy().unwrap();
        got
    }

    #[test]
    fn reads_only_portion() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"aaaa|bbbb|cccc").unwrap();

        let portion = Portion {
            offset: 5,
            size: 5,
            is_first: false,
        };
        let mut source = FilePortionSource::new(file.path(), portion);
        assert_eq!(b"bbbb|".to_vec(), read_all(&mut source, 3));
    }

    fn write_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    fn read_portions(file: &tempfile::NamedTempFile, offsets: &[u64], buf_size: usize) -> Vec<Vec<u8>> {
        let file_size = file.as_file().metadata().unwrap().len();
        (0..offsets.len())
            .map(|idx| {
                let end = offsets.get(idx + 1).copied().unwrap_or(file_size);
                let portion = Portion {
                    offset: offsets[idx],
                    size: end - offsets[idx],
                    is_first: idx == 0,
                };
                read_all(&mut FilePortionSource::new(file.path(), portion), buf_size)
            })
            .collect()
    }

    #[test]
    fn offset_inside_token() {
        let file = write_file(b"12 345 6789");
        let got = read_portions(&file, &[0, 4, 8], 16);
        assert_eq!(
            vec![b"12 345".to_vec(), b" 6789".to_vec(), Vec::new()],
            got
        );
    }

    #[test]
    fn offset_inside_token_small_buffer() {
        let file = write_file(b"12 345 6789");
        let got = read_portions(&file, &[0, 4, 8], 1);
        assert_eq!(
            vec![b"12 345".to_vec(), b" 6789".to_vec(), Vec::new()],
            got
        );
    }

    #[test]
    fn offsets_on_boundaries_read_exact_ranges() {
        let file = write_file(b"10 20\n30 40\n");
        let got = read_portions(&file, &[0, 3, 6], 4);
        assert_eq!(
            vec![b"10 ".to_vec(), b"20\n".to_vec(), b"30 40\n".to_vec()],
            got
        );
    }

    #[test]
    fn every_offset_yields_each_token_once() {
        let contents = b"7 81 902 1234 5 66";
        let file = write_file(contents);
        for i in 1..contents.len() as u64 {
            for j in i + 1..contents.len() as u64 {
                let joined: Vec<u8> = read_portions(&file, &[0, i, j], 3)
                    .into_iter()
                    .flat_map(|mut bytes| {
                        bytes.push(b' ');
                        bytes
                    })
                    .collect();
                let tokens: Vec<_> = joined
                    .split(|b| !b.is_ascii_digit())
                    .filter(|t| !t.is_empty())
                    .collect();
                assert_eq!(
                    vec![&b"7"[..], b"81", b"902", b"1234", b"5", b"66"],
                    tokens,
                    "offsets 0,{i},{j}"
                );
            }
        }
    }

    #[test]
    fn portion_past_end_is_short() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();

        let portion = Portion {
            offset: 1,
            size: 100,
            is_first: false,
        };
        let mut source = FilePortionSource::new(file.path(), portion);
        assert_eq!(b"bc".to_vec(), read_all(&mut source, 16));
    }
}

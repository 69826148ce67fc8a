//! Reservation mode input.
//!
//! Instead of being handed buffers, a continuous parser pulls bytes: it
//! reserves a window of at least `n` bytes, inspects it, and seeks past the
//! bytes it has consumed. Reserved but unconsumed bytes stay available for
//! the next reservation.

use std::io::{self, ErrorKind as IoErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::trace;
use udx_error::{Result, UdxError};

pub trait ReservationReader {
    /// Ensure at least `n` bytes are available.
    ///
    /// Returns the number of bytes reserved, which is `n` unless the end of
    /// the stream was reached first.
    fn reserve(&mut self, n: usize) -> Result<usize>;

    /// Consume the first `n` reserved bytes.
    fn seek(&mut self, n: usize) -> Result<()>;

    /// Whether the underlying input is exhausted. Bytes may still be
    /// buffered.
    fn is_end_of_stream(&self) -> bool;

    /// Currently buffered, unconsumed bytes.
    fn data(&self) -> &[u8];

    /// Total bytes consumed so far.
    fn consumed(&self) -> u64;

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.data().get(pos).copied()
    }
}

fn check_seek(n: usize, buffered: usize) -> Result<()> {
    if n > buffered {
        return Err(UdxError::contract("Attempted to seek past reserved bytes")
            .with_field("n", n)
            .with_field("reserved", buffered));
    }
    Ok(())
}

/// Unwrap errors that upstream stages tunneled through `io::Error`, wrap
/// everything else as a resource error.
fn read_error(err: io::Error) -> UdxError {
    if !err.get_ref().is_some_and(|inner| inner.is::<UdxError>()) {
        return UdxError::resource("Failed to read input").with_source(err);
    }
    match err.into_inner().map(|inner| inner.downcast::<UdxError>()) {
        Some(Ok(inner)) => *inner,
        _ => UdxError::new("Lost tunneled read error"),
    }
}

/// Reservation reader over a sequence of caller provided chunks.
#[derive(Debug)]
pub struct ChunkedReservationReader<I> {
    chunks: I,
    buf: BytesMut,
    exhausted: bool,
    consumed: u64,
}

impl<I> ChunkedReservationReader<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    pub fn new(chunks: impl IntoIterator<IntoIter = I>) -> Self {
        ChunkedReservationReader {
            chunks: chunks.into_iter(),
            buf: BytesMut::new(),
            exhausted: false,
            consumed: 0,
        }
    }
}

impl<I> ReservationReader for ChunkedReservationReader<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    fn reserve(&mut self, n: usize) -> Result<usize> {
        while self.buf.len() < n && !self.exhausted {
            match self.chunks.next() {
                Some(chunk) => self.buf.extend_from_slice(chunk.as_ref()),
                None => self.exhausted = true,
            }
        }
        Ok(self.buf.len().min(n))
    }

    fn seek(&mut self, n: usize) -> Result<()> {
        check_seek(n, self.buf.len())?;
        self.buf.advance(n);
        self.consumed += n as u64;
        Ok(())
    }

    fn is_end_of_stream(&self) -> bool {
        self.exhausted
    }

    fn data(&self) -> &[u8] {
        &self.buf
    }

    fn consumed(&self) -> u64 {
        self.consumed
    }
}

/// Reservation reader pulling from an [`io::Read`](std::io::Read).
#[derive(Debug)]
pub struct ReadReservationReader<R> {
    reader: R,
    read_size: usize,
    buf: BytesMut,
    eof: bool,
    consumed: u64,
}

impl<R: Read> ReadReservationReader<R> {
    /// Create a reader that pulls at least `read_size` bytes per refill.
    pub fn new(reader: R, read_size: usize) -> Result<Self> {
        if read_size == 0 {
            return Err(UdxError::config("Read size must be greater than zero"));
        }
        Ok(ReadReservationReader {
            reader,
            read_size,
            buf: BytesMut::with_capacity(read_size),
            eof: false,
            consumed: 0,
        })
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fill(&mut self, want: usize) -> Result<()> {
        let start = self.buf.len();
        self.buf.resize(start + want, 0);

        let read = loop {
            match self.reader.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(read_error(e));
                }
            }
        };

        self.buf.truncate(start + read);
        if read == 0 {
            trace!(consumed = self.consumed, "reservation reader reached end of input");
            self.eof = true;
        }
        Ok(())
    }
}

impl<R: Read> ReservationReader for ReadReservationReader<R> {
    fn reserve(&mut self, n: usize) -> Result<usize> {
        while self.buf.len() < n && !self.eof {
            let want = self.read_size.max(n - self.buf.len());
            self.fill(want)?;
        }
        Ok(self.buf.len().min(n))
    }

    fn seek(&mut self, n: usize) -> Result<()> {
        check_seek(n, self.buf.len())?;
        self.buf.advance(n);
        self.consumed += n as u64;
        Ok(())
    }

    fn is_end_of_stream(&self) -> bool {
        self.eof
    }

    fn data(&self) -> &[u8] {
        &self.buf
    }

    fn consumed(&self) -> u64 {
        self.consumed
    }
}

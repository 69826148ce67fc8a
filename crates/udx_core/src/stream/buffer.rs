use udx_error::{Result, UdxError};

/// Fixed capacity byte region with a cursor.
///
/// Used for both directions of the bounded-buffer protocol:
///
/// - Input: `[0, len)` holds valid bytes, `[0, offset)` of which have been
///   consumed by the stage reading the buffer.
/// - Output: `[0, offset)` has been produced, `[offset, capacity)` is free
///   space the writing stage may fill.
///
/// `offset <= len <= capacity` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBuffer {
    buf: Vec<u8>,
    /// Number of valid bytes in `buf`.
    len: usize,
    /// Read or write cursor.
    offset: usize,
}

impl ByteBuffer {
    /// Create an empty output buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        ByteBuffer {
            buf: vec![0; capacity],
            len: 0,
            offset: 0,
        }
    }

    /// Create an input buffer holding `bytes`, nothing consumed yet.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let buf = bytes.into();
        let len = buf.len();
        ByteBuffer {
            buf,
            len,
            offset: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes not yet consumed.
    pub fn unconsumed(&self) -> &[u8] {
        &self.buf[self.offset..self.len]
    }

    pub fn remaining(&self) -> usize {
        self.len - self.offset
    }

    /// Bytes produced into this buffer so far.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.offset]
    }

    /// Free space after the cursor.
    pub fn spare_capacity(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.offset..]
    }

    /// Move the cursor forward by `n` bytes over consumed input.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(UdxError::new("Attempted to consume past end of buffer")
                .with_field("n", n)
                .with_field("remaining", self.remaining()));
        }
        self.offset += n;
        Ok(())
    }

    /// Mark `n` bytes after the cursor as produced.
    pub fn commit(&mut self, n: usize) -> Result<()> {
        if n > self.spare_capacity() {
            return Err(UdxError::capacity("Attempted to produce past buffer capacity")
                .with_field("n", n)
                .with_field("spare", self.spare_capacity()));
        }
        self.offset += n;
        self.len = self.len.max(self.offset);
        Ok(())
    }

    /// Copy a slice to the cursor, all or nothing.
    pub fn put_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.spare_capacity() {
            return Err(UdxError::capacity("Output buffer too small for slice")
                .with_field("needed", bytes.len())
                .with_field("spare", self.spare_capacity()));
        }
        self.buf[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.commit(bytes.len())
    }

    /// Drop consumed bytes, moving unconsumed bytes to the front.
    pub fn compact(&mut self) {
        if self.offset == 0 {
            return;
        }
        self.buf.copy_within(self.offset..self.len, 0);
        self.len -= self.offset;
        self.offset = 0;
        self.buf.truncate(self.len);
    }

    /// Append more valid input bytes after the existing ones.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.truncate(self.len);
        self.buf.extend_from_slice(bytes);
        self.len = self.buf.len();
    }

    /// Take the produced bytes out of an output buffer, resetting it to empty
    /// with the same capacity.
    pub fn take_filled(&mut self) -> Vec<u8> {
        let out = self.buf[..self.offset].to_vec();
        self.reset();
        out
    }

    /// Reset to an empty buffer, keeping capacity.
    pub fn reset(&mut self) {
        let capacity = self.buf.len();
        self.buf.clear();
        self.buf.resize(capacity, 0);
        self.len = 0;
        self.offset = 0;
    }
}

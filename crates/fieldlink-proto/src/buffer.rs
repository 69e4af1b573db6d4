//! Bounds-checked big-endian buffer primitives.
//!
//! Every binary parser and encoder in this crate is built on these two
//! types. The contract callers rely on: running past the end of the data
//! is always a recoverable [`CodecError::Overflow`] ("need more bytes" in a
//! streaming context), while a size outside `1..=8` is a programmer error
//! reported as [`CodecError::InvalidSize`]. The two are never conflated.

use bytes::{BufMut, BytesMut};
use thiserror::Error;

/// Errors from the buffer primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Not enough bytes (reading) or capacity (writing). Recoverable:
    /// streaming callers treat this as "wait for more data".
    #[error("buffer overflow: needed {needed} bytes, {remaining} remaining")]
    Overflow { needed: usize, remaining: usize },

    /// Integer field size outside `1..=8`. A logic bug in the caller.
    #[error("invalid integer size {size}, must be 1..=8")]
    InvalidSize { size: usize },

    /// A 7- or 8-byte integer whose high-order chunk was non-zero, or a
    /// value that does not fit the requested width on the write side.
    #[error("number does not fit in {size} bytes")]
    NumberTooLarge { size: usize },
}

/// Widest integer the single-read primitive handles; 7- and 8-byte reads
/// are emulated as a zero high chunk followed by a 6-byte low chunk.
const MAX_DIRECT_SIZE: usize = 6;

// ── BufferReader ─────────────────────────────────────────────────────

/// Cursor over an immutable byte slice.
#[derive(Debug)]
pub struct BufferReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read an unsigned big-endian integer of `size` bytes (`1..=8`).
    ///
    /// Sizes 7 and 8 are read as a `size - 6` byte high chunk that must
    /// decode to zero, then a 6-byte low chunk.
    pub fn read_number(&mut self, size: usize) -> Result<u64, CodecError> {
        if size < 1 || size > 8 {
            return Err(CodecError::InvalidSize { size });
        }
        if size > MAX_DIRECT_SIZE {
            if self.read_number(size - MAX_DIRECT_SIZE)? != 0 {
                return Err(CodecError::NumberTooLarge { size });
            }
            return self.read_number(MAX_DIRECT_SIZE);
        }
        if self.remaining() < size {
            return Err(CodecError::Overflow {
                needed: size,
                remaining: self.remaining(),
            });
        }

        let mut value: u64 = 0;
        for &byte in &self.buf[self.pos..self.pos + size] {
            value = (value << 8) | u64::from(byte);
        }
        self.pos += size;
        Ok(value)
    }

    /// Read exactly `length` bytes and advance the cursor.
    pub fn read_slice(&mut self, length: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < length {
            return Err(CodecError::Overflow {
                needed: length,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + length];
        self.pos += length;
        Ok(slice)
    }

    /// Read all bytes from the cursor to the end of the buffer.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    /// Read a `length_size`-byte length prefix followed by that many bytes.
    ///
    /// On overflow the cursor is left where it started, so a streaming
    /// caller retains the partial frame intact.
    pub fn read_sized_buffer(&mut self, length_size: usize) -> Result<&'a [u8], CodecError> {
        let mark = self.pos;
        let length = self.read_number(length_size)? as usize;
        match self.read_slice(length) {
            Ok(slice) => Ok(slice),
            Err(err) => {
                self.pos = mark;
                Err(err)
            }
        }
    }

    /// Read `length` bytes as UTF-8 text (lossy, invalid sequences are
    /// replaced rather than rejected).
    pub fn read_string(&mut self, length: usize) -> Result<String, CodecError> {
        Ok(String::from_utf8_lossy(self.read_slice(length)?).into_owned())
    }

    /// Read the rest of the buffer as UTF-8 text.
    pub fn read_rest_string(&mut self) -> String {
        String::from_utf8_lossy(self.read_rest()).into_owned()
    }
}

// ── BufferWriter ─────────────────────────────────────────────────────

/// Cursor over a fixed-capacity output buffer.
///
/// Writing past the declared capacity fails with [`CodecError::Overflow`]
/// rather than growing, so fixed-size wire structures can assert their
/// exact layout.
#[derive(Debug)]
pub struct BufferWriter {
    buf: BytesMut,
    capacity: usize,
}

impl BufferWriter {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Write an unsigned big-endian integer of `size` bytes (`1..=8`).
    ///
    /// Sizes 7 and 8 are written as a zero high chunk plus a 6-byte low
    /// chunk, mirroring the read side.
    pub fn write_number(&mut self, size: usize, value: u64) -> Result<(), CodecError> {
        if size < 1 || size > 8 {
            return Err(CodecError::InvalidSize { size });
        }
        if self.remaining() < size {
            return Err(CodecError::Overflow {
                needed: size,
                remaining: self.remaining(),
            });
        }
        if size > MAX_DIRECT_SIZE {
            self.write_number(size - MAX_DIRECT_SIZE, 0)?;
            return self.write_number(MAX_DIRECT_SIZE, value);
        }
        if size < 8 && value >= 1u64 << (8 * size) {
            return Err(CodecError::NumberTooLarge { size });
        }

        for shift in (0..size).rev() {
            self.buf.put_u8((value >> (8 * shift)) as u8);
        }
        Ok(())
    }

    /// Append a raw byte slice.
    pub fn write_slice(&mut self, slice: &[u8]) -> Result<(), CodecError> {
        if self.remaining() < slice.len() {
            return Err(CodecError::Overflow {
                needed: slice.len(),
                remaining: self.remaining(),
            });
        }
        self.buf.put_slice(slice);
        Ok(())
    }

    /// Exactly the bytes written so far.
    pub fn trimmed(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, yielding the bytes written so far.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

//! Sequential cursor over a borrowed byte slice.
//!
//! [`ByteCursor`] keeps a position into a fixed buffer and hands out
//! sub-slices of it. Nothing is copied, so walking an archive of several
//! hundred megabytes costs the same as walking its table of contents.

use std::borrow::Cow;

use zerocopy::FromBytes;

use crate::{Error, Result};

/// A read-only cursor over a byte slice.
///
/// All multi-byte integers are little-endian.
///
/// # Example
///
/// ```
/// use lgp_common::ByteCursor;
///
/// let data = [0x01, 0x02, 0x03, 0x04, b'h', b'i', 0, 0];
/// let mut cursor = ByteCursor::new(&data);
///
/// assert_eq!(cursor.read_u32().unwrap(), 0x04030201);
/// assert_eq!(cursor.take_text(4).unwrap(), "hi");
/// assert!(cursor.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a new cursor at the start of a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a new cursor starting at a specific position.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Seek to an absolute position.
    ///
    /// Seeking past the end is allowed; the next read fails.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Get the remaining bytes as a slice.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    fn truncated(&self, needed: usize) -> Error {
        Error::TruncatedInput {
            needed,
            available: self.remaining(),
        }
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(self.truncated(count));
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Take the next `count` bytes and advance.
    #[inline]
    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Skip `count` bytes.
    #[inline]
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Read an unsigned little-endian integer of `width` bytes.
    ///
    /// `width` must be 1, 2, 4 or 8. This is the single integer decoder used
    /// by every typed read below.
    pub fn take_le_uint(&mut self, width: usize) -> Result<u64> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(Error::UnsupportedWidth(width));
        }
        let bytes = self.take(width)?;
        Ok(decode_le(bytes))
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.take_le_uint(1).map(|v| v as u8)
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.take_le_uint(2).map(|v| v as u16)
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.take_le_uint(4).map(|v| v as u32)
    }

    /// Read a fixed-size text field.
    ///
    /// The field ends at the first NUL byte; everything after it is padding.
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn take_text(&mut self, count: usize) -> Result<Cow<'a, str>> {
        self.take(count).map(text_field)
    }

    /// Read a struct using zerocopy.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.take(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::TruncatedInput {
            needed: size,
            available: bytes.len(),
        })
    }
}

/// Decode up to eight bytes as an unsigned little-endian integer.
#[inline]
fn decode_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Decode a NUL-padded text field, stopping at the first NUL.
pub fn text_field(bytes: &[u8]) -> Cow<'_, str> {
    let end = memchr::memchr(0, bytes).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end])
}

//! Little-endian NDR-style decoder.

use crate::error::{CodecError, CodecResult};
use crate::Decode;

/// Maximum allowed length for a length-prefixed field.
/// This prevents allocation-based DoS from untrusted input.
const MAX_BYTES_LENGTH: u64 = 64 * 1024 * 1024;

/// Decode a value from bytes, requiring that every byte is consumed.
///
/// # Errors
///
/// Returns an error if the bytes are truncated, malformed, or
/// followed by trailing data.
pub fn from_ndr<T: Decode>(bytes: &[u8]) -> CodecResult<T> {
    let mut decoder = NdrDecoder::new(bytes);
    let value = T::decode(&mut decoder)?;
    decoder.finish()?;
    Ok(value)
}

/// A little-endian decoder over a borrowed buffer.
pub struct NdrDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> NdrDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Fails with [`CodecError::TrailingBytes`] if input is left over.
    pub fn finish(&self) -> CodecResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes {
                remaining: self.data.len() - self.pos,
            })
        }
    }

    /// Read exactly `len` raw bytes.
    #[inline]
    pub fn read_raw(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let available = self.data.len() - self.pos;
        if len > available {
            return Err(CodecError::UnexpectedEof {
                needed: len - available,
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_raw(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a `u8`.
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a `u16`.
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read an `i16`.
    pub fn read_i16(&mut self) -> CodecResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    /// Read a `u32`.
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a `u64`.
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read bytes prefixed by a `u16` length.
    pub fn read_bytes_u16(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_u16()?;
        self.read_raw(usize::from(len))
    }

    /// Read bytes prefixed by a `u32` length.
    pub fn read_bytes_u32(&mut self) -> CodecResult<&'a [u8]> {
        let len = u64::from(self.read_u32()?);
        if len > MAX_BYTES_LENGTH {
            return Err(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: MAX_BYTES_LENGTH,
            });
        }
        self.read_raw(len as usize)
    }

    /// Read a UTF-8 string prefixed by a `u32` length.
    pub fn read_utf8(&mut self) -> CodecResult<String> {
        let bytes = self.read_bytes_u32()?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a UTF-16LE string prefixed by its `u32` unit count.
    pub fn read_utf16(&mut self) -> CodecResult<String> {
        let count = u64::from(self.read_u32()?);
        if count * 2 > MAX_BYTES_LENGTH {
            return Err(CodecError::SizeLimitExceeded {
                claimed: count * 2,
                max_allowed: MAX_BYTES_LENGTH,
            });
        }
        let raw = self.read_raw(count as usize * 2)?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).map_err(|_| CodecError::InvalidUtf16)
    }

    /// Decode any value implementing [`Decode`].
    pub fn get<T: Decode>(&mut self) -> CodecResult<T> {
        T::decode(self)
    }
}

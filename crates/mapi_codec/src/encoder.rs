//! Little-endian NDR-style encoder.

use crate::error::{CodecError, CodecResult};
use crate::Encode;
use bytes::{BufMut, BytesMut};

/// Encode a value to its wire bytes.
///
/// # Errors
///
/// Returns an error if the value cannot be represented on the wire
/// (e.g., a string longer than its length prefix allows).
pub fn to_ndr<T: Encode + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut encoder = NdrEncoder::new();
    value.encode(&mut encoder)?;
    Ok(encoder.into_bytes())
}

/// A little-endian encoder.
///
/// All integers are written little-endian with no alignment padding,
/// which is how operation payloads are packed inside an envelope.
pub struct NdrEncoder {
    buffer: BytesMut,
}

impl NdrEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Write a `u8`.
    pub fn put_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    /// Write a `u16`.
    pub fn put_u16(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    /// Write an `i16`.
    pub fn put_i16(&mut self, value: i16) {
        self.buffer.put_i16_le(value);
    }

    /// Write a `u32`.
    pub fn put_u32(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    /// Write a `u64`.
    pub fn put_u64(&mut self, value: u64) {
        self.buffer.put_u64_le(value);
    }

    /// Write raw bytes with no length prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    /// Write bytes prefixed by a `u16` length.
    pub fn put_bytes_u16(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let len = u16::try_from(bytes.len()).map_err(|_| {
            CodecError::encoding_failed(format!("{} bytes exceed a u16 length prefix", bytes.len()))
        })?;
        self.put_u16(len);
        self.put_raw(bytes);
        Ok(())
    }

    /// Write bytes prefixed by a `u32` length.
    pub fn put_bytes_u32(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            CodecError::encoding_failed(format!("{} bytes exceed a u32 length prefix", bytes.len()))
        })?;
        self.put_u32(len);
        self.put_raw(bytes);
        Ok(())
    }

    /// Write a string as UTF-16LE code units prefixed by the `u32` unit count.
    pub fn put_utf16(&mut self, text: &str) -> CodecResult<()> {
        let units: Vec<u16> = text.encode_utf16().collect();
        let count = u32::try_from(units.len())
            .map_err(|_| CodecError::encoding_failed("UTF-16 string too long"))?;
        self.put_u32(count);
        for unit in units {
            self.put_u16(unit);
        }
        Ok(())
    }

    /// Encode any value implementing [`Encode`].
    pub fn put<T: Encode + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        value.encode(self)
    }
}

impl Default for NdrEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_little_endian() {
        let mut enc = NdrEncoder::new();
        enc.put_u8(0xAB);
        enc.put_u16(0x0102);
        enc.put_u32(0x0304_0506);
        enc.put_u64(0x0708_090A_0B0C_0D0E);
        assert_eq!(
            enc.as_bytes(),
            &[
                0xAB, 0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x0E, 0x0D, 0x0C, 0x0B, 0x0A, 0x09,
                0x08, 0x07
            ]
        );
        assert_eq!(enc.len(), 15);
    }

    #[test]
    fn length_prefixed_bytes() {
        let mut enc = NdrEncoder::new();
        enc.put_bytes_u16(b"abc").unwrap();
        enc.put_bytes_u32(b"de").unwrap();
        assert_eq!(
            enc.into_bytes(),
            vec![3, 0, b'a', b'b', b'c', 2, 0, 0, 0, b'd', b'e']
        );
    }

    #[test]
    fn u16_prefix_overflow_is_rejected() {
        let mut enc = NdrEncoder::new();
        let big = vec![0u8; usize::from(u16::MAX) + 1];
        assert!(matches!(
            enc.put_bytes_u16(&big),
            Err(CodecError::EncodingFailed { .. })
        ));
    }

    #[test]
    fn utf16_string() {
        let mut enc = NdrEncoder::new();
        enc.put_utf16("hé").unwrap();
        assert_eq!(enc.into_bytes(), vec![2, 0, 0, 0, b'h', 0, 0xE9, 0]);
    }
}

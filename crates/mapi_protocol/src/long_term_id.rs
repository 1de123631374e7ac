//! Long-term identifiers.

use mapi_codec::{CodecResult, Decode, Encode, NdrDecoder, NdrEncoder};
use std::fmt;
use uuid::Uuid;

/// Size of a long-term id on the wire: GUID, counter, padding.
pub const LONG_TERM_ID_SIZE: usize = 16 + 6 + 1;

/// A durable identifier for a store object.
///
/// A transient id is only valid within one logon; its long-term form
/// (database GUID plus global counter) is stable across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongTermId {
    /// Database (replica) GUID.
    pub database_guid: Uuid,
    /// Global counter, most significant byte first.
    pub global_counter: [u8; 6],
    /// Padding, always written and read back as zero.
    pub padding: u8,
}

impl LongTermId {
    /// Creates a long-term id with zero padding.
    pub fn new(database_guid: Uuid, global_counter: [u8; 6]) -> Self {
        Self {
            database_guid,
            global_counter,
            padding: 0,
        }
    }

    /// Copies `other` field by field, counter element-wise, padding zeroed.
    pub fn copy_normalized(other: &LongTermId) -> Self {
        let mut global_counter = [0u8; 6];
        for (dst, src) in global_counter.iter_mut().zip(other.global_counter.iter()) {
            *dst = *src;
        }
        Self {
            database_guid: other.database_guid,
            global_counter,
            padding: 0,
        }
    }

    /// The counter as an integer.
    pub fn counter(&self) -> u64 {
        self.global_counter
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }
}

impl fmt::Display for LongTermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:012x}", self.database_guid, self.counter())
    }
}

impl Encode for LongTermId {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_raw(&self.database_guid.to_bytes_le());
        for b in self.global_counter {
            encoder.put_u8(b);
        }
        encoder.put_u8(0);
        Ok(())
    }
}

impl Decode for LongTermId {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        let database_guid = Uuid::from_bytes_le(decoder.read_array()?);
        let mut global_counter = [0u8; 6];
        for slot in &mut global_counter {
            *slot = decoder.read_u8()?;
        }
        // Whatever the sender put in the padding byte is discarded.
        let _padding = decoder.read_u8()?;
        Ok(Self {
            database_guid,
            global_counter,
            padding: 0,
        })
    }
}

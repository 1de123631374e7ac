//! Error types for the protocol crate.

use mapi_codec::CodecError;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building or parsing protocol structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Underlying wire codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A value was rejected at construction time.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Opnum is not one this core knows how to carry.
    #[error("unknown opnum 0x{0:02x}")]
    UnknownOpnum(u8),

    /// Restriction type byte is not one of the six supported shapes.
    #[error("unknown restriction type 0x{0:02x}")]
    UnknownRestrictionType(u8),

    /// Envelope framing is inconsistent.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

impl ProtocolError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }

    /// Create a malformed envelope error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope(reason.into())
    }
}

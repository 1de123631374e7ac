//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Unexpected end of input.
    #[error("unexpected end of input: needed {needed} more bytes")]
    UnexpectedEof {
        /// Number of bytes missing.
        needed: usize,
    },

    /// Input contained bytes after the decoded value.
    #[error("{remaining} trailing bytes after decoded value")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// Invalid wire structure.
    #[error("invalid structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Property type code is not supported.
    #[error("unsupported property type 0x{code:04x}")]
    UnsupportedPropertyType {
        /// The raw property type.
        code: u16,
    },

    /// Value type does not match the property tag type.
    #[error("property tag 0x{tag:08x} does not accept a {actual} value")]
    TypeMismatch {
        /// The raw property tag.
        tag: u32,
        /// Name of the value type that was supplied.
        actual: &'static str,
    },

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Invalid UTF-16 string.
    #[error("invalid UTF-16 string")]
    InvalidUtf16,

    /// A length prefix exceeds the allowed maximum.
    #[error("length {claimed} exceeds maximum {max_allowed}")]
    SizeLimitExceeded {
        /// Length claimed by the prefix.
        claimed: u64,
        /// Maximum accepted length.
        max_allowed: u64,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}

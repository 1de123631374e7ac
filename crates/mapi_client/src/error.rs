//! Error mapping for client operations.
//!
//! Every failure collapses into one of four local kinds or a remote status
//! passed through unchanged. [`MapiError::status`] gives the wire code that
//! the context's last-error slot mirrors.

use crate::transport::TransportError;
use mapi_codec::CodecError;
use mapi_protocol::{MapiStatus, Opnum, ProtocolError};
use thiserror::Error;

/// Result type for client operations.
pub type MapiResult<T> = Result<T, MapiError>;

/// Errors returned by client operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapiError {
    /// The subsystem has not been initialized, or was uninitialized.
    #[error("MAPI subsystem is not initialized")]
    NotInitialized,

    /// A null, zero, stale or out-of-range input.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// What was wrong.
        reason: String,
    },

    /// An allocation could not be satisfied.
    #[error("not enough resources: {reason}")]
    NotEnoughResources {
        /// What could not be allocated.
        reason: String,
    },

    /// The transaction did not complete, or its reply was unusable.
    #[error("call failed: {message}")]
    CallFailed {
        /// Transport or decode failure description.
        message: String,
    },

    /// The server reported a failure.
    #[error("{opnum:?} failed on the server: {status}")]
    Remote {
        /// Operation that failed.
        opnum: Opnum,
        /// Status returned by the server.
        status: MapiStatus,
    },
}

impl MapiError {
    /// Creates an invalid parameter error.
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Creates a not-enough-resources error.
    pub fn not_enough_resources(reason: impl Into<String>) -> Self {
        Self::NotEnoughResources {
            reason: reason.into(),
        }
    }

    /// Creates a call failed error.
    pub fn call_failed(message: impl Into<String>) -> Self {
        Self::CallFailed {
            message: message.into(),
        }
    }

    /// Maps a failure to decode a reply.
    pub fn decode_failed(err: ProtocolError) -> Self {
        Self::call_failed(format!("undecodable reply: {err}"))
    }

    /// Wire status equivalent of this error.
    pub fn status(&self) -> MapiStatus {
        match self {
            MapiError::NotInitialized => MapiStatus::NOT_INITIALIZED,
            MapiError::InvalidParameter { .. } => MapiStatus::INVALID_PARAMETER,
            MapiError::NotEnoughResources { .. } => MapiStatus::NOT_ENOUGH_RESOURCES,
            MapiError::CallFailed { .. } => MapiStatus::CALL_FAILED,
            MapiError::Remote { status, .. } => *status,
        }
    }

    /// Returns true if the failure was reported by the server.
    pub fn is_remote(&self) -> bool {
        matches!(self, MapiError::Remote { .. })
    }
}

/// Failures while building a request are caller errors.
impl From<ProtocolError> for MapiError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidParameter(reason) => MapiError::InvalidParameter { reason },
            ProtocolError::Codec(CodecError::EncodingFailed { message }) => {
                MapiError::InvalidParameter { reason: message }
            }
            ProtocolError::Codec(CodecError::TypeMismatch { .. }) => {
                MapiError::invalid_parameter(err.to_string())
            }
            other => MapiError::call_failed(other.to_string()),
        }
    }
}

impl From<TransportError> for MapiError {
    fn from(err: TransportError) -> Self {
        MapiError::call_failed(err.to_string())
    }
}

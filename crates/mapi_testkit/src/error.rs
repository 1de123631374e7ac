//! Error types for the loopback server.

use mapi_protocol::{MapiStatus, ProtocolError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors the loopback server reports back as reply statuses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// The request could not be parsed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The input handle names no open object.
    #[error("unknown handle 0x{0:08x}")]
    InvalidObject(u32),

    /// The operation does not apply to the addressed object.
    #[error("operation not supported on {0}")]
    WrongObject(&'static str),

    /// An id or folder does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The logon named another mailbox.
    #[error("logon failed: {0}")]
    LogonFailed(String),

    /// Too many objects are open.
    #[error("object limit of {limit} reached")]
    SessionLimit {
        /// Configured limit.
        limit: usize,
    },

    /// A payload failed to decode.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ServerError {
    /// Status reported in the reply envelope.
    pub fn status(&self) -> MapiStatus {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Protocol(_) => {
                MapiStatus::INVALID_PARAMETER
            }
            ServerError::InvalidObject(_) => MapiStatus::INVALID_OBJECT,
            ServerError::WrongObject(_) => MapiStatus::NO_SUPPORT,
            ServerError::NotFound(_) => MapiStatus::NOT_FOUND,
            ServerError::LogonFailed(_) => MapiStatus::LOGON_FAILED,
            ServerError::SessionLimit { .. } => MapiStatus::SESSION_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ServerError::InvalidObject(3).status(), MapiStatus::INVALID_OBJECT);
        assert_eq!(
            ServerError::NotFound("id 7".into()).status(),
            MapiStatus::NOT_FOUND
        );
        assert_eq!(
            ServerError::SessionLimit { limit: 4 }.status(),
            MapiStatus::SESSION_LIMIT
        );
        assert_eq!(
            ServerError::Protocol(ProtocolError::UnknownOpnum(0x99)).status(),
            MapiStatus::INVALID_PARAMETER
        );
    }
}

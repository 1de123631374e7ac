//! Configuration for the client context.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cap on a serialized request envelope.
pub const DEFAULT_MAX_ENVELOPE_SIZE: usize = 0x8000;

/// Configuration for a [`MapiContext`](crate::MapiContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapiConfig {
    /// Logon id stamped into every request header.
    pub logon_id: u8,
    /// Largest request envelope the client will send, handle list included.
    pub max_envelope_size: usize,
    /// Byte cap of the context arena behind `allocate_buffer`.
    pub arena_limit: usize,
    /// Byte cap of each per-call arena.
    pub call_arena_limit: usize,
    /// Codepage reported to the server.
    pub codepage: u32,
    /// Mailbox distinguished name used by logon.
    pub essdn: String,
    /// Request timeout, for transports that honor one.
    pub timeout: Duration,
}

impl MapiConfig {
    /// Creates a configuration for the mailbox `essdn`.
    pub fn new(essdn: impl Into<String>) -> Self {
        Self {
            logon_id: 0,
            max_envelope_size: DEFAULT_MAX_ENVELOPE_SIZE,
            arena_limit: 16 * 1024 * 1024,
            call_arena_limit: 1024 * 1024,
            codepage: 1252,
            essdn: essdn.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the logon id.
    pub fn with_logon_id(mut self, logon_id: u8) -> Self {
        self.logon_id = logon_id;
        self
    }

    /// Sets the maximum request envelope size.
    pub fn with_max_envelope_size(mut self, size: usize) -> Self {
        self.max_envelope_size = size;
        self
    }

    /// Sets the context arena cap.
    pub fn with_arena_limit(mut self, bytes: usize) -> Self {
        self.arena_limit = bytes;
        self
    }

    /// Sets the per-call arena cap.
    pub fn with_call_arena_limit(mut self, bytes: usize) -> Self {
        self.call_arena_limit = bytes;
        self
    }

    /// Sets the codepage.
    pub fn with_codepage(mut self, codepage: u32) -> Self {
        self.codepage = codepage;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for MapiConfig {
    fn default() -> Self {
        Self::new("")
    }
}

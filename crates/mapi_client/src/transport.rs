//! Transport layer abstraction for envelope exchange.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A failed exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error: {message}")]
pub struct TransportError {
    /// Failure description.
    pub message: String,
    /// Whether the same exchange might succeed if attempted again.
    pub retryable: bool,
}

impl TransportError {
    /// Creates a retryable transport error.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// An established channel to the server.
///
/// One call to [`transact`](Transport::transact) sends one serialized
/// request envelope and returns the serialized reply envelope. Connection
/// setup and authentication happen before the transport is handed to a
/// session.
pub trait Transport: Send {
    /// Exchanges one request for one reply.
    fn transact(&mut self, request: &[u8]) -> TransportResult<Vec<u8>>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the connection.
    fn close(&mut self) -> TransportResult<()>;
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    replies: VecDeque<TransportResult<Vec<u8>>>,
    requests: Vec<Vec<u8>>,
}

/// A scripted transport for testing.
///
/// Replies are returned in the order they were queued. Clones share state,
/// so a test can keep one clone to inspect the requests a session sent.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a connected mock transport with no queued replies.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                connected: true,
                ..MockState::default()
            })),
        }
    }

    /// Queues a reply.
    pub fn push_reply(&self, reply: Vec<u8>) {
        self.state.lock().replies.push_back(Ok(reply));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: TransportError) {
        self.state.lock().replies.push_back(Err(error));
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Requests sent so far.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.state.lock().requests.clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn transact(&mut self, request: &[u8]) -> TransportResult<Vec<u8>> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::fatal("not connected"));
        }
        state.requests.push(request.to_vec());
        state
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::fatal("no mock reply queued")))
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn close(&mut self) -> TransportResult<()> {
        self.state.lock().connected = false;
        Ok(())
    }
}

//! Transport that hands envelopes straight to a [`LoopbackServer`].

use crate::server::LoopbackServer;
use mapi_client::{Transport, TransportError, TransportResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// A server shared between the test and every transport connected to it.
pub type SharedServer = Arc<Mutex<LoopbackServer>>;

/// In-process transport to a loopback server.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    server: SharedServer,
    connected: bool,
}

impl LoopbackTransport {
    /// Wraps a server in shared state and connects to it.
    pub fn new(server: LoopbackServer) -> Self {
        Self::connect(&Arc::new(Mutex::new(server)))
    }

    /// Connects to an already shared server.
    pub fn connect(server: &SharedServer) -> Self {
        Self {
            server: Arc::clone(server),
            connected: true,
        }
    }

    /// The server behind this transport.
    pub fn server(&self) -> &SharedServer {
        &self.server
    }
}

impl Transport for LoopbackTransport {
    fn transact(&mut self, request: &[u8]) -> TransportResult<Vec<u8>> {
        if !self.connected {
            return Err(TransportError::fatal("transport closed"));
        }
        self.server
            .lock()
            .handle(request)
            .map_err(|e| TransportError::fatal(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn close(&mut self) -> TransportResult<()> {
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MessageStore;
    use uuid::Uuid;

    #[test]
    fn closed_transport_refuses() {
        let store = MessageStore::new("/o=Test", Uuid::nil(), Uuid::nil());
        let mut transport = LoopbackTransport::new(LoopbackServer::new(store));
        assert!(transport.is_connected());
        transport.close().unwrap();
        assert!(!transport.is_connected());
        assert!(transport.transact(&[0; 16]).is_err());
    }

    #[test]
    fn unparseable_request_is_fatal() {
        let store = MessageStore::new("/o=Test", Uuid::nil(), Uuid::nil());
        let mut transport = LoopbackTransport::new(LoopbackServer::new(store));
        let err = transport.transact(&[1, 2]).unwrap_err();
        assert!(!err.retryable);
        assert_eq!(transport.server().lock().request_count(), 1);
    }
}

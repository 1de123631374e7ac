//! Sessions and the single-operation transaction.
//!
//! Every remote operation is one [`RequestEnvelope`] sent over the
//! session's transport and one [`ResponseEnvelope`] read back. The bytes
//! of both live in a per-call [`Arena`] that is released on every return
//! path; callers only ever see owned values decoded out of it.

use crate::arena::Arena;
use crate::context::MapiContext;
use crate::error::{MapiError, MapiResult};
use crate::handle::{MapiObject, SessionId};
use crate::transport::Transport;
use mapi_codec::Decode;
use mapi_protocol::{RequestEnvelope, ResponseEnvelope, RopRequest, INVALID_HANDLE};
use std::fmt;
use tracing::{debug, warn};

/// An open session.
pub(crate) struct Session {
    transport: Box<dyn Transport>,
}

impl Session {
    pub(crate) fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    pub(crate) fn close(&mut self) -> MapiResult<()> {
        Ok(self.transport.close()?)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connected", &self.transport.is_connected())
            .finish()
    }
}

/// What a request is addressed to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target {
    /// An existing server object.
    Object(MapiObject),
    /// The session itself, for logon.
    Session(SessionId),
}

impl MapiContext {
    /// Sends one request and returns the successful reply envelope.
    ///
    /// Objects are addressed as handle list slot 0. Requests that create an
    /// object get a second placeholder slot for the server to fill in;
    /// session-level requests send only the placeholder.
    pub(crate) fn transact(
        &mut self,
        target: Target,
        request: RopRequest,
    ) -> MapiResult<ResponseEnvelope> {
        self.ensure_initialized()?;
        let opnum = request.opnum();
        let (session_id, handles) = match target {
            Target::Object(obj) => {
                let entry = self.entry(obj)?;
                let handles = match request.output_handle_index() {
                    Some(_) => vec![entry.handle, INVALID_HANDLE],
                    None => vec![entry.handle],
                };
                (entry.session, handles)
            }
            Target::Session(session) => {
                if self.sessions.get(session).is_none() {
                    return Err(MapiError::invalid_parameter(format!(
                        "{session} is not open"
                    )));
                }
                (session, vec![INVALID_HANDLE])
            }
        };

        let envelope = RequestEnvelope::new(&request, self.config().logon_id, 0, handles)?;
        let max = self.config().max_envelope_size;
        if envelope.encoded_len() > max {
            return Err(MapiError::invalid_parameter(format!(
                "{opnum:?} request of {} bytes exceeds the {max}-byte limit",
                envelope.encoded_len()
            )));
        }

        let mut arena = Arena::with_limit(format!("{opnum:?}"), self.config().call_arena_limit);
        let root = arena.root();
        let request_buf = arena.store(root, &envelope.encode()?)?;
        debug!(
            ?opnum,
            handle = envelope.handles().first().copied().unwrap_or(INVALID_HANDLE),
            size = envelope.size(),
            mapi_len = envelope.mapi_len(),
            "dispatching request"
        );

        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| MapiError::invalid_parameter(format!("{session_id} is not open")))?;
        let reply = session
            .transport
            .transact(arena.get(request_buf)?)
            .map_err(|e| {
                warn!(?opnum, error = %e, retryable = e.retryable, "transport failure");
                MapiError::from(e)
            })?;
        if reply.is_empty() {
            warn!(?opnum, "empty reply");
            return Err(MapiError::call_failed(format!("{opnum:?} got an empty reply")));
        }

        let reply_scope = arena.child(root, "reply")?;
        let reply_buf = arena.store(reply_scope, &reply)?;
        let response =
            ResponseEnvelope::decode(arena.get(reply_buf)?).map_err(MapiError::decode_failed)?;

        if response.opnum() != opnum {
            warn!(?opnum, reply = ?response.opnum(), "reply answers another operation");
            return Err(MapiError::call_failed(format!(
                "{opnum:?} answered with {:?}",
                response.opnum()
            )));
        }
        if !response.status().is_success() {
            warn!(?opnum, status = %response.status(), "remote failure");
            return Err(MapiError::Remote {
                opnum,
                status: response.status(),
            });
        }
        debug!(?opnum, handles = response.handles().len(), "reply decoded");
        Ok(response)
    }
}

/// Decodes the typed payload of a successful reply.
pub(crate) fn decode_reply<T: Decode>(response: &ResponseEnvelope) -> MapiResult<T> {
    response.reply().map_err(MapiError::decode_failed)
}

/// Server handle created by a request at `index` of the handle list.
pub(crate) fn created_handle(response: &ResponseEnvelope, index: u8) -> MapiResult<u32> {
    response.handle_at(index).ok_or_else(|| {
        MapiError::call_failed(format!(
            "{:?} reply carries no handle at slot {index}",
            response.opnum()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapiConfig;
    use crate::context::ObjectEntry;
    use crate::handle::ObjectKind;
    use crate::transport::{MockTransport, TransportError};
    use mapi_protocol::{
        LongTermIdFromIdRequest, MapiStatus, Opnum, LENGTH_FIELD_SIZE, REQUEST_HEADER_SIZE,
    };

    fn setup(config: MapiConfig) -> (MapiContext, MockTransport, MapiObject) {
        let mut ctx = MapiContext::initialize(config);
        let transport = MockTransport::new();
        let session = ctx.open_session(Box::new(transport.clone())).unwrap();
        let obj = ctx.register(ObjectEntry {
            session,
            handle: 0x55,
            id: 0,
            kind: ObjectKind::Store,
            logon: None,
        });
        (ctx, transport, obj)
    }

    fn release_reply(status: MapiStatus) -> Vec<u8> {
        ResponseEnvelope::failure(Opnum::Release, 0, status, vec![0x55])
            .encode()
            .unwrap()
    }

    #[test]
    fn request_layout_on_the_wire() {
        let (mut ctx, transport, obj) = setup(MapiConfig::default().with_logon_id(2));
        transport.push_reply(release_reply(MapiStatus::SUCCESS));

        ctx.transact(Target::Object(obj), RopRequest::Release).unwrap();

        let sent = transport.requests();
        let env = RequestEnvelope::decode(&sent[0]).unwrap();
        assert_eq!(env.opnum(), Opnum::Release);
        assert_eq!(env.logon_id(), 2);
        assert_eq!(env.handle_index(), 0);
        assert_eq!(env.handles(), &[0x55]);
        assert_eq!(env.size(), REQUEST_HEADER_SIZE);
        assert_eq!(
            u32::from_le_bytes([sent[0][0], sent[0][1], sent[0][2], sent[0][3]]) as usize,
            env.size() + LENGTH_FIELD_SIZE
        );
    }

    #[test]
    fn remote_status_returned_verbatim() {
        let (mut ctx, transport, obj) = setup(MapiConfig::default());
        transport.push_reply(release_reply(MapiStatus::NO_ACCESS));

        let err = ctx
            .transact(Target::Object(obj), RopRequest::Release)
            .unwrap_err();
        assert_eq!(
            err,
            MapiError::Remote {
                opnum: Opnum::Release,
                status: MapiStatus::NO_ACCESS
            }
        );
    }

    #[test]
    fn transport_failure_is_call_failed() {
        let (mut ctx, transport, obj) = setup(MapiConfig::default());
        transport.push_error(TransportError::retryable("timed out"));
        let err = ctx
            .transact(Target::Object(obj), RopRequest::Release)
            .unwrap_err();
        assert_eq!(err.status(), MapiStatus::CALL_FAILED);
    }

    #[test]
    fn malformed_reply_is_call_failed() {
        let (mut ctx, transport, obj) = setup(MapiConfig::default());
        transport.push_reply(vec![3, 0]);
        let err = ctx
            .transact(Target::Object(obj), RopRequest::Release)
            .unwrap_err();
        assert_eq!(err.status(), MapiStatus::CALL_FAILED);

        transport.push_reply(Vec::new());
        let err = ctx
            .transact(Target::Object(obj), RopRequest::Release)
            .unwrap_err();
        assert_eq!(err.status(), MapiStatus::CALL_FAILED);
    }

    #[test]
    fn mismatched_opnum_is_call_failed() {
        let (mut ctx, transport, obj) = setup(MapiConfig::default());
        let reply = ResponseEnvelope::failure(Opnum::OpenFolder, 0, MapiStatus::SUCCESS, vec![])
            .encode()
            .unwrap();
        transport.push_reply(reply);
        let err = ctx
            .transact(Target::Object(obj), RopRequest::Release)
            .unwrap_err();
        assert_eq!(err.status(), MapiStatus::CALL_FAILED);
    }

    #[test]
    fn oversized_request_rejected_before_dispatch() {
        let (mut ctx, transport, obj) = setup(MapiConfig::default().with_max_envelope_size(16));
        let request = RopRequest::LongTermIdFromId(LongTermIdFromIdRequest { id: 1 });
        let err = ctx.transact(Target::Object(obj), request).unwrap_err();
        assert_eq!(err.status(), MapiStatus::INVALID_PARAMETER);
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn reply_over_call_arena_limit() {
        let (mut ctx, transport, obj) = setup(MapiConfig::default().with_call_arena_limit(20));
        transport.push_reply(vec![0u8; 64]);
        let err = ctx
            .transact(Target::Object(obj), RopRequest::Release)
            .unwrap_err();
        assert_eq!(err.status(), MapiStatus::NOT_ENOUGH_RESOURCES);
    }

    #[test]
    fn closed_session_invalidates_objects() {
        let (mut ctx, transport, obj) = setup(MapiConfig::default());
        let session = ctx.object_session(obj).unwrap();
        ctx.close_session(session).unwrap();
        let err = ctx
            .transact(Target::Object(obj), RopRequest::Release)
            .unwrap_err();
        assert_eq!(err.status(), MapiStatus::INVALID_PARAMETER);
        assert_eq!(transport.request_count(), 0);
    }
}

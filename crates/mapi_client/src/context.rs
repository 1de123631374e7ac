//! The client context: subsystem state, sessions and the object table.

use crate::arena::{Arena, BufferRef};
use crate::config::MapiConfig;
use crate::error::{MapiError, MapiResult};
use crate::handle::{MapiObject, ObjectKind, SessionId, SlotTable};
use crate::session::Session;
use crate::transport::Transport;
use mapi_protocol::{LogonReply, MapiStatus};
use tracing::{info, warn};

/// Server-side object known to the client.
#[derive(Debug)]
pub(crate) struct ObjectEntry {
    pub(crate) session: SessionId,
    pub(crate) handle: u32,
    pub(crate) id: u64,
    pub(crate) kind: ObjectKind,
    pub(crate) logon: Option<LogonReply>,
}

/// Initialized MAPI subsystem.
///
/// Every operation goes through a context: it owns the open sessions, the
/// table of server objects, a long-lived allocation arena and the
/// last-error slot. All state is mutated through `&mut self`; share a
/// context between threads by wrapping it in a mutex.
#[derive(Debug)]
pub struct MapiContext {
    config: MapiConfig,
    initialized: bool,
    arena: Arena,
    pub(crate) sessions: SlotTable<SessionId, Session>,
    pub(crate) objects: SlotTable<MapiObject, ObjectEntry>,
    last_error: MapiStatus,
}

impl MapiContext {
    /// Initializes the subsystem.
    pub fn initialize(config: MapiConfig) -> Self {
        info!(
            logon_id = config.logon_id,
            max_envelope_size = config.max_envelope_size,
            "MAPI subsystem initialized"
        );
        Self {
            arena: Arena::with_limit("context", config.arena_limit),
            config,
            initialized: true,
            sessions: SlotTable::new(),
            objects: SlotTable::new(),
            last_error: MapiStatus::SUCCESS,
        }
    }

    /// Shuts the subsystem down.
    ///
    /// Closes every session, forgets every object and frees every buffer
    /// handed out by [`allocate_buffer`](Self::allocate_buffer). Any later
    /// operation fails with `NotInitialized`.
    pub fn uninitialize(&mut self) {
        if !self.initialized {
            return;
        }
        for id in self.sessions.keys() {
            if let Some(mut session) = self.sessions.remove(id) {
                if let Err(e) = session.close() {
                    warn!(session = %id, error = %e, "failed to close transport");
                }
            }
        }
        self.objects.remove_where(|_| true);
        self.arena = Arena::with_limit("context", self.config.arena_limit);
        self.initialized = false;
        info!("MAPI subsystem uninitialized");
    }

    /// Returns true until [`uninitialize`](Self::uninitialize) is called.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Configuration the context was initialized with.
    pub fn config(&self) -> &MapiConfig {
        &self.config
    }

    /// Status of the most recent operation.
    ///
    /// Zero after a success; otherwise the status of the failure, which
    /// the returned `Result` carries as well.
    pub fn last_error(&self) -> MapiStatus {
        self.last_error
    }

    /// Opens a session over an established transport.
    pub fn open_session(&mut self, transport: Box<dyn Transport>) -> MapiResult<SessionId> {
        self.tracked(|ctx| {
            ctx.ensure_initialized()?;
            if !transport.is_connected() {
                return Err(MapiError::call_failed("transport is not connected"));
            }
            let id = ctx.sessions.insert(Session::new(transport));
            info!(session = %id, "session opened");
            Ok(id)
        })
    }

    /// Closes a session and invalidates every object opened under it.
    pub fn close_session(&mut self, session: SessionId) -> MapiResult<()> {
        self.tracked(|ctx| {
            ctx.ensure_initialized()?;
            let mut removed = ctx
                .sessions
                .remove(session)
                .ok_or_else(|| MapiError::invalid_parameter(format!("{session} is not open")))?;
            let dropped = ctx.objects.remove_where(|e| e.session == session);
            info!(session = %session, objects = dropped, "session closed");
            removed.close()
        })
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of live objects across all sessions.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Kind of a live object.
    ///
    /// This and the other `&self` lookups below leave
    /// [`last_error`](Self::last_error) unchanged, even when they fail.
    pub fn object_kind(&self, obj: MapiObject) -> MapiResult<ObjectKind> {
        Ok(self.entry(obj)?.kind)
    }

    /// Logical id of a live object: the folder id for folders, zero otherwise.
    pub fn object_id(&self, obj: MapiObject) -> MapiResult<u64> {
        Ok(self.entry(obj)?.id)
    }

    /// Server handle of a live object.
    pub fn object_handle(&self, obj: MapiObject) -> MapiResult<u32> {
        Ok(self.entry(obj)?.handle)
    }

    /// Session a live object belongs to.
    pub fn object_session(&self, obj: MapiObject) -> MapiResult<SessionId> {
        Ok(self.entry(obj)?.session)
    }

    /// Allocates a zeroed buffer that lives until freed or until the
    /// context is uninitialized.
    pub fn allocate_buffer(&mut self, size: usize) -> MapiResult<BufferRef> {
        self.tracked(|ctx| {
            ctx.ensure_initialized()?;
            let root = ctx.arena.root();
            ctx.arena.allocate(root, size)
        })
    }

    /// Frees a buffer from [`allocate_buffer`](Self::allocate_buffer).
    pub fn free_buffer(&mut self, buf: BufferRef) -> MapiResult<()> {
        self.tracked(|ctx| {
            ctx.ensure_initialized()?;
            ctx.arena.free(buf)
        })
    }

    /// Reads a buffer from [`allocate_buffer`](Self::allocate_buffer).
    ///
    /// Leaves [`last_error`](Self::last_error) unchanged.
    pub fn buffer(&self, buf: BufferRef) -> MapiResult<&[u8]> {
        self.ensure_initialized()?;
        self.arena.get(buf)
    }

    /// Writes a buffer from [`allocate_buffer`](Self::allocate_buffer).
    pub fn buffer_mut(&mut self, buf: BufferRef) -> MapiResult<&mut [u8]> {
        let checked = self
            .ensure_initialized()
            .and_then(|()| self.arena.get(buf).map(|_| ()));
        self.tracked(|_| checked)?;
        self.arena.get_mut(buf)
    }

    /// Runs `f` and mirrors its outcome into the last-error slot.
    pub(crate) fn tracked<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> MapiResult<T>,
    ) -> MapiResult<T> {
        let result = f(self);
        self.last_error = match &result {
            Ok(_) => MapiStatus::SUCCESS,
            Err(e) => e.status(),
        };
        result
    }

    pub(crate) fn ensure_initialized(&self) -> MapiResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(MapiError::NotInitialized)
        }
    }

    /// Resolves a live object whose session is still open.
    pub(crate) fn entry(&self, obj: MapiObject) -> MapiResult<&ObjectEntry> {
        self.ensure_initialized()?;
        let entry = self
            .objects
            .get(obj)
            .ok_or_else(|| MapiError::invalid_parameter(format!("{obj} is not a live object")))?;
        if self.sessions.get(entry.session).is_none() {
            return Err(MapiError::invalid_parameter(format!(
                "{obj} belongs to a closed session"
            )));
        }
        Ok(entry)
    }

    /// Resolves a live object of a given kind.
    pub(crate) fn entry_of(&self, obj: MapiObject, kinds: &[ObjectKind]) -> MapiResult<&ObjectEntry> {
        let entry = self.entry(obj)?;
        if !kinds.contains(&entry.kind) {
            return Err(MapiError::invalid_parameter(format!(
                "{obj} is a {:?}, expected one of {kinds:?}",
                entry.kind
            )));
        }
        Ok(entry)
    }

    pub(crate) fn register(&mut self, entry: ObjectEntry) -> MapiObject {
        self.objects.insert(entry)
    }

    pub(crate) fn forget(&mut self, obj: MapiObject) -> Option<ObjectEntry> {
        self.objects.remove(obj)
    }
}

impl Drop for MapiContext {
    fn drop(&mut self) {
        self.uninitialize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn context() -> MapiContext {
        MapiContext::initialize(MapiConfig::default())
    }

    #[test]
    fn session_lifecycle() {
        let mut ctx = context();
        let transport = MockTransport::new();
        let session = ctx.open_session(Box::new(transport.clone())).unwrap();
        assert_eq!(ctx.session_count(), 1);
        assert_eq!(ctx.last_error(), MapiStatus::SUCCESS);

        ctx.close_session(session).unwrap();
        assert_eq!(ctx.session_count(), 0);
        assert!(!transport.is_connected());

        let err = ctx.close_session(session).unwrap_err();
        assert_eq!(err.status(), MapiStatus::INVALID_PARAMETER);
        assert_eq!(ctx.last_error(), MapiStatus::INVALID_PARAMETER);
    }

    #[test]
    fn disconnected_transport_refused() {
        let mut ctx = context();
        let transport = MockTransport::new();
        transport.set_connected(false);
        let err = ctx.open_session(Box::new(transport)).unwrap_err();
        assert_eq!(err.status(), MapiStatus::CALL_FAILED);
    }

    #[test]
    fn uninitialized_context_rejects_everything() {
        let mut ctx = context();
        let transport = MockTransport::new();
        ctx.open_session(Box::new(transport.clone())).unwrap();
        let buf = ctx.allocate_buffer(4).unwrap();

        ctx.uninitialize();
        assert!(!ctx.is_initialized());
        assert!(!transport.is_connected());
        assert_eq!(ctx.session_count(), 0);

        assert_eq!(
            ctx.open_session(Box::new(MockTransport::new())),
            Err(MapiError::NotInitialized)
        );
        assert_eq!(ctx.last_error(), MapiStatus::NOT_INITIALIZED);
        assert_eq!(ctx.allocate_buffer(4), Err(MapiError::NotInitialized));
        assert_eq!(ctx.buffer(buf), Err(MapiError::NotInitialized));
    }

    #[test]
    fn context_buffers() {
        let mut ctx = context();
        let buf = ctx.allocate_buffer(3).unwrap();
        ctx.buffer_mut(buf).unwrap().copy_from_slice(b"abc");
        assert_eq!(ctx.buffer(buf).unwrap(), b"abc");
        ctx.free_buffer(buf).unwrap();
        assert!(ctx.buffer(buf).is_err());

        let err = ctx.free_buffer(buf).unwrap_err();
        assert_eq!(err.status(), MapiStatus::INVALID_PARAMETER);
        assert_eq!(ctx.last_error(), MapiStatus::INVALID_PARAMETER);

        assert_eq!(
            ctx.allocate_buffer(0).unwrap_err().status(),
            MapiStatus::INVALID_PARAMETER
        );
    }

    #[test]
    fn context_arena_limit() {
        let mut ctx = MapiContext::initialize(MapiConfig::default().with_arena_limit(8));
        ctx.allocate_buffer(8).unwrap();
        let err = ctx.allocate_buffer(1).unwrap_err();
        assert_eq!(err.status(), MapiStatus::NOT_ENOUGH_RESOURCES);
        assert_eq!(ctx.last_error(), MapiStatus::NOT_ENOUGH_RESOURCES);
    }

    #[test]
    fn buffer_writes_track_last_error() {
        let mut ctx = context();
        let buf = ctx.allocate_buffer(2).unwrap();
        ctx.free_buffer(buf).unwrap();

        let err = ctx.buffer_mut(buf).unwrap_err();
        assert_eq!(err.status(), MapiStatus::INVALID_PARAMETER);
        assert_eq!(ctx.last_error(), MapiStatus::INVALID_PARAMETER);

        let live = ctx.allocate_buffer(2).unwrap();
        ctx.buffer_mut(live).unwrap().copy_from_slice(b"ok");
        assert_eq!(ctx.last_error(), MapiStatus::SUCCESS);
    }

    #[test]
    fn lookups_leave_last_error_alone() {
        let mut ctx = context();
        let buf = ctx.allocate_buffer(1).unwrap();
        ctx.free_buffer(buf).unwrap();
        assert!(ctx.free_buffer(buf).is_err());
        assert_eq!(ctx.last_error(), MapiStatus::INVALID_PARAMETER);

        let stale = ctx.objects.insert(ObjectEntry {
            session: ctx.sessions.insert(Session::new(Box::new(MockTransport::new()))),
            handle: 0,
            id: 0,
            kind: ObjectKind::Folder,
            logon: None,
        });
        ctx.forget(stale);
        ctx.allocate_buffer(1).unwrap();
        assert_eq!(ctx.last_error(), MapiStatus::SUCCESS);

        assert!(ctx.object_kind(stale).is_err());
        assert!(ctx.buffer(buf).is_err());
        assert_eq!(ctx.last_error(), MapiStatus::SUCCESS);
    }
}

//! Logon and folder access.

use crate::context::{MapiContext, ObjectEntry};
use crate::error::{MapiError, MapiResult};
use crate::handle::{MapiObject, ObjectKind, SessionId};
use crate::session::{created_handle, decode_reply, Target};
use mapi_protocol::{
    DefaultFolder, LogonReply, LogonRequest, OpenFolderReply, OpenFolderRequest, RopRequest,
};
use tracing::info;

/// Logon flag selecting a private mailbox.
pub const LOGON_PRIVATE: u8 = 0x01;

/// Open flags of a logon to the user's own mailbox.
pub const OPEN_FLAGS_HOME_LOGON: u32 = 0x0100_0000 | 0x0000_0002;

impl MapiContext {
    /// Logs on to the session's private mailbox.
    pub fn open_msg_store(&mut self, session: SessionId) -> MapiResult<MapiObject> {
        self.tracked(|ctx| {
            let request = RopRequest::Logon(LogonRequest {
                logon_flags: LOGON_PRIVATE,
                open_flags: OPEN_FLAGS_HOME_LOGON,
                store_state: 0,
                essdn: ctx.config().essdn.clone(),
            });
            let response = ctx.transact(Target::Session(session), request)?;
            let reply: LogonReply = decode_reply(&response)?;
            let handle = created_handle(&response, 0)?;
            info!(
                session = %session,
                mailbox = %reply.mailbox_guid,
                essdn = %ctx.config().essdn,
                "logged on"
            );
            Ok(ctx.register(ObjectEntry {
                session,
                handle,
                id: 0,
                kind: ObjectKind::Store,
                logon: Some(reply),
            }))
        })
    }

    /// Id of a special folder, as reported at logon.
    pub fn get_default_folder(&mut self, store: MapiObject, folder: DefaultFolder) -> MapiResult<u64> {
        self.tracked(|ctx| {
            let entry = ctx.entry_of(store, &[ObjectKind::Store])?;
            let logon = entry
                .logon
                .as_ref()
                .ok_or_else(|| MapiError::invalid_parameter(format!("{store} has no logon")))?;
            Ok(logon.folder_ids[folder.index()])
        })
    }

    /// Opens a folder below a store or another folder.
    pub fn open_folder(&mut self, parent: MapiObject, folder_id: u64) -> MapiResult<MapiObject> {
        self.tracked(|ctx| {
            let session = ctx
                .entry_of(parent, &[ObjectKind::Store, ObjectKind::Folder])?
                .session;
            if folder_id == 0 {
                return Err(MapiError::invalid_parameter("folder id is zero"));
            }
            let request = RopRequest::OpenFolder(OpenFolderRequest {
                output_handle_index: 1,
                folder_id,
                open_mode: 0,
            });
            let response = ctx.transact(Target::Object(parent), request)?;
            let _reply: OpenFolderReply = decode_reply(&response)?;
            let handle = created_handle(&response, 1)?;
            Ok(ctx.register(ObjectEntry {
                session,
                handle,
                id: folder_id,
                kind: ObjectKind::Folder,
                logon: None,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::handle::ObjectKind;
    use crate::ops::support::{failure, folder_ids, logged_on, success, STORE_HANDLE};
    use mapi_protocol::{
        DefaultFolder, MapiStatus, OpenFolderReply, Opnum, RequestEnvelope, RopRequest,
        INVALID_HANDLE,
    };

    #[test]
    fn logon_sends_placeholder_handle() {
        let (ctx, transport, store) = logged_on();
        let sent = transport.requests();
        let env = RequestEnvelope::decode(&sent[0]).unwrap();
        assert_eq!(env.opnum(), Opnum::Logon);
        assert_eq!(env.handles(), &[INVALID_HANDLE]);
        match env.request().unwrap() {
            RopRequest::Logon(req) => assert_eq!(req.essdn, "/o=Test/cn=user"),
            other => panic!("unexpected request {other:?}"),
        }
        assert_eq!(ctx.object_handle(store).unwrap(), STORE_HANDLE);
        assert_eq!(ctx.object_kind(store).unwrap(), ObjectKind::Store);
    }

    #[test]
    fn default_folder_lookup() {
        let (mut ctx, transport, store) = logged_on();
        let before = transport.request_count();
        let inbox = ctx.get_default_folder(store, DefaultFolder::Inbox).unwrap();
        assert_eq!(inbox, folder_ids()[4]);
        assert_eq!(transport.request_count(), before);
    }

    #[test]
    fn open_folder_reads_output_slot() {
        let (mut ctx, transport, store) = logged_on();
        transport.push_reply(success(
            Opnum::OpenFolder,
            &OpenFolderReply { has_rules: false },
            vec![STORE_HANDLE, 0x20],
        ));
        let inbox_id = folder_ids()[4];
        let inbox = ctx.open_folder(store, inbox_id).unwrap();
        assert_eq!(ctx.object_handle(inbox).unwrap(), 0x20);
        assert_eq!(ctx.object_id(inbox).unwrap(), inbox_id);

        let sent = transport.requests();
        let env = RequestEnvelope::decode(sent.last().unwrap()).unwrap();
        assert_eq!(env.handles(), &[STORE_HANDLE, INVALID_HANDLE]);

        assert!(ctx.get_default_folder(inbox, DefaultFolder::Inbox).is_err());
    }

    #[test]
    fn open_folder_without_output_handle_fails() {
        let (mut ctx, transport, store) = logged_on();
        transport.push_reply(success(
            Opnum::OpenFolder,
            &OpenFolderReply { has_rules: false },
            vec![STORE_HANDLE, INVALID_HANDLE],
        ));
        let err = ctx.open_folder(store, 5).unwrap_err();
        assert_eq!(err.status(), MapiStatus::CALL_FAILED);
        assert_eq!(ctx.object_count(), 1);
    }

    #[test]
    fn open_folder_remote_failure() {
        let (mut ctx, transport, store) = logged_on();
        transport.push_reply(failure(
            Opnum::OpenFolder,
            MapiStatus::NOT_FOUND,
            vec![STORE_HANDLE, INVALID_HANDLE],
        ));
        let err = ctx.open_folder(store, 99).unwrap_err();
        assert_eq!(err.status(), MapiStatus::NOT_FOUND);
        assert_eq!(ctx.last_error(), MapiStatus::NOT_FOUND);
    }

    #[test]
    fn zero_folder_id_rejected_locally() {
        let (mut ctx, transport, store) = logged_on();
        let before = transport.request_count();
        let err = ctx.open_folder(store, 0).unwrap_err();
        assert_eq!(err.status(), MapiStatus::INVALID_PARAMETER);
        assert_eq!(transport.request_count(), before);
    }
}

//! In-process server answering request envelopes from a [`MessageStore`].

use crate::error::{ServerError, ServerResult};
use crate::evaluate::filter;
use crate::store::{MessageStore, Row};
use mapi_codec::{CodecResult, Encode, NdrEncoder, PropertyTag};
use mapi_protocol::{
    Empty, GetContentsTableReply, IdFromLongTermIdReply, LogonReply, LongTermIdFromIdReply,
    OpenFolderReply, QueryPositionReply, RequestEnvelope, ResponseEnvelope, Restriction,
    RopRequest, TableStatusReply, INVALID_HANDLE,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Configuration for the loopback server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of simultaneously open objects.
    pub max_objects: usize,
}

impl ServerConfig {
    /// Creates a configuration with the given object limit.
    pub fn new(max_objects: usize) -> Self {
        Self { max_objects }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(256)
    }
}

#[derive(Debug, Clone)]
struct TableState {
    folder: u64,
    columns: Vec<PropertyTag>,
    restriction: Option<Restriction>,
}

#[derive(Debug, Clone)]
enum ServerObject {
    Store,
    Folder(u64),
    Table(TableState),
}

impl ServerObject {
    fn kind(&self) -> &'static str {
        match self {
            ServerObject::Store => "a store",
            ServerObject::Folder(_) => "a folder",
            ServerObject::Table(_) => "a table",
        }
    }
}

enum Reply {
    Empty,
    Logon(LogonReply),
    OpenFolder(OpenFolderReply),
    GetContentsTable(GetContentsTableReply),
    TableStatus(TableStatusReply),
    QueryPosition(QueryPositionReply),
    LongTermIdFromId(LongTermIdFromIdReply),
    IdFromLongTermId(IdFromLongTermIdReply),
}

impl Encode for Reply {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        match self {
            Reply::Empty => Empty.encode(encoder),
            Reply::Logon(r) => r.encode(encoder),
            Reply::OpenFolder(r) => r.encode(encoder),
            Reply::GetContentsTable(r) => r.encode(encoder),
            Reply::TableStatus(r) => r.encode(encoder),
            Reply::QueryPosition(r) => r.encode(encoder),
            Reply::LongTermIdFromId(r) => r.encode(encoder),
            Reply::IdFromLongTermId(r) => r.encode(encoder),
        }
    }
}

/// Loopback server for one mailbox.
#[derive(Debug)]
pub struct LoopbackServer {
    store: MessageStore,
    config: ServerConfig,
    objects: HashMap<u32, ServerObject>,
    next_handle: u32,
    requests: u64,
}

impl LoopbackServer {
    /// Creates a server for `store` with the default configuration.
    pub fn new(store: MessageStore) -> Self {
        Self::with_config(store, ServerConfig::default())
    }

    /// Creates a server with an explicit configuration.
    pub fn with_config(store: MessageStore, config: ServerConfig) -> Self {
        Self {
            store,
            config,
            objects: HashMap::new(),
            next_handle: 1,
            requests: 0,
        }
    }

    /// The served store.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Mutable access to the served store.
    pub fn store_mut(&mut self) -> &mut MessageStore {
        &mut self.store
    }

    /// Number of objects currently open.
    pub fn open_objects(&self) -> usize {
        self.objects.len()
    }

    /// Number of envelopes handled.
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    /// Rows a table currently exposes: restricted, projected onto its columns.
    pub fn query_rows(&self, handle: u32) -> ServerResult<Vec<Row>> {
        let table = self.table(handle)?;
        let folder = self.folder_rows(table.folder)?;
        Ok(filter(table.restriction.as_ref(), folder)
            .map(|row| {
                if table.columns.is_empty() {
                    row.clone()
                } else {
                    row.iter()
                        .filter(|(tag, _)| table.columns.contains(tag))
                        .map(|(tag, value)| (*tag, value.clone()))
                        .collect()
                }
            })
            .collect())
    }

    /// Handles one serialized request envelope.
    ///
    /// Operation failures come back as a reply carrying the failure status.
    /// Only an envelope that cannot be parsed at all is an `Err`.
    pub fn handle(&mut self, request: &[u8]) -> ServerResult<Vec<u8>> {
        self.requests += 1;
        let envelope = RequestEnvelope::decode(request)?;
        let opnum = envelope.opnum();
        let index = envelope.handle_index();
        let mut handles = envelope.handles().to_vec();
        debug!(?opnum, logon_id = envelope.logon_id(), handles = ?handles, "handling request");

        let response = match self.dispatch(&envelope, &mut handles) {
            Ok(reply) => ResponseEnvelope::success(opnum, index, &reply, handles)?,
            Err(err) => {
                warn!(?opnum, error = %err, "operation failed");
                ResponseEnvelope::failure(opnum, index, err.status(), envelope.handles().to_vec())
            }
        };
        Ok(response.encode()?)
    }

    fn dispatch(&mut self, envelope: &RequestEnvelope, handles: &mut [u32]) -> ServerResult<Reply> {
        let index = usize::from(envelope.handle_index());
        let input = handles[index];
        match envelope.request()? {
            RopRequest::Logon(req) => {
                if req.essdn != self.store.essdn() {
                    return Err(ServerError::LogonFailed(format!(
                        "no mailbox for '{}'",
                        req.essdn
                    )));
                }
                handles[index] = self.open(ServerObject::Store)?;
                Ok(Reply::Logon(LogonReply {
                    logon_flags: req.logon_flags,
                    folder_ids: self.store.special_folder_ids(),
                    mailbox_guid: self.store.mailbox_guid(),
                }))
            }
            RopRequest::Release => {
                self.objects
                    .remove(&input)
                    .ok_or(ServerError::InvalidObject(input))?;
                Ok(Reply::Empty)
            }
            RopRequest::OpenFolder(req) => {
                match self.object(input)? {
                    ServerObject::Store | ServerObject::Folder(_) => {}
                    other => return Err(ServerError::WrongObject(other.kind())),
                }
                if self.store.folder(req.folder_id).is_none() {
                    return Err(ServerError::NotFound(format!(
                        "folder 0x{:016x}",
                        req.folder_id
                    )));
                }
                let handle = self.open(ServerObject::Folder(req.folder_id))?;
                set_output(handles, req.output_handle_index, handle)?;
                Ok(Reply::OpenFolder(OpenFolderReply { has_rules: false }))
            }
            RopRequest::GetContentsTable(req) => {
                let folder = match self.object(input)? {
                    ServerObject::Folder(id) => *id,
                    other => return Err(ServerError::WrongObject(other.kind())),
                };
                let row_count = self.folder_rows(folder)?.len() as u32;
                let handle = self.open(ServerObject::Table(TableState {
                    folder,
                    columns: Vec::new(),
                    restriction: None,
                }))?;
                set_output(handles, req.output_handle_index, handle)?;
                Ok(Reply::GetContentsTable(GetContentsTableReply { row_count }))
            }
            RopRequest::SetColumns(req) => {
                self.table_mut(input)?.columns = req.columns;
                Ok(Reply::TableStatus(TableStatusReply { table_status: 0 }))
            }
            RopRequest::Restrict(req) => {
                self.table_mut(input)?.restriction = req.restriction;
                Ok(Reply::TableStatus(TableStatusReply { table_status: 0 }))
            }
            RopRequest::QueryPosition => {
                let table = self.table(input)?;
                let rows = self.folder_rows(table.folder)?;
                let denominator = filter(table.restriction.as_ref(), rows).count() as u32;
                Ok(Reply::QueryPosition(QueryPositionReply {
                    numerator: 0,
                    denominator,
                }))
            }
            RopRequest::LongTermIdFromId(req) => {
                self.object(input)?;
                let long_term_id = self
                    .store
                    .long_term_id(req.id)
                    .ok_or_else(|| ServerError::NotFound(format!("id 0x{:016x}", req.id)))?;
                Ok(Reply::LongTermIdFromId(LongTermIdFromIdReply { long_term_id }))
            }
            RopRequest::IdFromLongTermId(req) => {
                self.object(input)?;
                let id = self
                    .store
                    .id_for(&req.long_term_id)
                    .ok_or_else(|| ServerError::NotFound(format!("long-term id {}", req.long_term_id)))?;
                Ok(Reply::IdFromLongTermId(IdFromLongTermIdReply { id }))
            }
        }
    }

    fn open(&mut self, object: ServerObject) -> ServerResult<u32> {
        if self.objects.len() >= self.config.max_objects {
            return Err(ServerError::SessionLimit {
                limit: self.config.max_objects,
            });
        }
        let mut handle = self.next_handle;
        while handle == INVALID_HANDLE || self.objects.contains_key(&handle) {
            handle = handle.wrapping_add(1);
        }
        self.next_handle = handle.wrapping_add(1);
        self.objects.insert(handle, object);
        Ok(handle)
    }

    fn object(&self, handle: u32) -> ServerResult<&ServerObject> {
        self.objects
            .get(&handle)
            .ok_or(ServerError::InvalidObject(handle))
    }

    fn table(&self, handle: u32) -> ServerResult<&TableState> {
        match self.object(handle)? {
            ServerObject::Table(table) => Ok(table),
            other => Err(ServerError::WrongObject(other.kind())),
        }
    }

    fn table_mut(&mut self, handle: u32) -> ServerResult<&mut TableState> {
        match self.objects.get_mut(&handle) {
            Some(ServerObject::Table(table)) => Ok(table),
            Some(other) => Err(ServerError::WrongObject(other.kind())),
            None => Err(ServerError::InvalidObject(handle)),
        }
    }

    fn folder_rows(&self, folder: u64) -> ServerResult<&[Row]> {
        self.store
            .folder(folder)
            .map(|f| f.rows())
            .ok_or_else(|| ServerError::NotFound(format!("folder 0x{folder:016x}")))
    }
}

fn set_output(handles: &mut [u32], index: u8, handle: u32) -> ServerResult<()> {
    let slot = handles
        .get_mut(usize::from(index))
        .ok_or_else(|| ServerError::InvalidRequest(format!("no handle slot {index}")))?;
    *slot = handle;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapi_codec::PropertyValue;
    use mapi_protocol::{
        DefaultFolder, GetContentsTableRequest, LogonRequest, MapiStatus, OpenFolderRequest,
    };
    use uuid::Uuid;

    const ESSDN: &str = "/o=Test/cn=user";

    fn server() -> LoopbackServer {
        let mut store = MessageStore::new(ESSDN, Uuid::from_u128(1), Uuid::from_u128(2));
        let inbox = store.default_folder(DefaultFolder::Inbox);
        store
            .add_message(inbox, [(PropertyTag::SUBJECT, PropertyValue::String8("a".into()))])
            .unwrap();
        LoopbackServer::new(store)
    }

    fn call(server: &mut LoopbackServer, request: RopRequest, handles: Vec<u32>) -> ResponseEnvelope {
        let env = RequestEnvelope::new(&request, 0, 0, handles).unwrap();
        let reply = server.handle(&env.encode().unwrap()).unwrap();
        ResponseEnvelope::decode(&reply).unwrap()
    }

    fn logon(server: &mut LoopbackServer) -> u32 {
        let reply = call(
            server,
            RopRequest::Logon(LogonRequest {
                logon_flags: 1,
                open_flags: 0,
                store_state: 0,
                essdn: ESSDN.into(),
            }),
            vec![INVALID_HANDLE],
        );
        assert!(reply.status().is_success());
        reply.handle_at(0).unwrap()
    }

    #[test]
    fn logon_fills_handle_slot() {
        let mut server = server();
        let store = logon(&mut server);
        assert_ne!(store, INVALID_HANDLE);
        assert_eq!(server.open_objects(), 1);
    }

    #[test]
    fn logon_to_unknown_mailbox_fails() {
        let mut server = server();
        let reply = call(
            &mut server,
            RopRequest::Logon(LogonRequest {
                logon_flags: 1,
                open_flags: 0,
                store_state: 0,
                essdn: "/o=Other".into(),
            }),
            vec![INVALID_HANDLE],
        );
        assert_eq!(reply.status(), MapiStatus::LOGON_FAILED);
    }

    #[test]
    fn contents_table_counts_rows() {
        let mut server = server();
        let store = logon(&mut server);
        let inbox = server.store().default_folder(DefaultFolder::Inbox);
        let reply = call(
            &mut server,
            RopRequest::OpenFolder(OpenFolderRequest {
                output_handle_index: 1,
                folder_id: inbox,
                open_mode: 0,
            }),
            vec![store, INVALID_HANDLE],
        );
        let folder = reply.handle_at(1).unwrap();

        let reply = call(
            &mut server,
            RopRequest::GetContentsTable(GetContentsTableRequest {
                output_handle_index: 1,
                table_flags: 0,
            }),
            vec![folder, INVALID_HANDLE],
        );
        assert_eq!(reply.reply::<GetContentsTableReply>().unwrap().row_count, 1);
        let table = reply.handle_at(1).unwrap();
        assert_eq!(server.query_rows(table).unwrap().len(), 1);
    }

    #[test]
    fn unknown_handle_is_invalid_object() {
        let mut server = server();
        let reply = call(&mut server, RopRequest::Release, vec![0x999]);
        assert_eq!(reply.status(), MapiStatus::INVALID_OBJECT);
    }

    #[test]
    fn table_ops_on_store_are_unsupported() {
        let mut server = server();
        let store = logon(&mut server);
        let reply = call(&mut server, RopRequest::QueryPosition, vec![store]);
        assert_eq!(reply.status(), MapiStatus::NO_SUPPORT);
    }

    #[test]
    fn object_limit() {
        let store = MessageStore::new(ESSDN, Uuid::from_u128(1), Uuid::from_u128(2));
        let mut server = LoopbackServer::with_config(store, ServerConfig::new(1));
        logon(&mut server);
        let reply = call(
            &mut server,
            RopRequest::Logon(LogonRequest {
                logon_flags: 1,
                open_flags: 0,
                store_state: 0,
                essdn: ESSDN.into(),
            }),
            vec![INVALID_HANDLE],
        );
        assert_eq!(reply.status(), MapiStatus::SESSION_LIMIT);
    }

    #[test]
    fn garbage_is_an_error() {
        let mut server = server();
        assert!(server.handle(&[1, 2, 3]).is_err());
        assert_eq!(server.request_count(), 1);
    }
}

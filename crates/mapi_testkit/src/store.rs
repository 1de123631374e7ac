//! In-memory message store served by the loopback server.

use crate::error::{ServerError, ServerResult};
use mapi_codec::{PropertyTag, PropertyValue};
use mapi_protocol::{DefaultFolder, LongTermId, LOGON_FOLDER_COUNT};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One message: its properties keyed by tag.
pub type Row = BTreeMap<PropertyTag, PropertyValue>;

/// Replica id stamped into the low word of every id this store hands out.
pub const REPLICA_ID: u64 = 0x0001;

/// A folder and the messages it holds.
#[derive(Debug, Clone)]
pub struct Folder {
    id: u64,
    parent: Option<u64>,
    name: String,
    rows: Vec<Row>,
}

impl Folder {
    /// Folder id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Parent folder id; `None` for the mailbox root.
    pub fn parent(&self) -> Option<u64> {
        self.parent
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Messages, in insertion order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

/// A private mailbox.
#[derive(Debug, Clone)]
pub struct MessageStore {
    essdn: String,
    mailbox_guid: Uuid,
    database_guid: Uuid,
    special_folders: [u64; LOGON_FOLDER_COUNT],
    folders: BTreeMap<u64, Folder>,
    long_term_ids: BTreeMap<u64, LongTermId>,
    next_counter: u64,
}

/// Six big-endian bytes of a global counter.
pub fn counter_bytes(counter: u64) -> [u8; 6] {
    let be = counter.to_be_bytes();
    [be[2], be[3], be[4], be[5], be[6], be[7]]
}

const SPECIAL_FOLDER_NAMES: [&str; LOGON_FOLDER_COUNT] = [
    "Root",
    "Deferred Action",
    "Spooler Queue",
    "Top of Information Store",
    "Inbox",
    "Outbox",
    "Sent Items",
    "Deleted Items",
    "Common Views",
    "Schedule",
    "Search",
    "Views",
    "Shortcuts",
];

impl MessageStore {
    /// Creates a mailbox with its special folders.
    ///
    /// Folder 0 of the special set is the root; the rest sit directly
    /// below it.
    pub fn new(essdn: impl Into<String>, mailbox_guid: Uuid, database_guid: Uuid) -> Self {
        let mut store = Self {
            essdn: essdn.into(),
            mailbox_guid,
            database_guid,
            special_folders: [0; LOGON_FOLDER_COUNT],
            folders: BTreeMap::new(),
            long_term_ids: BTreeMap::new(),
            next_counter: 1,
        };
        let root = store.insert_folder(None, SPECIAL_FOLDER_NAMES[0]);
        store.special_folders[0] = root;
        for (slot, name) in SPECIAL_FOLDER_NAMES.iter().enumerate().skip(1) {
            store.special_folders[slot] = store.insert_folder(Some(root), *name);
        }
        store
    }

    /// Distinguished name a logon must present.
    pub fn essdn(&self) -> &str {
        &self.essdn
    }

    /// Mailbox GUID returned at logon.
    pub fn mailbox_guid(&self) -> Uuid {
        self.mailbox_guid
    }

    /// Database GUID carried by every long-term id.
    pub fn database_guid(&self) -> Uuid {
        self.database_guid
    }

    /// Special folder ids in logon order.
    pub fn special_folder_ids(&self) -> [u64; LOGON_FOLDER_COUNT] {
        self.special_folders
    }

    /// Id of one special folder.
    pub fn default_folder(&self, folder: DefaultFolder) -> u64 {
        self.special_folders[folder.index()]
    }

    /// Looks up a folder.
    pub fn folder(&self, id: u64) -> Option<&Folder> {
        self.folders.get(&id)
    }

    /// Creates a folder below `parent`.
    pub fn create_folder(&mut self, parent: u64, name: impl Into<String>) -> ServerResult<u64> {
        if !self.folders.contains_key(&parent) {
            return Err(ServerError::NotFound(format!("folder 0x{parent:016x}")));
        }
        Ok(self.insert_folder(Some(parent), name))
    }

    /// Adds a message to `folder`.
    ///
    /// The store assigns the message id and fills in the folder id, message
    /// id, instance id and instance number columns.
    pub fn add_message(
        &mut self,
        folder: u64,
        props: impl IntoIterator<Item = (PropertyTag, PropertyValue)>,
    ) -> ServerResult<u64> {
        if !self.folders.contains_key(&folder) {
            return Err(ServerError::NotFound(format!("folder 0x{folder:016x}")));
        }
        let mid = self.allocate_id();
        let mut row: Row = props.into_iter().collect();
        row.insert(PropertyTag::FID, PropertyValue::LongLong(folder));
        row.insert(PropertyTag::MID, PropertyValue::LongLong(mid));
        row.insert(PropertyTag::INST_ID, PropertyValue::LongLong(mid));
        row.insert(PropertyTag::INSTANCE_NUM, PropertyValue::Long(0));
        if let Some(f) = self.folders.get_mut(&folder) {
            f.rows.push(row);
        }
        Ok(mid)
    }

    /// Binds `id` to an explicit long-term id, replacing any earlier binding.
    pub fn register_id(&mut self, id: u64, long_term_id: LongTermId) {
        self.long_term_ids
            .insert(id, LongTermId::copy_normalized(&long_term_id));
    }

    /// Long-term form of a transient id.
    pub fn long_term_id(&self, id: u64) -> Option<LongTermId> {
        self.long_term_ids.get(&id).copied()
    }

    /// Transient id of a long-term id. Padding is ignored.
    pub fn id_for(&self, long_term_id: &LongTermId) -> Option<u64> {
        self.long_term_ids
            .iter()
            .find(|(_, lt)| {
                lt.database_guid == long_term_id.database_guid
                    && lt.global_counter == long_term_id.global_counter
            })
            .map(|(id, _)| *id)
    }

    fn allocate_id(&mut self) -> u64 {
        let counter = self.next_counter;
        self.next_counter += 1;
        let id = (counter << 16) | REPLICA_ID;
        self.long_term_ids.insert(
            id,
            LongTermId::new(self.database_guid, counter_bytes(counter)),
        );
        id
    }

    fn insert_folder(&mut self, parent: Option<u64>, name: impl Into<String>) -> u64 {
        let id = self.allocate_id();
        self.folders.insert(
            id,
            Folder {
                id,
                parent,
                name: name.into(),
                rows: Vec::new(),
            },
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MessageStore {
        MessageStore::new("/o=Test/cn=user", Uuid::from_u128(1), Uuid::from_u128(2))
    }

    #[test]
    fn special_folders_exist() {
        let store = store();
        let root = store.default_folder(DefaultFolder::Root);
        let inbox = store.default_folder(DefaultFolder::Inbox);
        assert_eq!(store.folder(inbox).unwrap().name(), "Inbox");
        assert_eq!(store.folder(inbox).unwrap().parent(), Some(root));
        assert_eq!(store.folder(root).unwrap().parent(), None);
    }

    #[test]
    fn messages_get_identity_columns() {
        let mut store = store();
        let inbox = store.default_folder(DefaultFolder::Inbox);
        let mid = store
            .add_message(
                inbox,
                [(PropertyTag::SUBJECT, PropertyValue::String8("hi".into()))],
            )
            .unwrap();
        let row = &store.folder(inbox).unwrap().rows()[0];
        assert_eq!(row[&PropertyTag::MID], PropertyValue::LongLong(mid));
        assert_eq!(row[&PropertyTag::FID], PropertyValue::LongLong(inbox));
        assert!(store
            .add_message(0xDEAD, Vec::<(PropertyTag, PropertyValue)>::new())
            .is_err());
    }

    #[test]
    fn allocated_ids_translate_both_ways() {
        let store = store();
        let inbox = store.default_folder(DefaultFolder::Inbox);
        let lt = store.long_term_id(inbox).unwrap();
        assert_eq!(lt.database_guid, store.database_guid());
        assert_eq!(lt.counter(), inbox >> 16);
        assert_eq!(store.id_for(&lt), Some(inbox));
    }

    #[test]
    fn registered_ids_ignore_padding() {
        let mut store = store();
        let mut lt = LongTermId::new(Uuid::from_u128(9), [1, 0, 0, 0, 0, 7]);
        lt.padding = 0x33;
        store.register_id(42, lt);
        assert_eq!(store.long_term_id(42).unwrap().padding, 0);
        assert_eq!(store.id_for(&lt), Some(42));
    }

    #[test]
    fn counter_bytes_are_big_endian() {
        assert_eq!(counter_bytes(0x0100_0000_0007), [1, 0, 0, 0, 0, 7]);
    }
}

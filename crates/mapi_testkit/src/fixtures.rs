//! Test fixtures: a populated mailbox and helpers to log on to it.
//!
//! [`TestMailbox::torture`] builds the restriction scenario below the inbox:
//!
//! | messages | subject                                  | body                     | flags       |
//! |----------|------------------------------------------|--------------------------|-------------|
//! | 5        | `Subject: MSGFLAG_READ: Sample mail {i}` | `This is sample content` | READ+SUBMIT |
//! | 5        | `Subject: Sample mail {i}`               | `This is sample content` | SUBMIT      |
//! | 2        | `Same subject`                           | `Different content`      | SUBMIT      |
//! | 3        | `Same subject and body`                  | `Same subject and body`  | SUBMIT      |
//! | 1        | `Long body`                              | 39 × `X`                 | SUBMIT      |
//! | 1        | `Unique content`                         | [`UNIQUE_BODY`]          | SUBMIT      |

use crate::server::LoopbackServer;
use crate::store::MessageStore;
use crate::transport::{LoopbackTransport, SharedServer};
use mapi_client::{MapiConfig, MapiContext, MapiObject, MapiResult};
use mapi_codec::{PropertyTag, PropertyValue};
use mapi_protocol::{DefaultFolder, LongTermId};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Distinguished name of the test mailbox owner.
pub const TEST_ESSDN: &str =
    "/o=Test Organization/ou=First Administrative Group/cn=Recipients/cn=testuser";

/// Mailbox GUID the test server reports at logon.
pub const MAILBOX_GUID: Uuid = Uuid::from_u128(0x9A5B_1C2D_3E4F_4061_8273_94A5_B6C7_D8E9);

/// Database GUID carried by every long-term id of the test mailbox.
pub const DATABASE_GUID: Uuid = Uuid::from_u128(0x1F2E_3D4C_5B6A_4978_8796_A5B4_C3D2_E1F0);

/// A transient id with a fixed long-term form.
pub const KNOWN_ID: u64 = 42;

/// Global counter of [`KNOWN_ID`].
pub const KNOWN_COUNTER: [u8; 6] = [1, 0, 0, 0, 0, 7];

/// `MSGFLAG_READ`.
pub const MSGFLAG_READ: u32 = 0x0000_0001;

/// `MSGFLAG_SUBMIT`.
pub const MSGFLAG_SUBMIT: u32 = 0x0000_0004;

/// Subject shared by two messages with different bodies.
pub const SAME_SUBJECT: &str = "Same subject";

/// Subject and body of three messages.
pub const SAME_SUBJECT_BODY: &str = "Same subject and body";

/// Body of the one message a substring search finds.
pub const UNIQUE_BODY: &str = "The secret word is OpenChange and is hidden";

/// Name of the restriction scenario folder.
pub const RESTRICTIONS_FOLDER: &str = "torture_restrictions";

/// Name of the folder holding one long and one short body.
pub const SIZES_FOLDER: &str = "torture_sizes";

/// Long-term form of [`KNOWN_ID`].
pub fn known_long_term_id() -> LongTermId {
    LongTermId::new(DATABASE_GUID, KNOWN_COUNTER)
}

/// Client configuration for the test mailbox.
pub fn test_config() -> MapiConfig {
    MapiConfig::new(TEST_ESSDN)
}

/// An empty mailbox with [`KNOWN_ID`] registered.
pub fn empty_store() -> MessageStore {
    let mut store = MessageStore::new(TEST_ESSDN, MAILBOX_GUID, DATABASE_GUID);
    store.register_id(KNOWN_ID, known_long_term_id());
    store
}

fn mail(subject: &str, body: &str, flags: u32) -> [(PropertyTag, PropertyValue); 3] {
    [
        (PropertyTag::SUBJECT, PropertyValue::String8(subject.to_string())),
        (PropertyTag::BODY, PropertyValue::String8(body.to_string())),
        (PropertyTag::MESSAGE_FLAGS, PropertyValue::Long(flags)),
    ]
}

/// A mailbox served in-process, shared by every client that connects.
#[derive(Debug, Clone)]
pub struct TestMailbox {
    server: SharedServer,
    restrictions_folder: Option<u64>,
    sizes_folder: Option<u64>,
}

impl TestMailbox {
    /// Serves `store` as is.
    pub fn new(store: MessageStore) -> Self {
        Self {
            server: Arc::new(Mutex::new(LoopbackServer::new(store))),
            restrictions_folder: None,
            sizes_folder: None,
        }
    }

    /// Serves an empty mailbox.
    pub fn empty() -> Self {
        Self::new(empty_store())
    }

    /// Serves a mailbox holding the restriction scenario and the size pair.
    pub fn torture() -> Self {
        let mut store = empty_store();
        let inbox = store.default_folder(DefaultFolder::Inbox);
        let (restrictions, sizes) =
            populate(&mut store, inbox).expect("fresh store has an inbox");
        Self {
            server: Arc::new(Mutex::new(LoopbackServer::new(store))),
            restrictions_folder: Some(restrictions),
            sizes_folder: Some(sizes),
        }
    }

    /// The shared server.
    pub fn server(&self) -> &SharedServer {
        &self.server
    }

    /// A new connection to the server.
    pub fn transport(&self) -> LoopbackTransport {
        LoopbackTransport::connect(&self.server)
    }

    /// Id of the restriction scenario folder, for a torture mailbox.
    pub fn restrictions_folder(&self) -> Option<u64> {
        self.restrictions_folder
    }

    /// Id of the size pair folder, for a torture mailbox.
    pub fn sizes_folder(&self) -> Option<u64> {
        self.sizes_folder
    }

    /// Initializes a client, opens a session and logs on.
    ///
    /// Returns the context and the store object.
    pub fn logon(&self) -> MapiResult<(MapiContext, MapiObject)> {
        let mut ctx = MapiContext::initialize(test_config());
        let session = ctx.open_session(Box::new(self.transport()))?;
        let store = ctx.open_msg_store(session)?;
        Ok((ctx, store))
    }
}

fn populate(store: &mut MessageStore, inbox: u64) -> crate::error::ServerResult<(u64, u64)> {
    let folder = store.create_folder(inbox, RESTRICTIONS_FOLDER)?;
    for i in 0..5 {
        let subject = format!("Subject: MSGFLAG_READ: Sample mail {i}");
        store.add_message(
            folder,
            mail(&subject, "This is sample content", MSGFLAG_READ | MSGFLAG_SUBMIT),
        )?;
    }
    for i in 0..5 {
        let subject = format!("Subject: Sample mail {i}");
        store.add_message(folder, mail(&subject, "This is sample content", MSGFLAG_SUBMIT))?;
    }
    for _ in 0..2 {
        store.add_message(folder, mail(SAME_SUBJECT, "Different content", MSGFLAG_SUBMIT))?;
    }
    for _ in 0..3 {
        store.add_message(folder, mail(SAME_SUBJECT_BODY, SAME_SUBJECT_BODY, MSGFLAG_SUBMIT))?;
    }
    store.add_message(folder, mail("Long body", &"X".repeat(39), MSGFLAG_SUBMIT))?;
    store.add_message(folder, mail("Unique content", UNIQUE_BODY, MSGFLAG_SUBMIT))?;

    let sizes = store.create_folder(inbox, SIZES_FOLDER)?;
    store.add_message(sizes, mail("Long", &"X".repeat(39), MSGFLAG_SUBMIT))?;
    store.add_message(sizes, mail("Short", "twelve bytes", MSGFLAG_SUBMIT))?;
    Ok((folder, sizes))
}

//! # MAPI Testkit
//!
//! Test utilities for the MAPI client core.
//!
//! This crate provides:
//! - An in-memory message store with folders, messages and id translation
//! - A loopback server that answers request envelopes from that store
//! - A `Transport` that reaches the server in-process
//! - Server-side restriction evaluation
//! - Property-based test generators using proptest
//! - Fixtures, including the restriction torture mailbox
//!
//! ## Usage
//!
//! ```rust
//! use mapi_testkit::prelude::*;
//! use mapi_protocol::DefaultFolder;
//!
//! let mailbox = TestMailbox::torture();
//! let (mut ctx, store) = mailbox.logon().unwrap();
//! let inbox_id = ctx.get_default_folder(store, DefaultFolder::Inbox).unwrap();
//! let folder = ctx.open_folder(store, mailbox.restrictions_folder().unwrap()).unwrap();
//! let (_table, rows) = ctx.get_contents_table(folder).unwrap();
//! assert_eq!(rows, 17);
//! # let _ = inbox_id;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod evaluate;
pub mod fixtures;
pub mod generators;
pub mod server;
pub mod store;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::evaluate::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::server::*;
    pub use crate::store::*;
    pub use crate::transport::*;
}

pub use error::{ServerError, ServerResult};
pub use evaluate::{evaluate, filter};
pub use fixtures::*;
pub use generators::*;
pub use server::{LoopbackServer, ServerConfig};
pub use store::{counter_bytes, Folder, MessageStore, Row, REPLICA_ID};
pub use transport::{LoopbackTransport, SharedServer};

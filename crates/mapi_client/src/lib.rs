//! # MAPI Client
//!
//! Client-side transaction core for remote MAPI operations.
//!
//! This crate provides:
//! - `MapiContext`, the initialized subsystem owning sessions and objects
//! - Generational handles (`SessionId`, `MapiObject`) that reject stale use
//! - One-envelope-per-call dispatch over a pluggable `Transport`
//! - Tree-shaped allocation `Arena`s released on every return path
//! - `MapiError` with a last-error slot mirroring each call's outcome
//!
//! ## Key Invariants
//!
//! - Precondition failures are reported before anything is sent
//! - A non-zero remote status is returned verbatim
//! - Output values exist only on success
//! - No reply memory outlives the call that received it
//!
//! ```no_run
//! use mapi_client::{MapiConfig, MapiContext, MockTransport};
//! use mapi_protocol::DefaultFolder;
//!
//! # fn main() -> mapi_client::MapiResult<()> {
//! let mut ctx = MapiContext::initialize(MapiConfig::new("/o=Org/cn=jdoe"));
//! let session = ctx.open_session(Box::new(MockTransport::new()))?;
//! let store = ctx.open_msg_store(session)?;
//! let inbox_id = ctx.get_default_folder(store, DefaultFolder::Inbox)?;
//! let inbox = ctx.open_folder(store, inbox_id)?;
//! let (table, rows) = ctx.get_contents_table(inbox)?;
//! # let _ = (table, rows);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod arena;
mod config;
mod context;
mod error;
mod handle;
mod ops;
mod session;
mod transport;

pub use arena::{Arena, BufferRef, ScopeId};
pub use config::{MapiConfig, DEFAULT_MAX_ENVELOPE_SIZE};
pub use context::MapiContext;
pub use error::{MapiError, MapiResult};
pub use handle::{MapiObject, ObjectKind, SessionId};
pub use ops::{LOGON_PRIVATE, OPEN_FLAGS_HOME_LOGON};
pub use transport::{MockTransport, Transport, TransportError, TransportResult};

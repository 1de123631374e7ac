//! Remote operations, grouped by the object they act on.
//!
//! Each operation is an inherent method of [`MapiContext`](crate::MapiContext)
//! and updates its last-error slot.

mod ids;
mod object;
mod store;
mod table;

pub use store::{LOGON_PRIVATE, OPEN_FLAGS_HOME_LOGON};

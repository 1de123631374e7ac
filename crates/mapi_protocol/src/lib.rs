//! # MAPI Protocol
//!
//! Wire structures shared by every remote operation.
//!
//! This crate provides:
//! - `RequestEnvelope` / `ResponseEnvelope` with size accounting
//! - Typed request and reply payloads for each supported opnum
//! - `Restriction`, the six-shape table filter predicate
//! - `LongTermId`, the durable form of a transient object id
//! - `MapiStatus` codes
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod error;
mod long_term_id;
mod restriction;
mod rops;
mod status;

pub use envelope::{
    RequestEnvelope, ResponseEnvelope, INVALID_HANDLE, LENGTH_FIELD_SIZE, REQUEST_HEADER_SIZE,
    RESPONSE_HEADER_SIZE,
};
pub use error::{ProtocolError, ProtocolResult};
pub use long_term_id::{LongTermId, LONG_TERM_ID_SIZE};
pub use restriction::{
    BitmaskRelation, BitmaskTest, ContentMatch, CrossPropertyCompare, Exists, FuzzyFlag,
    FuzzyLevel, MatchPosition, PropertyCompare, RelOp, Restriction, SizeCompare,
};
pub use rops::{
    DefaultFolder, Empty, GetContentsTableReply, GetContentsTableRequest, IdFromLongTermIdReply,
    IdFromLongTermIdRequest, LogonReply, LogonRequest, LongTermIdFromIdReply,
    LongTermIdFromIdRequest, OpenFolderReply, OpenFolderRequest, Opnum, QueryPositionReply,
    RestrictRequest, RopRequest, SetColumnsRequest, TableStatusReply, LOGON_FOLDER_COUNT,
};
pub use status::MapiStatus;

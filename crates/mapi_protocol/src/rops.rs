//! Remote operations: opnums and their request/reply payloads.

use crate::error::{ProtocolError, ProtocolResult};
use crate::long_term_id::LongTermId;
use crate::restriction::Restriction;
use mapi_codec::{
    from_ndr, to_ndr, CodecError, CodecResult, Decode, Encode, NdrDecoder, NdrEncoder,
    PropertyTag,
};
use uuid::Uuid;

/// Operation code selecting which remote operation a request invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opnum {
    /// `RopRelease`.
    Release,
    /// `RopOpenFolder`.
    OpenFolder,
    /// `RopGetContentsTable`.
    GetContentsTable,
    /// `RopSetColumns`.
    SetColumns,
    /// `RopRestrict`.
    Restrict,
    /// `RopQueryPosition`.
    QueryPosition,
    /// `RopLongTermIdFromId`.
    LongTermIdFromId,
    /// `RopIdFromLongTermId`.
    IdFromLongTermId,
    /// `RopLogon`.
    Logon,
}

impl Opnum {
    /// Converts to the wire code.
    pub fn to_code(self) -> u8 {
        match self {
            Opnum::Release => 0x01,
            Opnum::OpenFolder => 0x02,
            Opnum::GetContentsTable => 0x05,
            Opnum::SetColumns => 0x12,
            Opnum::Restrict => 0x14,
            Opnum::QueryPosition => 0x17,
            Opnum::LongTermIdFromId => 0x43,
            Opnum::IdFromLongTermId => 0x44,
            Opnum::Logon => 0xFE,
        }
    }

    /// Converts from the wire code.
    pub fn from_code(code: u8) -> ProtocolResult<Self> {
        match code {
            0x01 => Ok(Opnum::Release),
            0x02 => Ok(Opnum::OpenFolder),
            0x05 => Ok(Opnum::GetContentsTable),
            0x12 => Ok(Opnum::SetColumns),
            0x14 => Ok(Opnum::Restrict),
            0x17 => Ok(Opnum::QueryPosition),
            0x43 => Ok(Opnum::LongTermIdFromId),
            0x44 => Ok(Opnum::IdFromLongTermId),
            0xFE => Ok(Opnum::Logon),
            other => Err(ProtocolError::UnknownOpnum(other)),
        }
    }
}

/// Payload of an operation that carries none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Empty;

impl Encode for Empty {
    fn encode(&self, _encoder: &mut NdrEncoder) -> CodecResult<()> {
        Ok(())
    }
}

impl Decode for Empty {
    fn decode(_decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Empty)
    }
}

/// Number of special folder ids returned by a private mailbox logon.
pub const LOGON_FOLDER_COUNT: usize = 13;

/// Request of `RopLogon`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonRequest {
    /// Logon flags (`0x01` private mailbox).
    pub logon_flags: u8,
    /// Open flags.
    pub open_flags: u32,
    /// Store state.
    pub store_state: u32,
    /// Mailbox distinguished name.
    pub essdn: String,
}

impl Encode for LogonRequest {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u8(self.logon_flags);
        encoder.put_u32(self.open_flags);
        encoder.put_u32(self.store_state);
        encoder.put_bytes_u16(self.essdn.as_bytes())
    }
}

impl Decode for LogonRequest {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        let logon_flags = decoder.read_u8()?;
        let open_flags = decoder.read_u32()?;
        let store_state = decoder.read_u32()?;
        let essdn = std::str::from_utf8(decoder.read_bytes_u16()?)
            .map_err(|_| CodecError::InvalidUtf8)?
            .to_string();
        Ok(Self {
            logon_flags,
            open_flags,
            store_state,
            essdn,
        })
    }
}

/// Reply of `RopLogon`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonReply {
    /// Logon flags echoed by the server.
    pub logon_flags: u8,
    /// Special folder ids, in [`DefaultFolder`] order.
    pub folder_ids: [u64; LOGON_FOLDER_COUNT],
    /// Mailbox GUID.
    pub mailbox_guid: Uuid,
}

impl Encode for LogonReply {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u8(self.logon_flags);
        for id in self.folder_ids {
            encoder.put_u64(id);
        }
        encoder.put_raw(&self.mailbox_guid.to_bytes_le());
        Ok(())
    }
}

impl Decode for LogonReply {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        let logon_flags = decoder.read_u8()?;
        let mut folder_ids = [0u64; LOGON_FOLDER_COUNT];
        for slot in &mut folder_ids {
            *slot = decoder.read_u64()?;
        }
        let mailbox_guid = Uuid::from_bytes_le(decoder.read_array()?);
        Ok(Self {
            logon_flags,
            folder_ids,
            mailbox_guid,
        })
    }
}

/// Well-known folders whose ids come back from logon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultFolder {
    /// Mailbox root.
    Root,
    /// Deferred action folder.
    DeferredAction,
    /// Spooler queue.
    SpoolerQueue,
    /// Top of the interpersonal message subtree.
    TopInformationStore,
    /// Inbox.
    Inbox,
    /// Outbox.
    Outbox,
    /// Sent items.
    SentItems,
    /// Deleted items.
    DeletedItems,
    /// Common views.
    CommonViews,
    /// Schedule.
    Schedule,
    /// Search root.
    Search,
    /// Views.
    Views,
    /// Shortcuts.
    Shortcuts,
}

impl DefaultFolder {
    /// Position of this folder's id in [`LogonReply::folder_ids`].
    pub fn index(self) -> usize {
        match self {
            DefaultFolder::Root => 0,
            DefaultFolder::DeferredAction => 1,
            DefaultFolder::SpoolerQueue => 2,
            DefaultFolder::TopInformationStore => 3,
            DefaultFolder::Inbox => 4,
            DefaultFolder::Outbox => 5,
            DefaultFolder::SentItems => 6,
            DefaultFolder::DeletedItems => 7,
            DefaultFolder::CommonViews => 8,
            DefaultFolder::Schedule => 9,
            DefaultFolder::Search => 10,
            DefaultFolder::Views => 11,
            DefaultFolder::Shortcuts => 12,
        }
    }
}

/// Request of `RopOpenFolder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFolderRequest {
    /// Slot of the handle list that receives the folder handle.
    pub output_handle_index: u8,
    /// Folder to open.
    pub folder_id: u64,
    /// Open mode flags.
    pub open_mode: u8,
}

impl Encode for OpenFolderRequest {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u8(self.output_handle_index);
        encoder.put_u64(self.folder_id);
        encoder.put_u8(self.open_mode);
        Ok(())
    }
}

impl Decode for OpenFolderRequest {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            output_handle_index: decoder.read_u8()?,
            folder_id: decoder.read_u64()?,
            open_mode: decoder.read_u8()?,
        })
    }
}

/// Reply of `RopOpenFolder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFolderReply {
    /// Whether the folder has rules attached.
    pub has_rules: bool,
}

impl Encode for OpenFolderReply {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u8(u8::from(self.has_rules));
        Ok(())
    }
}

impl Decode for OpenFolderReply {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            has_rules: decoder.read_u8()? != 0,
        })
    }
}

/// Request of `RopGetContentsTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetContentsTableRequest {
    /// Slot of the handle list that receives the table handle.
    pub output_handle_index: u8,
    /// Table flags.
    pub table_flags: u8,
}

impl Encode for GetContentsTableRequest {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u8(self.output_handle_index);
        encoder.put_u8(self.table_flags);
        Ok(())
    }
}

impl Decode for GetContentsTableRequest {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            output_handle_index: decoder.read_u8()?,
            table_flags: decoder.read_u8()?,
        })
    }
}

/// Reply of `RopGetContentsTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetContentsTableReply {
    /// Rows in the new table.
    pub row_count: u32,
}

impl Encode for GetContentsTableReply {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u32(self.row_count);
        Ok(())
    }
}

impl Decode for GetContentsTableReply {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            row_count: decoder.read_u32()?,
        })
    }
}

/// Request of `RopSetColumns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetColumnsRequest {
    /// Flags (`0x00` synchronous).
    pub flags: u8,
    /// Columns, in order.
    pub columns: Vec<PropertyTag>,
}

impl Encode for SetColumnsRequest {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        let count = u16::try_from(self.columns.len())
            .map_err(|_| CodecError::encoding_failed("too many columns"))?;
        encoder.put_u8(self.flags);
        encoder.put_u16(count);
        encoder.put(&self.columns[..])
    }
}

impl Decode for SetColumnsRequest {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        let flags = decoder.read_u8()?;
        let count = decoder.read_u16()?;
        let columns = (0..count)
            .map(|_| decoder.get::<PropertyTag>())
            .collect::<CodecResult<Vec<_>>>()?;
        Ok(Self { flags, columns })
    }
}

/// Reply of `RopSetColumns` and `RopRestrict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStatusReply {
    /// Table status (`0x00` complete).
    pub table_status: u8,
}

impl Encode for TableStatusReply {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u8(self.table_status);
        Ok(())
    }
}

impl Decode for TableStatusReply {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            table_status: decoder.read_u8()?,
        })
    }
}

/// Request of `RopRestrict`.
///
/// `None` clears the table's restriction; on the wire it is a zero
/// length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictRequest {
    /// Flags (`0x00` synchronous).
    pub flags: u8,
    /// Restriction to apply.
    pub restriction: Option<Restriction>,
}

impl Encode for RestrictRequest {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u8(self.flags);
        match &self.restriction {
            Some(restriction) => encoder.put_bytes_u16(&to_ndr(restriction)?),
            None => {
                encoder.put_u16(0);
                Ok(())
            }
        }
    }
}

impl Decode for RestrictRequest {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        let flags = decoder.read_u8()?;
        let bytes = decoder.read_bytes_u16()?;
        let restriction = if bytes.is_empty() {
            None
        } else {
            Some(from_ndr(bytes)?)
        };
        Ok(Self { flags, restriction })
    }
}

/// Reply of `RopQueryPosition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPositionReply {
    /// Current row.
    pub numerator: u32,
    /// Total rows.
    pub denominator: u32,
}

impl Encode for QueryPositionReply {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u32(self.numerator);
        encoder.put_u32(self.denominator);
        Ok(())
    }
}

impl Decode for QueryPositionReply {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            numerator: decoder.read_u32()?,
            denominator: decoder.read_u32()?,
        })
    }
}

/// Request of `RopLongTermIdFromId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongTermIdFromIdRequest {
    /// Transient id.
    pub id: u64,
}

impl Encode for LongTermIdFromIdRequest {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u64(self.id);
        Ok(())
    }
}

impl Decode for LongTermIdFromIdRequest {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            id: decoder.read_u64()?,
        })
    }
}

/// Reply of `RopLongTermIdFromId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongTermIdFromIdReply {
    /// Durable id.
    pub long_term_id: LongTermId,
}

impl Encode for LongTermIdFromIdReply {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put(&self.long_term_id)
    }
}

impl Decode for LongTermIdFromIdReply {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            long_term_id: decoder.get()?,
        })
    }
}

/// Request of `RopIdFromLongTermId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdFromLongTermIdRequest {
    /// Durable id.
    pub long_term_id: LongTermId,
}

impl Encode for IdFromLongTermIdRequest {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put(&self.long_term_id)
    }
}

impl Decode for IdFromLongTermIdRequest {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            long_term_id: decoder.get()?,
        })
    }
}

/// Reply of `RopIdFromLongTermId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdFromLongTermIdReply {
    /// Transient id.
    pub id: u64,
}

impl Encode for IdFromLongTermIdReply {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u64(self.id);
        Ok(())
    }
}

impl Decode for IdFromLongTermIdReply {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(Self {
            id: decoder.read_u64()?,
        })
    }
}

/// A request payload of any supported operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RopRequest {
    /// Release the object.
    Release,
    /// Open a folder.
    OpenFolder(OpenFolderRequest),
    /// Open a folder's contents table.
    GetContentsTable(GetContentsTableRequest),
    /// Choose table columns.
    SetColumns(SetColumnsRequest),
    /// Filter table rows.
    Restrict(RestrictRequest),
    /// Ask for the table position and row count.
    QueryPosition,
    /// Translate a transient id to its long-term form.
    LongTermIdFromId(LongTermIdFromIdRequest),
    /// Translate a long-term id to its transient form.
    IdFromLongTermId(IdFromLongTermIdRequest),
    /// Log on to a message store.
    Logon(LogonRequest),
}

impl RopRequest {
    /// Opnum of this request.
    pub fn opnum(&self) -> Opnum {
        match self {
            RopRequest::Release => Opnum::Release,
            RopRequest::OpenFolder(_) => Opnum::OpenFolder,
            RopRequest::GetContentsTable(_) => Opnum::GetContentsTable,
            RopRequest::SetColumns(_) => Opnum::SetColumns,
            RopRequest::Restrict(_) => Opnum::Restrict,
            RopRequest::QueryPosition => Opnum::QueryPosition,
            RopRequest::LongTermIdFromId(_) => Opnum::LongTermIdFromId,
            RopRequest::IdFromLongTermId(_) => Opnum::IdFromLongTermId,
            RopRequest::Logon(_) => Opnum::Logon,
        }
    }

    /// Output handle slot, for operations that create an object.
    pub fn output_handle_index(&self) -> Option<u8> {
        match self {
            RopRequest::OpenFolder(r) => Some(r.output_handle_index),
            RopRequest::GetContentsTable(r) => Some(r.output_handle_index),
            _ => None,
        }
    }

    /// Serializes the payload only.
    pub fn encode_payload(&self) -> ProtocolResult<Vec<u8>> {
        let bytes = match self {
            RopRequest::Release | RopRequest::QueryPosition => Vec::new(),
            RopRequest::OpenFolder(r) => to_ndr(r)?,
            RopRequest::GetContentsTable(r) => to_ndr(r)?,
            RopRequest::SetColumns(r) => to_ndr(r)?,
            RopRequest::Restrict(r) => to_ndr(r)?,
            RopRequest::LongTermIdFromId(r) => to_ndr(r)?,
            RopRequest::IdFromLongTermId(r) => to_ndr(r)?,
            RopRequest::Logon(r) => to_ndr(r)?,
        };
        Ok(bytes)
    }

    /// Parses a payload given its opnum.
    pub fn decode_payload(opnum: Opnum, payload: &[u8]) -> ProtocolResult<Self> {
        let request = match opnum {
            Opnum::Release => {
                from_ndr::<Empty>(payload)?;
                RopRequest::Release
            }
            Opnum::QueryPosition => {
                from_ndr::<Empty>(payload)?;
                RopRequest::QueryPosition
            }
            Opnum::OpenFolder => RopRequest::OpenFolder(from_ndr(payload)?),
            Opnum::GetContentsTable => RopRequest::GetContentsTable(from_ndr(payload)?),
            Opnum::SetColumns => RopRequest::SetColumns(from_ndr(payload)?),
            Opnum::Restrict => RopRequest::Restrict(from_ndr(payload)?),
            Opnum::LongTermIdFromId => RopRequest::LongTermIdFromId(from_ndr(payload)?),
            Opnum::IdFromLongTermId => RopRequest::IdFromLongTermId(from_ndr(payload)?),
            Opnum::Logon => RopRequest::Logon(from_ndr(payload)?),
        };
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restriction::RelOp;

    #[test]
    fn opnum_codes() {
        for op in [
            Opnum::Release,
            Opnum::OpenFolder,
            Opnum::GetContentsTable,
            Opnum::SetColumns,
            Opnum::Restrict,
            Opnum::QueryPosition,
            Opnum::LongTermIdFromId,
            Opnum::IdFromLongTermId,
            Opnum::Logon,
        ] {
            assert_eq!(Opnum::from_code(op.to_code()).unwrap(), op);
        }
        assert_eq!(Opnum::from_code(0x99), Err(ProtocolError::UnknownOpnum(0x99)));
    }

    #[test]
    fn long_term_id_from_id_payload_is_eight_bytes() {
        let req = RopRequest::LongTermIdFromId(LongTermIdFromIdRequest { id: 42 });
        assert_eq!(req.encode_payload().unwrap(), 42u64.to_le_bytes().to_vec());
    }

    #[test]
    fn restrict_payload_roundtrip() {
        let req = RopRequest::Restrict(RestrictRequest {
            flags: 0,
            restriction: Some(Restriction::size(RelOp::Gt, PropertyTag::BODY, 30)),
        });
        let payload = req.encode_payload().unwrap();
        assert_eq!(RopRequest::decode_payload(Opnum::Restrict, &payload).unwrap(), req);
    }

    #[test]
    fn empty_restrict_clears() {
        let req = RestrictRequest {
            flags: 0,
            restriction: None,
        };
        let bytes = to_ndr(&req).unwrap();
        assert_eq!(bytes, vec![0, 0, 0]);
        assert_eq!(from_ndr::<RestrictRequest>(&bytes).unwrap(), req);
    }

    #[test]
    fn set_columns_payload() {
        let req = SetColumnsRequest {
            flags: 0,
            columns: vec![PropertyTag::FID, PropertyTag::SUBJECT],
        };
        let bytes = to_ndr(&req).unwrap();
        assert_eq!(bytes.len(), 1 + 2 + 8);
        assert_eq!(from_ndr::<SetColumnsRequest>(&bytes).unwrap(), req);
    }

    #[test]
    fn release_rejects_payload() {
        assert!(RopRequest::decode_payload(Opnum::Release, &[1]).is_err());
    }

    #[test]
    fn logon_reply_roundtrip() {
        let reply = LogonReply {
            logon_flags: 1,
            folder_ids: [7; LOGON_FOLDER_COUNT],
            mailbox_guid: Uuid::from_u128(5),
        };
        let bytes = to_ndr(&reply).unwrap();
        assert_eq!(bytes.len(), 1 + 8 * LOGON_FOLDER_COUNT + 16);
        assert_eq!(from_ndr::<LogonReply>(&bytes).unwrap(), reply);
    }

    #[test]
    fn default_folder_indexes_are_distinct() {
        let mut seen = [false; LOGON_FOLDER_COUNT];
        for f in [
            DefaultFolder::Root,
            DefaultFolder::DeferredAction,
            DefaultFolder::SpoolerQueue,
            DefaultFolder::TopInformationStore,
            DefaultFolder::Inbox,
            DefaultFolder::Outbox,
            DefaultFolder::SentItems,
            DefaultFolder::DeletedItems,
            DefaultFolder::CommonViews,
            DefaultFolder::Schedule,
            DefaultFolder::Search,
            DefaultFolder::Views,
            DefaultFolder::Shortcuts,
        ] {
            assert!(!seen[f.index()]);
            seen[f.index()] = true;
        }
    }
}

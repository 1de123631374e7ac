//! Request and response envelopes.
//!
//! One envelope carries exactly one operation:
//!
//! ```text
//! request  := len:u32 | opnum:u8 | logon_id:u8 | handle_idx:u8 | payload_len:u16 | payload | handle:u32*
//! response := len:u32 | opnum:u8 | handle_idx:u8 | status:u32 | payload | handle:u32*
//! ```
//!
//! `len` counts itself, the header and the payload. Everything after it
//! is the handle list. `handle_idx` is a position in that list, never a
//! raw handle value.

use crate::error::{ProtocolError, ProtocolResult};
use crate::rops::{Opnum, RopRequest};
use crate::status::MapiStatus;
use mapi_codec::{from_ndr, to_ndr, Decode, Encode, NdrDecoder, NdrEncoder};

/// Fixed cost of a request header: opnum, logon id, handle index, payload length.
pub const REQUEST_HEADER_SIZE: usize = 5;

/// Fixed cost of a reply header: opnum, handle index, status.
pub const RESPONSE_HEADER_SIZE: usize = 6;

/// Size of the outer length field.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Placeholder for a handle slot the server will fill in.
pub const INVALID_HANDLE: u32 = 0xFFFF_FFFF;

fn split_handles(rest: &[u8]) -> ProtocolResult<Vec<u32>> {
    if rest.len() % 4 != 0 {
        return Err(ProtocolError::malformed(format!(
            "handle list of {} bytes is not a multiple of 4",
            rest.len()
        )));
    }
    Ok(rest
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn read_length(bytes: &[u8], minimum: usize) -> ProtocolResult<usize> {
    let mut decoder = NdrDecoder::new(bytes);
    let len = decoder.read_u32()? as usize;
    if len < minimum || len > bytes.len() {
        return Err(ProtocolError::malformed(format!(
            "length field {len} outside {minimum}..={}",
            bytes.len()
        )));
    }
    Ok(len)
}

/// A single-operation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    opnum: Opnum,
    logon_id: u8,
    handle_index: u8,
    payload: Vec<u8>,
    handles: Vec<u32>,
    size: usize,
}

impl RequestEnvelope {
    /// Builds the envelope for `request`.
    ///
    /// `handle_index` and any output handle index of the request must
    /// point inside `handles`.
    pub fn new(
        request: &RopRequest,
        logon_id: u8,
        handle_index: u8,
        handles: Vec<u32>,
    ) -> ProtocolResult<Self> {
        if usize::from(handle_index) >= handles.len() {
            return Err(ProtocolError::invalid_parameter(format!(
                "handle index {handle_index} outside a list of {}",
                handles.len()
            )));
        }
        if let Some(out) = request.output_handle_index() {
            if usize::from(out) >= handles.len() {
                return Err(ProtocolError::invalid_parameter(format!(
                    "output handle index {out} outside a list of {}",
                    handles.len()
                )));
            }
        }

        let payload = request.encode_payload()?;
        if payload.len() > usize::from(u16::MAX) {
            return Err(ProtocolError::invalid_parameter(format!(
                "payload of {} bytes does not fit one operation",
                payload.len()
            )));
        }
        let mut size = payload.len();
        size += REQUEST_HEADER_SIZE;

        Ok(Self {
            opnum: request.opnum(),
            logon_id,
            handle_index,
            payload,
            handles,
            size,
        })
    }

    /// Opnum.
    pub fn opnum(&self) -> Opnum {
        self.opnum
    }

    /// Logon id.
    pub fn logon_id(&self) -> u8 {
        self.logon_id
    }

    /// Index of the input handle in [`handles`](Self::handles).
    pub fn handle_index(&self) -> u8 {
        self.handle_index
    }

    /// Handle list.
    pub fn handles(&self) -> &[u32] {
        &self.handles
    }

    /// Serialized operation payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Accumulated size: payload plus header.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Value of the outer length field: size plus the field itself.
    pub fn mapi_len(&self) -> usize {
        self.size + LENGTH_FIELD_SIZE
    }

    /// Total bytes on the wire, handle list included.
    pub fn encoded_len(&self) -> usize {
        self.mapi_len() + 4 * self.handles.len()
    }

    /// Parses the payload back into a typed request.
    pub fn request(&self) -> ProtocolResult<RopRequest> {
        RopRequest::decode_payload(self.opnum, &self.payload)
    }

    /// Serializes the envelope.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut encoder = NdrEncoder::with_capacity(self.encoded_len());
        encoder.put(self)?;
        Ok(encoder.into_bytes())
    }

    /// Parses an envelope.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let len = read_length(bytes, LENGTH_FIELD_SIZE + REQUEST_HEADER_SIZE)?;
        let mut decoder = NdrDecoder::new(&bytes[LENGTH_FIELD_SIZE..len]);
        let opnum = Opnum::from_code(decoder.read_u8()?)?;
        let logon_id = decoder.read_u8()?;
        let handle_index = decoder.read_u8()?;
        let payload_len = usize::from(decoder.read_u16()?);
        let payload = decoder.read_raw(payload_len)?.to_vec();
        decoder.finish()?;
        let handles = split_handles(&bytes[len..])?;
        if usize::from(handle_index) >= handles.len() {
            return Err(ProtocolError::malformed(format!(
                "handle index {handle_index} outside a list of {}",
                handles.len()
            )));
        }
        Ok(Self {
            opnum,
            logon_id,
            handle_index,
            size: payload.len() + REQUEST_HEADER_SIZE,
            payload,
            handles,
        })
    }
}

impl Encode for RequestEnvelope {
    fn encode(&self, encoder: &mut NdrEncoder) -> mapi_codec::CodecResult<()> {
        let start = encoder.len();
        encoder.put_u32(self.mapi_len() as u32);
        encoder.put_u8(self.opnum.to_code());
        encoder.put_u8(self.logon_id);
        encoder.put_u8(self.handle_index);
        encoder.put_u16(self.payload.len() as u16);
        encoder.put_raw(&self.payload);
        debug_assert_eq!(
            encoder.len() - start,
            self.mapi_len(),
            "size accumulator disagrees with serialized envelope"
        );
        for handle in &self.handles {
            encoder.put_u32(*handle);
        }
        Ok(())
    }
}

/// A single-operation reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    opnum: Opnum,
    handle_index: u8,
    status: MapiStatus,
    payload: Vec<u8>,
    handles: Vec<u32>,
}

impl ResponseEnvelope {
    /// A successful reply carrying `reply`.
    pub fn success<T: Encode>(
        opnum: Opnum,
        handle_index: u8,
        reply: &T,
        handles: Vec<u32>,
    ) -> ProtocolResult<Self> {
        Ok(Self {
            opnum,
            handle_index,
            status: MapiStatus::SUCCESS,
            payload: to_ndr(reply)?,
            handles,
        })
    }

    /// A failed reply; it carries no payload.
    pub fn failure(opnum: Opnum, handle_index: u8, status: MapiStatus, handles: Vec<u32>) -> Self {
        Self {
            opnum,
            handle_index,
            status,
            payload: Vec::new(),
            handles,
        }
    }

    /// Opnum the reply answers.
    pub fn opnum(&self) -> Opnum {
        self.opnum
    }

    /// Handle index echoed by the server.
    pub fn handle_index(&self) -> u8 {
        self.handle_index
    }

    /// Remote status.
    pub fn status(&self) -> MapiStatus {
        self.status
    }

    /// Handle list returned by the server.
    pub fn handles(&self) -> &[u32] {
        &self.handles
    }

    /// Handle at `index`, unless absent or still the placeholder.
    pub fn handle_at(&self, index: u8) -> Option<u32> {
        self.handles
            .get(usize::from(index))
            .copied()
            .filter(|h| *h != INVALID_HANDLE)
    }

    /// Decodes the reply payload.
    ///
    /// Only a zero status carries a payload.
    pub fn reply<T: Decode>(&self) -> ProtocolResult<T> {
        if !self.status.is_success() {
            return Err(ProtocolError::malformed(format!(
                "reply with status {} has no payload",
                self.status
            )));
        }
        Ok(from_ndr(&self.payload)?)
    }

    /// Serializes the envelope.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut encoder = NdrEncoder::new();
        encoder.put(self)?;
        Ok(encoder.into_bytes())
    }

    /// Parses an envelope.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let len = read_length(bytes, LENGTH_FIELD_SIZE + RESPONSE_HEADER_SIZE)?;
        let mut decoder = NdrDecoder::new(&bytes[LENGTH_FIELD_SIZE..len]);
        let opnum = Opnum::from_code(decoder.read_u8()?)?;
        let handle_index = decoder.read_u8()?;
        let status = MapiStatus(decoder.read_u32()?);
        let payload = decoder.remaining().to_vec();
        let handles = split_handles(&bytes[len..])?;
        Ok(Self {
            opnum,
            handle_index,
            status,
            payload,
            handles,
        })
    }
}

impl Encode for ResponseEnvelope {
    fn encode(&self, encoder: &mut NdrEncoder) -> mapi_codec::CodecResult<()> {
        let payload: &[u8] = if self.status.is_success() {
            &self.payload
        } else {
            &[]
        };
        let len = LENGTH_FIELD_SIZE + RESPONSE_HEADER_SIZE + payload.len();
        encoder.put_u32(len as u32);
        encoder.put_u8(self.opnum.to_code());
        encoder.put_u8(self.handle_index);
        encoder.put_u32(self.status.as_u32());
        encoder.put_raw(payload);
        for handle in &self.handles {
            encoder.put_u32(*handle);
        }
        Ok(())
    }
}

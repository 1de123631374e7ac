//! Property tags and property types.

use crate::error::{CodecError, CodecResult};
use crate::{Decode, Encode, NdrDecoder, NdrEncoder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type half of a property tag (low 16 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    /// 16-bit signed integer (`PT_I2`).
    Short,
    /// 32-bit integer (`PT_LONG`).
    Long,
    /// Status code (`PT_ERROR`).
    Error,
    /// Boolean (`PT_BOOLEAN`).
    Boolean,
    /// 64-bit integer (`PT_I8`).
    LongLong,
    /// 8-bit string (`PT_STRING8`).
    String8,
    /// UTF-16 string (`PT_UNICODE`).
    Unicode,
    /// FILETIME (`PT_SYSTIME`).
    SysTime,
    /// Opaque bytes (`PT_BINARY`).
    Binary,
}

impl PropertyType {
    /// Wire code of this type.
    pub const fn code(self) -> u16 {
        match self {
            PropertyType::Short => 0x0002,
            PropertyType::Long => 0x0003,
            PropertyType::Error => 0x000A,
            PropertyType::Boolean => 0x000B,
            PropertyType::LongLong => 0x0014,
            PropertyType::String8 => 0x001E,
            PropertyType::Unicode => 0x001F,
            PropertyType::SysTime => 0x0040,
            PropertyType::Binary => 0x0102,
        }
    }

    /// Parses a wire code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0002 => Some(PropertyType::Short),
            0x0003 => Some(PropertyType::Long),
            0x000A => Some(PropertyType::Error),
            0x000B => Some(PropertyType::Boolean),
            0x0014 => Some(PropertyType::LongLong),
            0x001E => Some(PropertyType::String8),
            0x001F => Some(PropertyType::Unicode),
            0x0040 => Some(PropertyType::SysTime),
            0x0102 => Some(PropertyType::Binary),
            _ => None,
        }
    }

    /// Returns true for string and binary types.
    pub const fn is_variable_length(self) -> bool {
        matches!(
            self,
            PropertyType::String8 | PropertyType::Unicode | PropertyType::Binary
        )
    }
}

/// A 32-bit property tag: property id in the high word, type in the low word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyTag(pub u32);

impl PropertyTag {
    /// `PR_MESSAGE_FLAGS`.
    pub const MESSAGE_FLAGS: PropertyTag = PropertyTag(0x0E07_0003);
    /// `PR_SUBJECT`.
    pub const SUBJECT: PropertyTag = PropertyTag(0x0037_001E);
    /// `PR_BODY`.
    pub const BODY: PropertyTag = PropertyTag(0x1000_001E);
    /// `PR_HTML`.
    pub const HTML: PropertyTag = PropertyTag(0x1013_0102);
    /// `PR_DISPLAY_NAME`.
    pub const DISPLAY_NAME: PropertyTag = PropertyTag(0x3001_001E);
    /// `PR_FID`.
    pub const FID: PropertyTag = PropertyTag(0x6748_0014);
    /// `PR_MID`.
    pub const MID: PropertyTag = PropertyTag(0x674A_0014);
    /// `PR_INST_ID`.
    pub const INST_ID: PropertyTag = PropertyTag(0x674D_0014);
    /// `PR_INSTANCE_NUM`.
    pub const INSTANCE_NUM: PropertyTag = PropertyTag(0x674E_0003);

    /// Builds a tag from an id and a type.
    pub const fn new(id: u16, prop_type: PropertyType) -> Self {
        Self(((id as u32) << 16) | prop_type.code() as u32)
    }

    /// Returns the raw tag value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Property id (high word).
    pub const fn id(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Raw property type code (low word).
    pub const fn type_code(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Property type, if the code is one this codec understands.
    pub fn prop_type(self) -> CodecResult<PropertyType> {
        PropertyType::from_code(self.type_code()).ok_or(CodecError::UnsupportedPropertyType {
            code: self.type_code(),
        })
    }
}

impl fmt::Display for PropertyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl Encode for PropertyTag {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u32(self.0);
        Ok(())
    }
}

impl Decode for PropertyTag {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        decoder.read_u32().map(PropertyTag)
    }
}

//! Typed property values.

use crate::error::{CodecError, CodecResult};
use crate::tag::{PropertyTag, PropertyType};
use crate::{Decode, Encode, NdrDecoder, NdrEncoder};
use std::cmp::Ordering;

/// A property value whose wire shape is selected by its [`PropertyType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// 16-bit signed integer.
    Short(i16),
    /// 32-bit integer.
    Long(u32),
    /// Status code.
    Error(u32),
    /// Boolean, one byte on the wire.
    Boolean(bool),
    /// 64-bit integer.
    LongLong(u64),
    /// 8-bit string, `u32` byte-length prefix.
    String8(String),
    /// UTF-16 string, `u32` unit-count prefix.
    Unicode(String),
    /// FILETIME.
    SysTime(u64),
    /// Opaque bytes, `u32` length prefix.
    Binary(Vec<u8>),
}

impl PropertyValue {
    /// The property type this value encodes as.
    pub fn prop_type(&self) -> PropertyType {
        match self {
            PropertyValue::Short(_) => PropertyType::Short,
            PropertyValue::Long(_) => PropertyType::Long,
            PropertyValue::Error(_) => PropertyType::Error,
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::LongLong(_) => PropertyType::LongLong,
            PropertyValue::String8(_) => PropertyType::String8,
            PropertyValue::Unicode(_) => PropertyType::Unicode,
            PropertyValue::SysTime(_) => PropertyType::SysTime,
            PropertyValue::Binary(_) => PropertyType::Binary,
        }
    }

    /// Variant name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Short(_) => "Short",
            PropertyValue::Long(_) => "Long",
            PropertyValue::Error(_) => "Error",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::LongLong(_) => "LongLong",
            PropertyValue::String8(_) => "String8",
            PropertyValue::Unicode(_) => "Unicode",
            PropertyValue::SysTime(_) => "SysTime",
            PropertyValue::Binary(_) => "Binary",
        }
    }

    /// Byte length of the value's content.
    ///
    /// Strings count their encoded bytes (UTF-16 counts two per unit),
    /// binaries their length, fixed-size types their wire width.
    pub fn byte_size(&self) -> usize {
        match self {
            PropertyValue::Short(_) => 2,
            PropertyValue::Long(_) | PropertyValue::Error(_) => 4,
            PropertyValue::Boolean(_) => 1,
            PropertyValue::LongLong(_) | PropertyValue::SysTime(_) => 8,
            PropertyValue::String8(s) => s.len(),
            PropertyValue::Unicode(s) => s.encode_utf16().count() * 2,
            PropertyValue::Binary(b) => b.len(),
        }
    }

    /// Get this value as a string, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::String8(s) | PropertyValue::Unicode(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is binary.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as an unsigned integer, if it is integral.
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            PropertyValue::Short(n) => Some(*n as u16 as u64),
            PropertyValue::Long(n) | PropertyValue::Error(n) => Some(u64::from(*n)),
            PropertyValue::LongLong(n) | PropertyValue::SysTime(n) => Some(*n),
            PropertyValue::Boolean(b) => Some(u64::from(*b)),
            _ => None,
        }
    }

    /// Orders two values of the same type.
    ///
    /// Returns `None` for values of different types; such values are
    /// incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (PropertyValue::Short(a), PropertyValue::Short(b)) => Some(a.cmp(b)),
            (PropertyValue::Long(a), PropertyValue::Long(b))
            | (PropertyValue::Error(a), PropertyValue::Error(b)) => Some(a.cmp(b)),
            (PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => Some(a.cmp(b)),
            (PropertyValue::LongLong(a), PropertyValue::LongLong(b))
            | (PropertyValue::SysTime(a), PropertyValue::SysTime(b)) => Some(a.cmp(b)),
            (PropertyValue::String8(a), PropertyValue::String8(b))
            | (PropertyValue::Unicode(a), PropertyValue::Unicode(b)) => Some(a.cmp(b)),
            // Both string flavours hold the same text model.
            (PropertyValue::String8(a), PropertyValue::Unicode(b))
            | (PropertyValue::Unicode(a), PropertyValue::String8(b)) => Some(a.cmp(b)),
            (PropertyValue::Binary(a), PropertyValue::Binary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Writes the value body (no tag).
    pub fn encode_body(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        match self {
            PropertyValue::Short(n) => encoder.put_i16(*n),
            PropertyValue::Long(n) | PropertyValue::Error(n) => encoder.put_u32(*n),
            PropertyValue::Boolean(b) => encoder.put_u8(u8::from(*b)),
            PropertyValue::LongLong(n) | PropertyValue::SysTime(n) => encoder.put_u64(*n),
            PropertyValue::String8(s) => encoder.put_bytes_u32(s.as_bytes())?,
            PropertyValue::Unicode(s) => encoder.put_utf16(s)?,
            PropertyValue::Binary(b) => encoder.put_bytes_u32(b)?,
        }
        Ok(())
    }

    /// Reads a value body of the given type.
    pub fn decode_body(prop_type: PropertyType, decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        Ok(match prop_type {
            PropertyType::Short => PropertyValue::Short(decoder.read_i16()?),
            PropertyType::Long => PropertyValue::Long(decoder.read_u32()?),
            PropertyType::Error => PropertyValue::Error(decoder.read_u32()?),
            PropertyType::Boolean => match decoder.read_u8()? {
                0 => PropertyValue::Boolean(false),
                1 => PropertyValue::Boolean(true),
                other => {
                    return Err(CodecError::invalid_structure(format!(
                        "boolean byte must be 0 or 1, got {other}"
                    )))
                }
            },
            PropertyType::LongLong => PropertyValue::LongLong(decoder.read_u64()?),
            PropertyType::String8 => PropertyValue::String8(decoder.read_utf8()?),
            PropertyType::Unicode => PropertyValue::Unicode(decoder.read_utf16()?),
            PropertyType::SysTime => PropertyValue::SysTime(decoder.read_u64()?),
            PropertyType::Binary => PropertyValue::Binary(decoder.read_bytes_u32()?.to_vec()),
        })
    }
}

/// A property tag paired with a value of the matching type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedValue {
    tag: PropertyTag,
    value: PropertyValue,
}

impl TaggedValue {
    /// Pairs a tag with a value.
    ///
    /// # Errors
    ///
    /// Fails with [`CodecError::TypeMismatch`] if the value's type differs
    /// from the tag's type.
    pub fn new(tag: PropertyTag, value: PropertyValue) -> CodecResult<Self> {
        if tag.prop_type()? != value.prop_type() {
            return Err(CodecError::TypeMismatch {
                tag: tag.as_u32(),
                actual: value.type_name(),
            });
        }
        Ok(Self { tag, value })
    }

    /// The tag.
    pub fn tag(&self) -> PropertyTag {
        self.tag
    }

    /// The value.
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Splits into tag and value.
    pub fn into_parts(self) -> (PropertyTag, PropertyValue) {
        (self.tag, self.value)
    }
}

impl Encode for TaggedValue {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put(&self.tag)?;
        self.value.encode_body(encoder)
    }
}

impl Decode for TaggedValue {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        let tag: PropertyTag = decoder.get()?;
        let value = PropertyValue::decode_body(tag.prop_type()?, decoder)?;
        Ok(Self { tag, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_ndr, to_ndr};

    #[test]
    fn string8_value_wire_shape() {
        let tv = TaggedValue::new(
            PropertyTag::SUBJECT,
            PropertyValue::String8("Same subject".into()),
        )
        .unwrap();
        let bytes = to_ndr(&tv).unwrap();
        assert_eq!(&bytes[..4], &0x0037_001Eu32.to_le_bytes());
        assert_eq!(&bytes[4..8], &12u32.to_le_bytes());
        assert_eq!(&bytes[8..], b"Same subject");
        assert_eq!(from_ndr::<TaggedValue>(&bytes).unwrap(), tv);
    }

    #[test]
    fn mismatched_type_rejected() {
        let err = TaggedValue::new(PropertyTag::SUBJECT, PropertyValue::Long(1)).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { actual: "Long", .. }));
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(PropertyValue::String8("X".repeat(39)).byte_size(), 39);
        assert_eq!(PropertyValue::Unicode("ab".into()).byte_size(), 4);
        assert_eq!(PropertyValue::Long(7).byte_size(), 4);
        assert_eq!(PropertyValue::Binary(vec![1, 2, 3]).byte_size(), 3);
    }

    #[test]
    fn compare_same_type_only() {
        assert_eq!(
            PropertyValue::Long(1).compare(&PropertyValue::Long(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            PropertyValue::String8("a".into()).compare(&PropertyValue::Unicode("a".into())),
            Some(Ordering::Equal)
        );
        assert_eq!(PropertyValue::Long(1).compare(&PropertyValue::LongLong(1)), None);
    }

    #[test]
    fn invalid_boolean_byte() {
        let mut bytes = 0x0001_000Bu32.to_le_bytes().to_vec();
        bytes.push(2);
        assert!(matches!(
            from_ndr::<TaggedValue>(&bytes),
            Err(CodecError::InvalidStructure { .. })
        ));
    }
}

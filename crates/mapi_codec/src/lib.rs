//! # MAPI Codec
//!
//! Wire encoding for the MAPI client core.
//!
//! Operation payloads travel as packed little-endian fields:
//! - Integers are little-endian with no alignment padding
//! - Strings and binaries carry an explicit length prefix
//! - Property values are preceded by a 32-bit property tag whose low
//!   word selects the value's shape
//!
//! ## Usage
//!
//! ```
//! use mapi_codec::{from_ndr, to_ndr, PropertyTag, PropertyValue, TaggedValue};
//!
//! let value = TaggedValue::new(PropertyTag::BODY, PropertyValue::String8("hi".into())).unwrap();
//! let bytes = to_ndr(&value).unwrap();
//! let decoded: TaggedValue = from_ndr(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod tag;
mod value;

pub use decoder::{from_ndr, NdrDecoder};
pub use encoder::{to_ndr, NdrEncoder};
pub use error::{CodecError, CodecResult};
pub use tag::{PropertyTag, PropertyType};
pub use value::{PropertyValue, TaggedValue};

/// Trait for types that can be written to the wire.
pub trait Encode {
    /// Append this value's wire bytes to the encoder.
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()>;
}

/// Trait for types that can be read from the wire.
pub trait Decode: Sized {
    /// Read one value from the decoder.
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self>;
}

impl Encode for [PropertyTag] {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        for tag in self {
            encoder.put(tag)?;
        }
        Ok(())
    }
}

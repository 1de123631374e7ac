//! Restrictions: predicates the server applies to the rows of a table.
//!
//! A [`Restriction`] is one of six shapes. Each shape's payload is a
//! struct with private fields built through a validating constructor, so a
//! value that reaches the wire is always well formed:
//!
//! | Shape | Wire type | Fields |
//! |---|---|---|
//! | [`ContentMatch`] | `0x03` | fuzzy level, tag, literal |
//! | [`PropertyCompare`] | `0x04` | operator, tag, literal |
//! | [`CrossPropertyCompare`] | `0x05` | operator, tag A, tag B |
//! | [`BitmaskTest`] | `0x06` | relation, tag, mask |
//! | [`SizeCompare`] | `0x07` | operator, tag, size |
//! | [`Exists`] | `0x08` | tag |
//!
//! Evaluation happens on the server; this module only builds and
//! serializes predicates.

use crate::error::{ProtocolError, ProtocolResult};
use mapi_codec::{
    CodecError, CodecResult, Decode, Encode, NdrDecoder, NdrEncoder, PropertyTag, PropertyType,
    PropertyValue,
};
use std::cmp::Ordering;

/// Relational operator shared by property, size and cross-property tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    /// `RELOP_LT`.
    Lt,
    /// `RELOP_LE`.
    Le,
    /// `RELOP_GT`.
    Gt,
    /// `RELOP_GE`.
    Ge,
    /// `RELOP_EQ`.
    Eq,
    /// `RELOP_NE`.
    Ne,
}

impl RelOp {
    /// All operators, in wire order.
    pub const ALL: [RelOp; 6] = [RelOp::Lt, RelOp::Le, RelOp::Gt, RelOp::Ge, RelOp::Eq, RelOp::Ne];

    /// Converts to the wire code.
    pub fn to_code(self) -> u8 {
        match self {
            RelOp::Lt => 0,
            RelOp::Le => 1,
            RelOp::Gt => 2,
            RelOp::Ge => 3,
            RelOp::Eq => 4,
            RelOp::Ne => 5,
        }
    }

    /// Converts from the wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        RelOp::ALL.get(usize::from(code)).copied()
    }

    /// Whether `left <op> right` holds given `left.cmp(right)`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            RelOp::Lt => ordering == Ordering::Less,
            RelOp::Le => ordering != Ordering::Greater,
            RelOp::Gt => ordering == Ordering::Greater,
            RelOp::Ge => ordering != Ordering::Less,
            RelOp::Eq => ordering == Ordering::Equal,
            RelOp::Ne => ordering != Ordering::Equal,
        }
    }
}

/// Relation a masked value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitmaskRelation {
    /// `BMR_EQZ`: `value & mask == 0`.
    EqualZero,
    /// `BMR_NEZ`: `value & mask != 0`.
    NotEqualZero,
}

impl BitmaskRelation {
    /// Converts to the wire code.
    pub fn to_code(self) -> u8 {
        match self {
            BitmaskRelation::EqualZero => 0,
            BitmaskRelation::NotEqualZero => 1,
        }
    }

    /// Converts from the wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BitmaskRelation::EqualZero),
            1 => Some(BitmaskRelation::NotEqualZero),
            _ => None,
        }
    }

    /// Whether the masked value satisfies the relation.
    pub fn holds(self, masked: u64) -> bool {
        match self {
            BitmaskRelation::EqualZero => masked == 0,
            BitmaskRelation::NotEqualZero => masked != 0,
        }
    }
}

/// Where a content match literal must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchPosition {
    /// The whole value equals the literal.
    FullString,
    /// The literal appears anywhere in the value.
    Substring,
    /// The value starts with the literal.
    Prefix,
}

/// One flag of a content match fuzzy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuzzyFlag {
    /// `FL_FULLSTRING`.
    FullString,
    /// `FL_SUBSTRING`.
    Substring,
    /// `FL_PREFIX`.
    Prefix,
    /// `FL_IGNORECASE`.
    IgnoreCase,
    /// `FL_IGNORENONSPACE`.
    IgnoreNonSpace,
    /// `FL_LOOSE`.
    Loose,
}

const FL_SUBSTRING: u32 = 0x0000_0001;
const FL_PREFIX: u32 = 0x0000_0002;
const FL_IGNORECASE: u32 = 0x0001_0000;
const FL_IGNORENONSPACE: u32 = 0x0002_0000;
const FL_LOOSE: u32 = 0x0004_0000;
const FL_COMPARISON_MASK: u32 = FL_IGNORECASE | FL_IGNORENONSPACE | FL_LOOSE;

/// Fuzzy level of a [`ContentMatch`]: exactly one position plus any
/// comparison flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuzzyLevel {
    position: MatchPosition,
    ignore_case: bool,
    ignore_non_space: bool,
    loose: bool,
}

impl FuzzyLevel {
    /// Builds a fuzzy level from a set of flags.
    ///
    /// # Errors
    ///
    /// Fails with [`ProtocolError::InvalidParameter`] unless exactly one of
    /// `FullString`, `Substring` and `Prefix` is present.
    pub fn new(flags: impl IntoIterator<Item = FuzzyFlag>) -> ProtocolResult<Self> {
        let mut position = None;
        let mut level = FuzzyLevel {
            position: MatchPosition::FullString,
            ignore_case: false,
            ignore_non_space: false,
            loose: false,
        };
        for flag in flags {
            let requested = match flag {
                FuzzyFlag::FullString => MatchPosition::FullString,
                FuzzyFlag::Substring => MatchPosition::Substring,
                FuzzyFlag::Prefix => MatchPosition::Prefix,
                FuzzyFlag::IgnoreCase => {
                    level.ignore_case = true;
                    continue;
                }
                FuzzyFlag::IgnoreNonSpace => {
                    level.ignore_non_space = true;
                    continue;
                }
                FuzzyFlag::Loose => {
                    level.loose = true;
                    continue;
                }
            };
            match position {
                Some(existing) if existing != requested => {
                    return Err(ProtocolError::invalid_parameter(format!(
                        "fuzzy level sets both {existing:?} and {requested:?}"
                    )));
                }
                _ => position = Some(requested),
            }
        }
        level.position = position.ok_or_else(|| {
            ProtocolError::invalid_parameter("fuzzy level needs one of full-string, substring, prefix")
        })?;
        Ok(level)
    }

    /// Substring match with no comparison flags.
    pub fn substring() -> Self {
        Self::with_position(MatchPosition::Substring)
    }

    /// Prefix match with no comparison flags.
    pub fn prefix() -> Self {
        Self::with_position(MatchPosition::Prefix)
    }

    /// Full-string match with no comparison flags.
    pub fn full_string() -> Self {
        Self::with_position(MatchPosition::FullString)
    }

    fn with_position(position: MatchPosition) -> Self {
        Self {
            position,
            ignore_case: false,
            ignore_non_space: false,
            loose: false,
        }
    }

    /// Adds case-insensitive comparison.
    #[must_use]
    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Adds loose comparison.
    #[must_use]
    pub fn loosely(mut self) -> Self {
        self.loose = true;
        self
    }

    /// The positioning mode.
    pub fn position(&self) -> MatchPosition {
        self.position
    }

    /// True when either `IgnoreCase` or `Loose` is set.
    pub fn is_case_insensitive(&self) -> bool {
        self.ignore_case || self.loose
    }

    /// True when `IgnoreNonSpace` is set.
    pub fn ignores_non_space(&self) -> bool {
        self.ignore_non_space
    }

    /// Converts to the wire bitmask.
    pub fn to_wire(&self) -> u32 {
        let mut bits = match self.position {
            MatchPosition::FullString => 0,
            MatchPosition::Substring => FL_SUBSTRING,
            MatchPosition::Prefix => FL_PREFIX,
        };
        if self.ignore_case {
            bits |= FL_IGNORECASE;
        }
        if self.ignore_non_space {
            bits |= FL_IGNORENONSPACE;
        }
        if self.loose {
            bits |= FL_LOOSE;
        }
        bits
    }

    /// Parses the wire bitmask.
    ///
    /// # Errors
    ///
    /// Fails when the low word is not a single position or unknown high
    /// bits are set.
    pub fn from_wire(bits: u32) -> ProtocolResult<Self> {
        let position = match bits & 0xFFFF {
            0 => MatchPosition::FullString,
            FL_SUBSTRING => MatchPosition::Substring,
            FL_PREFIX => MatchPosition::Prefix,
            other => {
                return Err(ProtocolError::invalid_parameter(format!(
                    "fuzzy position bits 0x{other:04x} are not a single mode"
                )))
            }
        };
        if bits & 0xFFFF_0000 & !FL_COMPARISON_MASK != 0 {
            return Err(ProtocolError::invalid_parameter(format!(
                "unknown fuzzy level bits 0x{bits:08x}"
            )));
        }
        Ok(Self {
            position,
            ignore_case: bits & FL_IGNORECASE != 0,
            ignore_non_space: bits & FL_IGNORENONSPACE != 0,
            loose: bits & FL_LOOSE != 0,
        })
    }
}

fn check_literal(tag: PropertyTag, value: &PropertyValue) -> ProtocolResult<()> {
    let tag_type = tag.prop_type()?;
    if tag_type != value.prop_type() {
        return Err(ProtocolError::invalid_parameter(format!(
            "tag {tag} expects {tag_type:?}, literal is {}",
            value.type_name()
        )));
    }
    Ok(())
}

/// `RES_PROPERTY`: compare a row's property to a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCompare {
    op: RelOp,
    tag: PropertyTag,
    value: PropertyValue,
}

impl PropertyCompare {
    /// Builds the comparison; the literal must have the tag's type.
    pub fn new(op: RelOp, tag: PropertyTag, value: PropertyValue) -> ProtocolResult<Self> {
        check_literal(tag, &value)?;
        Ok(Self { op, tag, value })
    }

    /// Operator.
    pub fn op(&self) -> RelOp {
        self.op
    }

    /// Property tested.
    pub fn tag(&self) -> PropertyTag {
        self.tag
    }

    /// Literal compared against.
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }
}

/// `RES_BITMASK`: test `value & mask` against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmaskTest {
    relation: BitmaskRelation,
    tag: PropertyTag,
    mask: u32,
}

impl BitmaskTest {
    /// Builds the test; the tag must be a 32-bit integer property.
    pub fn new(relation: BitmaskRelation, tag: PropertyTag, mask: u32) -> ProtocolResult<Self> {
        if tag.prop_type()? != PropertyType::Long {
            return Err(ProtocolError::invalid_parameter(format!(
                "bitmask tag {tag} is not a 32-bit integer property"
            )));
        }
        Ok(Self {
            relation,
            tag,
            mask,
        })
    }

    /// Relation.
    pub fn relation(&self) -> BitmaskRelation {
        self.relation
    }

    /// Property tested.
    pub fn tag(&self) -> PropertyTag {
        self.tag
    }

    /// Mask applied.
    pub fn mask(&self) -> u32 {
        self.mask
    }
}

/// `RES_SIZE`: compare the byte size of a row's property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeCompare {
    op: RelOp,
    tag: PropertyTag,
    size: u32,
}

impl SizeCompare {
    /// Builds the comparison.
    pub fn new(op: RelOp, tag: PropertyTag, size: u32) -> Self {
        Self { op, tag, size }
    }

    /// Operator.
    pub fn op(&self) -> RelOp {
        self.op
    }

    /// Property tested.
    pub fn tag(&self) -> PropertyTag {
        self.tag
    }

    /// Size compared against, in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// `RES_EXIST`: the row has a value for the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exists {
    tag: PropertyTag,
}

impl Exists {
    /// Builds the test.
    pub fn new(tag: PropertyTag) -> Self {
        Self { tag }
    }

    /// Property tested.
    pub fn tag(&self) -> PropertyTag {
        self.tag
    }
}

/// `RES_COMPAREPROPS`: compare two properties of the same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossPropertyCompare {
    op: RelOp,
    left: PropertyTag,
    right: PropertyTag,
}

impl CrossPropertyCompare {
    /// Builds the comparison; both tags must share a property type.
    pub fn new(op: RelOp, left: PropertyTag, right: PropertyTag) -> ProtocolResult<Self> {
        if left.type_code() != right.type_code() {
            return Err(ProtocolError::invalid_parameter(format!(
                "cannot compare {left} with {right}: property types differ"
            )));
        }
        Ok(Self { op, left, right })
    }

    /// Operator.
    pub fn op(&self) -> RelOp {
        self.op
    }

    /// Left-hand property.
    pub fn left(&self) -> PropertyTag {
        self.left
    }

    /// Right-hand property.
    pub fn right(&self) -> PropertyTag {
        self.right
    }
}

/// `RES_CONTENT`: fuzzy containment of a string or binary literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMatch {
    fuzzy: FuzzyLevel,
    tag: PropertyTag,
    value: PropertyValue,
}

impl ContentMatch {
    /// Builds the match; the literal must be a string or binary of the
    /// tag's type.
    pub fn new(fuzzy: FuzzyLevel, tag: PropertyTag, value: PropertyValue) -> ProtocolResult<Self> {
        if !value.prop_type().is_variable_length() {
            return Err(ProtocolError::invalid_parameter(format!(
                "content match literal must be a string or binary, got {}",
                value.type_name()
            )));
        }
        check_literal(tag, &value)?;
        Ok(Self { fuzzy, tag, value })
    }

    /// Fuzzy level.
    pub fn fuzzy(&self) -> FuzzyLevel {
        self.fuzzy
    }

    /// Property tested.
    pub fn tag(&self) -> PropertyTag {
        self.tag
    }

    /// Literal searched for.
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }
}

/// A single filter condition over table rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    /// Property against a literal.
    PropertyCompare(PropertyCompare),
    /// Masked bits against zero.
    BitmaskTest(BitmaskTest),
    /// Property byte size against a count.
    SizeCompare(SizeCompare),
    /// Property presence.
    Exists(Exists),
    /// Property against property.
    CrossPropertyCompare(CrossPropertyCompare),
    /// Fuzzy content match.
    ContentMatch(ContentMatch),
}

impl Restriction {
    const RES_CONTENT: u8 = 0x03;
    const RES_PROPERTY: u8 = 0x04;
    const RES_COMPAREPROPS: u8 = 0x05;
    const RES_BITMASK: u8 = 0x06;
    const RES_SIZE: u8 = 0x07;
    const RES_EXIST: u8 = 0x08;

    /// Shorthand for [`PropertyCompare::new`].
    pub fn property(op: RelOp, tag: PropertyTag, value: PropertyValue) -> ProtocolResult<Self> {
        PropertyCompare::new(op, tag, value).map(Restriction::PropertyCompare)
    }

    /// Shorthand for [`BitmaskTest::new`].
    pub fn bitmask(relation: BitmaskRelation, tag: PropertyTag, mask: u32) -> ProtocolResult<Self> {
        BitmaskTest::new(relation, tag, mask).map(Restriction::BitmaskTest)
    }

    /// Shorthand for [`SizeCompare::new`].
    pub fn size(op: RelOp, tag: PropertyTag, size: u32) -> Self {
        Restriction::SizeCompare(SizeCompare::new(op, tag, size))
    }

    /// Shorthand for [`Exists::new`].
    pub fn exists(tag: PropertyTag) -> Self {
        Restriction::Exists(Exists::new(tag))
    }

    /// Shorthand for [`CrossPropertyCompare::new`].
    pub fn compare_props(op: RelOp, left: PropertyTag, right: PropertyTag) -> ProtocolResult<Self> {
        CrossPropertyCompare::new(op, left, right).map(Restriction::CrossPropertyCompare)
    }

    /// Shorthand for [`ContentMatch::new`].
    pub fn content(fuzzy: FuzzyLevel, tag: PropertyTag, value: PropertyValue) -> ProtocolResult<Self> {
        ContentMatch::new(fuzzy, tag, value).map(Restriction::ContentMatch)
    }

    /// Wire type byte.
    pub fn type_code(&self) -> u8 {
        match self {
            Restriction::ContentMatch(_) => Self::RES_CONTENT,
            Restriction::PropertyCompare(_) => Self::RES_PROPERTY,
            Restriction::CrossPropertyCompare(_) => Self::RES_COMPAREPROPS,
            Restriction::BitmaskTest(_) => Self::RES_BITMASK,
            Restriction::SizeCompare(_) => Self::RES_SIZE,
            Restriction::Exists(_) => Self::RES_EXIST,
        }
    }
}

fn literal_error(err: ProtocolError) -> CodecError {
    CodecError::invalid_structure(err.to_string())
}

fn read_literal(decoder: &mut NdrDecoder<'_>, tag: PropertyTag) -> CodecResult<PropertyValue> {
    let literal_tag: PropertyTag = decoder.get()?;
    if literal_tag.type_code() != tag.type_code() {
        return Err(CodecError::invalid_structure(format!(
            "literal tag {literal_tag} does not match restricted tag {tag}"
        )));
    }
    PropertyValue::decode_body(literal_tag.prop_type()?, decoder)
}

fn read_relop(decoder: &mut NdrDecoder<'_>) -> CodecResult<RelOp> {
    let code = decoder.read_u8()?;
    RelOp::from_code(code)
        .ok_or_else(|| CodecError::invalid_structure(format!("unknown relational operator {code}")))
}

impl Encode for Restriction {
    fn encode(&self, encoder: &mut NdrEncoder) -> CodecResult<()> {
        encoder.put_u8(self.type_code());
        match self {
            Restriction::ContentMatch(r) => {
                encoder.put_u32(r.fuzzy.to_wire());
                encoder.put(&r.tag)?;
                encoder.put(&r.tag)?;
                r.value.encode_body(encoder)?;
            }
            Restriction::PropertyCompare(r) => {
                encoder.put_u8(r.op.to_code());
                encoder.put(&r.tag)?;
                encoder.put(&r.tag)?;
                r.value.encode_body(encoder)?;
            }
            Restriction::CrossPropertyCompare(r) => {
                encoder.put_u8(r.op.to_code());
                encoder.put(&r.left)?;
                encoder.put(&r.right)?;
            }
            Restriction::BitmaskTest(r) => {
                encoder.put_u8(r.relation.to_code());
                encoder.put(&r.tag)?;
                encoder.put_u32(r.mask);
            }
            Restriction::SizeCompare(r) => {
                encoder.put_u8(r.op.to_code());
                encoder.put(&r.tag)?;
                encoder.put_u32(r.size);
            }
            Restriction::Exists(r) => {
                encoder.put(&r.tag)?;
            }
        }
        Ok(())
    }
}

impl Decode for Restriction {
    fn decode(decoder: &mut NdrDecoder<'_>) -> CodecResult<Self> {
        let rt = decoder.read_u8()?;
        let restriction = match rt {
            Self::RES_CONTENT => {
                let fuzzy = FuzzyLevel::from_wire(decoder.read_u32()?).map_err(literal_error)?;
                let tag: PropertyTag = decoder.get()?;
                let value = read_literal(decoder, tag)?;
                Restriction::content(fuzzy, tag, value).map_err(literal_error)?
            }
            Self::RES_PROPERTY => {
                let op = read_relop(decoder)?;
                let tag: PropertyTag = decoder.get()?;
                let value = read_literal(decoder, tag)?;
                Restriction::property(op, tag, value).map_err(literal_error)?
            }
            Self::RES_COMPAREPROPS => {
                let op = read_relop(decoder)?;
                let left: PropertyTag = decoder.get()?;
                let right: PropertyTag = decoder.get()?;
                Restriction::compare_props(op, left, right).map_err(literal_error)?
            }
            Self::RES_BITMASK => {
                let code = decoder.read_u8()?;
                let relation = BitmaskRelation::from_code(code).ok_or_else(|| {
                    CodecError::invalid_structure(format!("unknown bitmask relation {code}"))
                })?;
                let tag: PropertyTag = decoder.get()?;
                let mask = decoder.read_u32()?;
                Restriction::bitmask(relation, tag, mask).map_err(literal_error)?
            }
            Self::RES_SIZE => {
                let op = read_relop(decoder)?;
                let tag: PropertyTag = decoder.get()?;
                let size = decoder.read_u32()?;
                Restriction::size(op, tag, size)
            }
            Self::RES_EXIST => Restriction::exists(decoder.get()?),
            other => {
                return Err(CodecError::invalid_structure(
                    ProtocolError::UnknownRestrictionType(other).to_string(),
                ))
            }
        };
        Ok(restriction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapi_codec::{from_ndr, to_ndr};

    const MSGFLAG_READ: u32 = 0x0000_0001;

    fn roundtrip(r: &Restriction) -> Restriction {
        from_ndr(&to_ndr(r).unwrap()).unwrap()
    }

    #[test]
    fn relop_codes() {
        for op in RelOp::ALL {
            assert_eq!(RelOp::from_code(op.to_code()), Some(op));
        }
        assert_eq!(RelOp::from_code(6), None);
    }

    #[test]
    fn relop_semantics() {
        use Ordering::*;
        assert!(RelOp::Lt.holds(Less) && !RelOp::Lt.holds(Equal));
        assert!(RelOp::Le.holds(Equal) && !RelOp::Le.holds(Greater));
        assert!(RelOp::Gt.holds(Greater) && !RelOp::Gt.holds(Equal));
        assert!(RelOp::Ge.holds(Equal) && !RelOp::Ge.holds(Less));
        assert!(RelOp::Eq.holds(Equal) && !RelOp::Eq.holds(Less));
        assert!(RelOp::Ne.holds(Less) && !RelOp::Ne.holds(Equal));
    }

    #[test]
    fn bitmask_relation_semantics() {
        assert!(BitmaskRelation::EqualZero.holds(0));
        assert!(!BitmaskRelation::EqualZero.holds(4));
        assert!(BitmaskRelation::NotEqualZero.holds(4));
        assert_eq!(BitmaskRelation::from_code(2), None);
    }

    #[test]
    fn fuzzy_level_requires_one_position() {
        let err = FuzzyLevel::new([FuzzyFlag::Substring, FuzzyFlag::Prefix]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameter(_)));

        let err = FuzzyLevel::new([FuzzyFlag::Loose]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameter(_)));

        let level = FuzzyLevel::new([FuzzyFlag::Substring, FuzzyFlag::Loose]).unwrap();
        assert_eq!(level.position(), MatchPosition::Substring);
        assert!(level.is_case_insensitive());
        assert_eq!(level.to_wire(), 0x0004_0001);
    }

    #[test]
    fn fuzzy_level_repeated_position_is_fine() {
        let level = FuzzyLevel::new([FuzzyFlag::Prefix, FuzzyFlag::Prefix]).unwrap();
        assert_eq!(level, FuzzyLevel::prefix());
    }

    #[test]
    fn fuzzy_level_wire() {
        assert_eq!(FuzzyLevel::full_string().to_wire(), 0);
        assert_eq!(
            FuzzyLevel::from_wire(0x0001_0002).unwrap(),
            FuzzyLevel::prefix().ignoring_case()
        );
        assert!(FuzzyLevel::from_wire(0x0000_0003).is_err());
        assert!(FuzzyLevel::from_wire(0x0100_0001).is_err());
    }

    #[test]
    fn property_literal_must_match_tag() {
        let err = Restriction::property(RelOp::Eq, PropertyTag::SUBJECT, PropertyValue::Long(3))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameter(_)));
    }

    #[test]
    fn content_literal_must_be_text_or_binary() {
        let err = Restriction::content(
            FuzzyLevel::substring(),
            PropertyTag::MESSAGE_FLAGS,
            PropertyValue::Long(1),
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameter(_)));
    }

    #[test]
    fn bitmask_requires_long_tag() {
        assert!(Restriction::bitmask(BitmaskRelation::NotEqualZero, PropertyTag::SUBJECT, 1).is_err());
        assert!(
            Restriction::bitmask(BitmaskRelation::NotEqualZero, PropertyTag::MESSAGE_FLAGS, 1)
                .is_ok()
        );
    }

    #[test]
    fn compare_props_requires_same_type() {
        assert!(Restriction::compare_props(RelOp::Eq, PropertyTag::BODY, PropertyTag::SUBJECT).is_ok());
        assert!(
            Restriction::compare_props(RelOp::Eq, PropertyTag::BODY, PropertyTag::MESSAGE_FLAGS)
                .is_err()
        );
    }

    #[test]
    fn size_compare_wire_shape() {
        let r = Restriction::size(RelOp::Gt, PropertyTag::BODY, 30);
        let bytes = to_ndr(&r).unwrap();
        let mut expected = vec![0x07, 0x02];
        expected.extend_from_slice(&0x1000_001Eu32.to_le_bytes());
        expected.extend_from_slice(&30u32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn exists_wire_shape() {
        let bytes = to_ndr(&Restriction::exists(PropertyTag::HTML)).unwrap();
        assert_eq!(bytes, vec![0x08, 0x02, 0x01, 0x13, 0x10]);
    }

    #[test]
    fn all_six_shapes_roundtrip() {
        let all = vec![
            Restriction::property(
                RelOp::Eq,
                PropertyTag::SUBJECT,
                PropertyValue::String8("Same subject".into()),
            )
            .unwrap(),
            Restriction::bitmask(BitmaskRelation::NotEqualZero, PropertyTag::MESSAGE_FLAGS, MSGFLAG_READ)
                .unwrap(),
            Restriction::size(RelOp::Gt, PropertyTag::BODY, 30),
            Restriction::exists(PropertyTag::HTML),
            Restriction::compare_props(RelOp::Eq, PropertyTag::BODY, PropertyTag::SUBJECT).unwrap(),
            Restriction::content(
                FuzzyLevel::substring().loosely(),
                PropertyTag::BODY,
                PropertyValue::String8("openchange".into()),
            )
            .unwrap(),
        ];
        for r in &all {
            assert_eq!(&roundtrip(r), r);
        }
        let codes: Vec<u8> = all.iter().map(Restriction::type_code).collect();
        assert_eq!(codes, vec![0x04, 0x06, 0x07, 0x08, 0x05, 0x03]);
    }

    #[test]
    fn unknown_type_rejected() {
        assert!(from_ndr::<Restriction>(&[0x00]).is_err());
        assert!(from_ndr::<Restriction>(&[0x09, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn decoder_rejects_bad_operator() {
        let mut bytes = vec![0x07, 0x06];
        bytes.extend_from_slice(&0x1000_001Eu32.to_le_bytes());
        bytes.extend_from_slice(&30u32.to_le_bytes());
        assert!(from_ndr::<Restriction>(&bytes).is_err());
    }

    #[test]
    fn decoder_rejects_two_positions() {
        let mut bytes = vec![0x03];
        bytes.extend_from_slice(&0x0000_0003u32.to_le_bytes());
        bytes.extend_from_slice(&0x1000_001Eu32.to_le_bytes());
        bytes.extend_from_slice(&0x1000_001Eu32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(b'x');
        assert!(from_ndr::<Restriction>(&bytes).is_err());
    }
}

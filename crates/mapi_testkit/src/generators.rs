//! Property-based test generators using proptest.
//!
//! Every strategy yields values the protocol constructors accept, so
//! generated restrictions always encode.

use crate::store::Row;
use mapi_codec::{PropertyTag, PropertyType, PropertyValue};
use mapi_protocol::{BitmaskRelation, FuzzyFlag, FuzzyLevel, LongTermId, RelOp, Restriction};
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for relational operators.
pub fn rel_op_strategy() -> impl Strategy<Value = RelOp> {
    prop::sample::select(RelOp::ALL.to_vec())
}

/// Strategy for bitmask relations.
pub fn bitmask_relation_strategy() -> impl Strategy<Value = BitmaskRelation> {
    prop_oneof![
        Just(BitmaskRelation::EqualZero),
        Just(BitmaskRelation::NotEqualZero),
    ]
}

/// Strategy for fuzzy levels: one position plus any comparison flags.
pub fn fuzzy_level_strategy() -> impl Strategy<Value = FuzzyLevel> {
    let position = prop_oneof![
        Just(FuzzyFlag::FullString),
        Just(FuzzyFlag::Substring),
        Just(FuzzyFlag::Prefix),
    ];
    (position, any::<bool>(), any::<bool>(), any::<bool>()).prop_filter_map(
        "fuzzy level needs exactly one position",
        |(position, case, non_space, loose)| {
            let mut flags = vec![position];
            if case {
                flags.push(FuzzyFlag::IgnoreCase);
            }
            if non_space {
                flags.push(FuzzyFlag::IgnoreNonSpace);
            }
            if loose {
                flags.push(FuzzyFlag::Loose);
            }
            FuzzyLevel::new(flags).ok()
        },
    )
}

/// Strategy for property types.
pub fn property_type_strategy() -> impl Strategy<Value = PropertyType> {
    prop::sample::select(vec![
        PropertyType::Short,
        PropertyType::Long,
        PropertyType::Error,
        PropertyType::Boolean,
        PropertyType::LongLong,
        PropertyType::String8,
        PropertyType::Unicode,
        PropertyType::SysTime,
        PropertyType::Binary,
    ])
}

/// Strategy for values of one property type.
pub fn value_of_type(prop_type: PropertyType) -> BoxedStrategy<PropertyValue> {
    match prop_type {
        PropertyType::Short => any::<i16>().prop_map(PropertyValue::Short).boxed(),
        PropertyType::Long => any::<u32>().prop_map(PropertyValue::Long).boxed(),
        PropertyType::Error => any::<u32>().prop_map(PropertyValue::Error).boxed(),
        PropertyType::Boolean => any::<bool>().prop_map(PropertyValue::Boolean).boxed(),
        PropertyType::LongLong => any::<u64>().prop_map(PropertyValue::LongLong).boxed(),
        PropertyType::String8 => "[ -~]{0,40}".prop_map(PropertyValue::String8).boxed(),
        PropertyType::Unicode => "\\PC{0,20}".prop_map(PropertyValue::Unicode).boxed(),
        PropertyType::SysTime => any::<u64>().prop_map(PropertyValue::SysTime).boxed(),
        PropertyType::Binary => prop::collection::vec(any::<u8>(), 0..64)
            .prop_map(PropertyValue::Binary)
            .boxed(),
    }
}

/// Strategy for property tags of one type.
pub fn tag_of_type(prop_type: PropertyType) -> impl Strategy<Value = PropertyTag> {
    any::<u16>().prop_map(move |id| PropertyTag::new(id, prop_type))
}

/// Strategy for a tag paired with a value of the tag's type.
pub fn tagged_value_strategy() -> impl Strategy<Value = (PropertyTag, PropertyValue)> {
    property_type_strategy()
        .prop_flat_map(|prop_type| (tag_of_type(prop_type), value_of_type(prop_type)))
}

fn text_or_binary_strategy() -> impl Strategy<Value = PropertyType> {
    prop::sample::select(vec![
        PropertyType::String8,
        PropertyType::Unicode,
        PropertyType::Binary,
    ])
}

/// Strategy covering all six restriction shapes.
pub fn restriction_strategy() -> impl Strategy<Value = Restriction> {
    let property = (rel_op_strategy(), tagged_value_strategy())
        .prop_filter_map("literal matches tag", |(op, (tag, value))| {
            Restriction::property(op, tag, value).ok()
        });
    let bitmask = (
        bitmask_relation_strategy(),
        tag_of_type(PropertyType::Long),
        any::<u32>(),
    )
        .prop_filter_map("bitmask on a long", |(relation, tag, mask)| {
            Restriction::bitmask(relation, tag, mask).ok()
        });
    let size = (rel_op_strategy(), any::<u32>(), any::<u32>())
        .prop_map(|(op, tag, size)| Restriction::size(op, PropertyTag(tag), size));
    let exists = any::<u32>().prop_map(|tag| Restriction::exists(PropertyTag(tag)));
    let compare = (rel_op_strategy(), property_type_strategy())
        .prop_flat_map(|(op, prop_type)| {
            (Just(op), tag_of_type(prop_type), tag_of_type(prop_type))
        })
        .prop_filter_map("tags share a type", |(op, left, right)| {
            Restriction::compare_props(op, left, right).ok()
        });
    let content = (fuzzy_level_strategy(), text_or_binary_strategy())
        .prop_flat_map(|(fuzzy, prop_type)| {
            (Just(fuzzy), tag_of_type(prop_type), value_of_type(prop_type))
        })
        .prop_filter_map("content literal matches tag", |(fuzzy, tag, value)| {
            Restriction::content(fuzzy, tag, value).ok()
        });

    prop_oneof![property, bitmask, size, exists, compare, content]
}

/// Strategy for long-term ids with zero padding.
pub fn long_term_id_strategy() -> impl Strategy<Value = LongTermId> {
    (any::<u128>(), prop::array::uniform6(any::<u8>()))
        .prop_map(|(guid, counter)| LongTermId::new(Uuid::from_u128(guid), counter))
}

/// Strategy for message rows over a small set of well-known columns.
pub fn row_strategy() -> impl Strategy<Value = Row> {
    (
        prop::option::of("[ -~]{0,24}"),
        prop::option::of("[ -~]{0,48}"),
        prop::option::of(any::<u32>()),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..32)),
    )
        .prop_map(|(subject, body, flags, html)| {
            let mut row = Row::new();
            if let Some(subject) = subject {
                row.insert(PropertyTag::SUBJECT, PropertyValue::String8(subject));
            }
            if let Some(body) = body {
                row.insert(PropertyTag::BODY, PropertyValue::String8(body));
            }
            if let Some(flags) = flags {
                row.insert(PropertyTag::MESSAGE_FLAGS, PropertyValue::Long(flags));
            }
            if let Some(html) = html {
                row.insert(PropertyTag::HTML, PropertyValue::Binary(html));
            }
            row
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapi_codec::{from_ndr, to_ndr};

    proptest! {
        #[test]
        fn generated_restrictions_encode(restriction in restriction_strategy()) {
            let bytes = to_ndr(&restriction).unwrap();
            let decoded: Restriction = from_ndr(&bytes).unwrap();
            prop_assert_eq!(decoded, restriction);
        }

        #[test]
        fn generated_values_match_tags((tag, value) in tagged_value_strategy()) {
            prop_assert_eq!(tag.prop_type().unwrap(), value.prop_type());
        }

        #[test]
        fn generated_long_term_ids_are_normalized(lt in long_term_id_strategy()) {
            prop_assert_eq!(lt.padding, 0);
        }
    }
}

//! Server-side evaluation of restrictions against rows.
//!
//! A missing property never raises an error: the predicate is simply false,
//! except that a cross-property `Ne` with a missing side holds. Values of
//! different types are incomparable and behave like a missing side.

use crate::store::Row;
use mapi_codec::PropertyValue;
use mapi_protocol::{FuzzyLevel, MatchPosition, RelOp, Restriction};

/// Returns true if `row` satisfies `restriction`.
pub fn evaluate(restriction: &Restriction, row: &Row) -> bool {
    match restriction {
        Restriction::PropertyCompare(r) => row
            .get(&r.tag())
            .and_then(|v| v.compare(r.value()))
            .is_some_and(|ordering| r.op().holds(ordering)),
        Restriction::BitmaskTest(r) => row
            .get(&r.tag())
            .and_then(PropertyValue::as_integer)
            .is_some_and(|v| r.relation().holds(v & u64::from(r.mask()))),
        Restriction::SizeCompare(r) => row.get(&r.tag()).is_some_and(|v| {
            let size = v.byte_size() as u64;
            r.op().holds(size.cmp(&u64::from(r.size())))
        }),
        Restriction::Exists(r) => row.contains_key(&r.tag()),
        Restriction::CrossPropertyCompare(r) => {
            let ordering = match (row.get(&r.left()), row.get(&r.right())) {
                (Some(left), Some(right)) => left.compare(right),
                _ => None,
            };
            match ordering {
                Some(ordering) => r.op().holds(ordering),
                None => r.op() == RelOp::Ne,
            }
        }
        Restriction::ContentMatch(r) => row
            .get(&r.tag())
            .is_some_and(|v| content_matches(r.fuzzy(), v, r.value())),
    }
}

/// Rows of `rows` that satisfy `restriction`; all of them when it is `None`.
pub fn filter<'a>(
    restriction: Option<&'a Restriction>,
    rows: &'a [Row],
) -> impl Iterator<Item = &'a Row> + 'a {
    rows.iter()
        .filter(move |row| restriction.map_or(true, |r| evaluate(r, row)))
}

fn content_matches(fuzzy: FuzzyLevel, value: &PropertyValue, literal: &PropertyValue) -> bool {
    if let (Some(haystack), Some(needle)) = (value.as_text(), literal.as_text()) {
        let haystack = normalize(haystack, fuzzy);
        let needle = normalize(needle, fuzzy);
        return positioned(fuzzy.position(), haystack.as_bytes(), needle.as_bytes());
    }
    match (value.as_binary(), literal.as_binary()) {
        (Some(haystack), Some(needle)) => positioned(fuzzy.position(), haystack, needle),
        _ => false,
    }
}

fn normalize(text: &str, fuzzy: FuzzyLevel) -> String {
    let mut out: String = if fuzzy.ignores_non_space() {
        // Combining diacritical marks.
        text.chars()
            .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
            .collect()
    } else {
        text.to_string()
    };
    if fuzzy.is_case_insensitive() {
        out = out.to_lowercase();
    }
    out
}

fn positioned(position: MatchPosition, haystack: &[u8], needle: &[u8]) -> bool {
    match position {
        MatchPosition::FullString => haystack == needle,
        MatchPosition::Prefix => haystack.starts_with(needle),
        MatchPosition::Substring => {
            needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
        }
    }
}

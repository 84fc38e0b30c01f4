//! Value-level checks: XSD lexical validity, ordering, lengths and tags.

use crate::vocab::xsd;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use shapegate_store::{Iri, Literal, Term};
use std::cmp::Ordering;

const INTEGER_TYPES: &[&str] = &[
    xsd::INTEGER,
    xsd::INT,
    xsd::LONG,
    xsd::SHORT,
    xsd::BYTE,
    xsd::NON_NEGATIVE_INTEGER,
    xsd::POSITIVE_INTEGER,
];

fn is_numeric_type(dt: &str) -> bool {
    INTEGER_TYPES.contains(&dt) || matches!(dt, xsd::DECIMAL | xsd::DOUBLE | xsd::FLOAT)
}

fn parse_integer(lexical: &str) -> Option<i128> {
    let s = lexical.trim();
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.strip_prefix('+').unwrap_or(s).parse().ok()
}

fn is_decimal(lexical: &str) -> bool {
    let s = lexical.trim();
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    (!int.is_empty() || !frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

fn parse_float(lexical: &str) -> Option<f64> {
    match lexical.trim() {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        s if s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("nan") => None,
        s => s.parse().ok(),
    }
}

fn parse_date(lexical: &str) -> Option<NaiveDate> {
    let s = lexical.trim();
    let (date, zone) = match (s.get(..10), s.get(10..)) {
        (Some(date), Some(zone)) => (date, zone),
        _ => (s, ""),
    };
    if !(zone.is_empty() || zone == "Z" || is_offset(zone)) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn is_offset(zone: &str) -> bool {
    let bytes = zone.as_bytes();
    bytes.len() == 6
        && matches!(bytes[0], b'+' | b'-')
        && bytes[3] == b':'
        && [1, 2, 4, 5].iter().all(|&i| bytes[i].is_ascii_digit())
}

/// Zoned timestamps compare on their instant; unzoned ones are read as UTC.
fn parse_date_time(lexical: &str) -> Option<NaiveDateTime> {
    let s = lexical.trim();
    if let Ok(zoned) = DateTime::<FixedOffset>::parse_from_rfc3339(s) {
        return Some(zoned.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Whether the lexical form is valid for the literal's own datatype.
///
/// Datatypes outside the XSD subset we know are accepted as-is.
pub fn is_valid_lexical(literal: &Literal) -> bool {
    let lexical = literal.lexical();
    match literal.datatype().as_str() {
        xsd::INTEGER => parse_integer(lexical).is_some(),
        xsd::INT => parse_integer(lexical).is_some_and(|v| i32::try_from(v).is_ok()),
        xsd::LONG => parse_integer(lexical).is_some_and(|v| i64::try_from(v).is_ok()),
        xsd::SHORT => parse_integer(lexical).is_some_and(|v| i16::try_from(v).is_ok()),
        xsd::BYTE => parse_integer(lexical).is_some_and(|v| i8::try_from(v).is_ok()),
        xsd::NON_NEGATIVE_INTEGER => parse_integer(lexical).is_some_and(|v| v >= 0),
        xsd::POSITIVE_INTEGER => parse_integer(lexical).is_some_and(|v| v > 0),
        xsd::DECIMAL => is_decimal(lexical),
        xsd::DOUBLE | xsd::FLOAT => parse_float(lexical).is_some(),
        xsd::BOOLEAN => matches!(lexical.trim(), "true" | "false" | "1" | "0"),
        xsd::DATE => parse_date(lexical).is_some(),
        xsd::DATE_TIME => parse_date_time(lexical).is_some(),
        _ => true,
    }
}

/// `sh:datatype`: a literal of exactly `datatype` with a valid lexical form.
pub fn has_datatype(term: &Term, datatype: &Iri) -> bool {
    term.as_literal()
        .is_some_and(|lit| lit.datatype() == datatype && is_valid_lexical(lit))
}

#[derive(Debug, Clone, PartialEq)]
enum Comparable {
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

fn comparable(literal: &Literal) -> Option<Comparable> {
    let dt = literal.datatype().as_str();
    let lexical = literal.lexical();
    if is_numeric_type(dt) {
        if !is_valid_lexical(literal) {
            return None;
        }
        return parse_float(lexical).map(Comparable::Number);
    }
    match dt {
        xsd::DATE => parse_date(lexical).map(Comparable::Date),
        xsd::DATE_TIME => parse_date_time(lexical).map(Comparable::DateTime),
        xsd::STRING => Some(Comparable::Text(lexical.to_string())),
        _ => None,
    }
}

/// Order `value` against `bound`; `None` when the two are not comparable.
pub fn compare_literals(value: &Literal, bound: &Literal) -> Option<Ordering> {
    match (comparable(value)?, comparable(bound)?) {
        (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(&b),
        (Comparable::Date(a), Comparable::Date(b)) => Some(a.cmp(&b)),
        (Comparable::DateTime(a), Comparable::DateTime(b)) => Some(a.cmp(&b)),
        (Comparable::Text(a), Comparable::Text(b)) => Some(a.cmp(&b)),
        _ => None,
    }
}

/// String form used by length and pattern checks; blank nodes have none.
pub fn string_form(term: &Term) -> Option<&str> {
    match term {
        Term::Literal(lit) => Some(lit.lexical()),
        Term::Iri(iri) => Some(iri.as_str()),
        _ => None,
    }
}

/// Basic language-range matching: exact tag, a prefix followed by `-`, or `*`.
pub fn language_matches(tag: &str, range: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    let range = range.to_ascii_lowercase();
    range == "*"
        || tag == range
        || tag
            .strip_prefix(range.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
}

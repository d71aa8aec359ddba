//! Value sanitization shared by all entity kinds.
//!
//! Sanitization never fails: anything ambiguous collapses to
//! [`SqlValue::Null`].

use indexmap::IndexMap;
use serde::Serialize;

use crate::value::{RawValue, Scalar};

/// String literals that mean "no data" in upstream exports.
pub const SENTINELS: &[&str] = &["undefined", "null", ""];

/// Key under which the XML reader keeps element text next to attributes.
const XML_TEXT_KEY: &str = "#text";

/// A column value ready for SQL rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Entity fields after sanitization, in table column order.
///
/// Never holds `"undefined"`, `"null"` or an empty string as a live value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SanitizedFieldMap(IndexMap<&'static str, SqlValue>);

impl SanitizedFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column, sanitizing text values on the way in.
    pub fn insert(&mut self, column: &'static str, value: SqlValue) {
        self.0.insert(column, scrub(value));
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SqlValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(&'static str, SqlValue)> for SanitizedFieldMap {
    fn from_iter<I: IntoIterator<Item = (&'static str, SqlValue)>>(iter: I) -> Self {
        let mut map = SanitizedFieldMap::new();
        for (column, value) in iter {
            map.insert(column, value);
        }
        map
    }
}

fn scrub(value: SqlValue) -> SqlValue {
    match value {
        SqlValue::Text(s) => clean_text(&s).map_or(SqlValue::Null, SqlValue::Text),
        SqlValue::Float(f) if !f.is_finite() => SqlValue::Null,
        other => other,
    }
}

fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if SENTINELS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// True when a raw value counts as missing for required-field checks:
/// absent, null, empty, or the literal `"undefined"`.
pub fn is_missing(value: Option<&RawValue>) -> bool {
    match value {
        None => true,
        Some(RawValue::Scalar(Scalar::Null)) => true,
        Some(RawValue::Scalar(Scalar::Text(s))) => s.is_empty() || s == "undefined",
        Some(_) => false,
    }
}

/// Trim, collapse sentinels to null, and render non-text scalars as text.
pub fn sanitize_string(value: &RawValue) -> SqlValue {
    match value {
        RawValue::Scalar(Scalar::Null) => SqlValue::Null,
        RawValue::Scalar(Scalar::Text(s)) => clean_text(s).map_or(SqlValue::Null, SqlValue::Text),
        RawValue::Scalar(Scalar::Int(i)) => SqlValue::Text(i.to_string()),
        RawValue::Scalar(Scalar::Float(f)) if f.is_finite() => SqlValue::Text(f.to_string()),
        RawValue::Scalar(Scalar::Float(_)) => SqlValue::Null,
        RawValue::Scalar(Scalar::Bool(b)) => SqlValue::Text(b.to_string()),
        RawValue::Sequence(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| sanitize_string(item).as_text().map(str::to_string))
                .collect();
            if parts.is_empty() {
                SqlValue::Null
            } else {
                SqlValue::Text(parts.join(", "))
            }
        }
        RawValue::Mapping(map) => map
            .get(XML_TEXT_KEY)
            .map_or(SqlValue::Null, sanitize_string),
    }
}

/// Parse a numeric value; unparsable or non-finite input becomes null.
pub fn sanitize_number(value: &RawValue) -> SqlValue {
    match value {
        RawValue::Scalar(Scalar::Int(i)) => SqlValue::Int(*i),
        RawValue::Scalar(Scalar::Float(f)) if f.is_finite() => SqlValue::Float(*f),
        RawValue::Scalar(Scalar::Text(s)) => {
            let Some(text) = clean_text(s) else {
                return SqlValue::Null;
            };
            if let Ok(i) = text.parse::<i64>() {
                SqlValue::Int(i)
            } else {
                match text.parse::<f64>() {
                    Ok(f) if f.is_finite() => SqlValue::Float(f),
                    _ => SqlValue::Null,
                }
            }
        }
        RawValue::Mapping(map) => map
            .get(XML_TEXT_KEY)
            .map_or(SqlValue::Null, sanitize_number),
        _ => SqlValue::Null,
    }
}

//! Record normalization.
//!
//! Converted documents arrive in three shapes: a bare array of records, an
//! XML-style wrapper such as `{Hospitais: {Hospital: [...]}}`, or a single
//! object. [`normalize`] flattens all three into an ordered list of records.

use crate::error::ShapeError;
use crate::value::{RawRecord, RawValue};

/// Plural wrapper element and the singular element it contains.
pub const WRAPPER_KEYS: &[(&str, &str)] = &[
    ("Hospitais", "Hospital"),
    ("Medicos", "Medico"),
    ("Pacientes", "Paciente"),
];

/// Flatten a parsed document into an ordered list of records.
///
/// Rules, applied in order:
/// 1. A sequence is returned element by element.
/// 2. An object holding a known plural wrapper whose singular child is a
///    sequence (or a lone object) is unwrapped to that child.
/// 3. Any other object is a single record.
///
/// Sequence elements that are not objects become empty records, which then
/// fail required-field validation downstream instead of aborting the batch.
///
/// # Errors
/// [`ShapeError::InvalidDataShape`] when the document is a scalar.
pub fn normalize(parsed: RawValue) -> Result<Vec<RawRecord>, ShapeError> {
    match parsed {
        RawValue::Sequence(items) => Ok(items.into_iter().map(into_record).collect()),
        RawValue::Mapping(map) => match unwrap_wrapper(&map) {
            Some(inner) => Ok(inner),
            None => Ok(vec![map]),
        },
        scalar @ RawValue::Scalar(_) => Err(ShapeError::InvalidDataShape {
            found: scalar.kind(),
        }),
    }
}

fn unwrap_wrapper(map: &RawRecord) -> Option<Vec<RawRecord>> {
    WRAPPER_KEYS.iter().find_map(|(plural, singular)| {
        let inner = map.get(*plural)?.as_mapping()?.get(*singular)?;
        match inner {
            RawValue::Sequence(items) => Some(items.iter().cloned().map(into_record).collect()),
            RawValue::Mapping(record) => Some(vec![record.clone()]),
            RawValue::Scalar(_) => None,
        }
    })
}

fn into_record(value: RawValue) -> RawRecord {
    match value {
        RawValue::Mapping(map) => map,
        other => {
            tracing::debug!(shape = other.kind(), "non-object element in record list");
            RawRecord::new()
        }
    }
}

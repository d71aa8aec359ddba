//! Loosely-typed values produced by format conversion.
//!
//! Every input format (JSON, XML, CSV, HL7) is parsed into a [`RawValue`]
//! tree so that normalization and validation can pattern-match on shape
//! instead of probing an untyped document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered mapping of field name to value, as read from the source file.
pub type RawRecord = IndexMap<String, RawValue>;

/// Leaf values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Tagged union over the three shapes a parsed document can take.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Scalar(Scalar),
    Sequence(Vec<RawValue>),
    Mapping(RawRecord),
}

impl RawValue {
    pub fn null() -> Self {
        RawValue::Scalar(Scalar::Null)
    }

    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Scalar(Scalar::Text(value.into()))
    }

    /// Short name of the shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Scalar(Scalar::Null) => "null",
            RawValue::Scalar(Scalar::Bool(_)) => "boolean",
            RawValue::Scalar(Scalar::Int(_)) | RawValue::Scalar(Scalar::Float(_)) => "number",
            RawValue::Scalar(Scalar::Text(_)) => "string",
            RawValue::Sequence(_) => "array",
            RawValue::Mapping(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Scalar(Scalar::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&RawRecord> {
        match self {
            RawValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Scalar(Scalar::Null) => write!(f, "null"),
            RawValue::Scalar(Scalar::Bool(b)) => write!(f, "{}", b),
            RawValue::Scalar(Scalar::Int(i)) => write!(f, "{}", i),
            RawValue::Scalar(Scalar::Float(fl)) => write!(f, "{}", fl),
            RawValue::Scalar(Scalar::Text(s)) => write!(f, "{}", s),
            RawValue::Sequence(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", rendered.join(", "))
            }
            RawValue::Mapping(map) => write!(f, "{:?}", map),
        }
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::null(),
            serde_json::Value::Bool(b) => RawValue::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawValue::Scalar(Scalar::Int(i))
                } else if let Some(f) = n.as_f64() {
                    RawValue::Scalar(Scalar::Float(f))
                } else {
                    RawValue::null()
                }
            }
            serde_json::Value::String(s) => RawValue::text(s),
            serde_json::Value::Array(items) => {
                RawValue::Sequence(items.into_iter().map(RawValue::from).collect())
            }
            serde_json::Value::Object(map) => RawValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, RawValue::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_key_order() {
        let value = RawValue::from(json!({"nome": "Hosp", "codigo": "H1", "leitos": 10}));
        let map = value.as_mapping().unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["nome", "codigo", "leitos"]);
        assert_eq!(map.get("leitos"), Some(&RawValue::Scalar(Scalar::Int(10))));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(RawValue::null().kind(), "null");
        assert_eq!(RawValue::text("x").kind(), "string");
        assert_eq!(RawValue::Sequence(vec![]).kind(), "array");
        assert_eq!(RawValue::Mapping(RawRecord::new()).kind(), "object");
    }

    #[test]
    fn test_serializes_untagged() {
        let value = RawValue::from(json!([{"a": "1"}, null, 2.5]));
        let out = serde_json::to_string(&value).unwrap();
        assert_eq!(out, r#"[{"a":"1"},null,2.5]"#);
    }

    #[test]
    fn test_display_sequence_joins_items() {
        let value = RawValue::Sequence(vec![RawValue::text("Cardiologia"), RawValue::text("Pediatria")]);
        assert_eq!(value.to_string(), "Cardiologia, Pediatria");
    }
}

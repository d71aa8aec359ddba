use crate::error::ConvertError;
use crate::value::RawValue;

/// Parse a JSON (or FHIR-JSON) document. The document is passed through
/// untouched apart from the change of representation; key order is kept.
pub fn parse_json(bytes: &[u8]) -> Result<RawValue, ConvertError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    Ok(RawValue::from(value))
}

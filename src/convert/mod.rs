//! Format conversion: raw bytes plus a declared extension in, [`RawValue`] out.
//!
//! The converter knows nothing about hospitals, physicians or patients. It
//! only turns each supported format into the generic value tree:
//!
//! - `.json` / `.fhir`: parsed as JSON, passed through
//! - `.xml`: permissive element tree, repeated siblings become arrays
//! - `.csv` / `.xlsx`: header row, one object per following row
//! - `.hl7`: segment-naive, one array per segment name
//!
//! Input is decoded as UTF-8 lossily: bytes that are not valid UTF-8 (a
//! Latin-1 export, say) become U+FFFD instead of failing the whole file.

mod delimited;
mod hl7;
mod json;
mod xml;

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use crate::error::ConvertError;
use crate::value::RawValue;

pub use delimited::parse_csv;
pub use hl7::parse_hl7;
pub use json::parse_json;
pub use xml::parse_xml;

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Extensions accepted by the upload entry points.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".xlsx", ".xml", ".json", ".hl7", ".fhir", ".csv"];

/// Input formats recognised by [`convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Fhir,
    Xml,
    Csv,
    /// Treated as CSV text; no spreadsheet decoding is attempted.
    Xlsx,
    Hl7,
}

impl SourceFormat {
    /// Resolve a format from an extension, with or without the leading dot.
    /// Matching is case-insensitive.
    pub fn from_extension(extension: &str) -> Result<Self> {
        let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "json" => Ok(SourceFormat::Json),
            "fhir" => Ok(SourceFormat::Fhir),
            "xml" => Ok(SourceFormat::Xml),
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" => Ok(SourceFormat::Xlsx),
            "hl7" => Ok(SourceFormat::Hl7),
            _ => Err(ConvertError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Resolve a format from a file name such as `hospitais.XML`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Json => ".json",
            SourceFormat::Fhir => ".fhir",
            SourceFormat::Xml => ".xml",
            SourceFormat::Csv => ".csv",
            SourceFormat::Xlsx => ".xlsx",
            SourceFormat::Hl7 => ".hl7",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Convert a byte buffer into a value tree according to its extension.
///
/// # Errors
/// [`ConvertError::UnsupportedFormat`] for unknown extensions, or the
/// format-specific parse error.
///
/// # Example
/// ```
/// use health_ingest::convert::convert;
///
/// let parsed = convert(b"codigo,nome\nH1,Hosp A\n", ".csv").unwrap();
/// assert_eq!(parsed.as_sequence().map(|rows| rows.len()), Some(1));
/// ```
pub fn convert(bytes: &[u8], extension: &str) -> Result<RawValue> {
    convert_format(bytes, SourceFormat::from_extension(extension)?)
}

/// Convert a byte buffer whose format is already known.
pub fn convert_format(bytes: &[u8], format: SourceFormat) -> Result<RawValue> {
    let value = match format {
        SourceFormat::Json | SourceFormat::Fhir => parse_json(decode_text(bytes).as_bytes())?,
        SourceFormat::Xml => parse_xml(&decode_text(bytes))?,
        SourceFormat::Csv | SourceFormat::Xlsx => parse_csv(bytes)?,
        SourceFormat::Hl7 => parse_hl7(&decode_text(bytes)),
    };

    tracing::debug!(format = %format, shape = value.kind(), "converted input");
    Ok(value)
}

fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        tracing::warn!("input contains invalid UTF-8, replaced with U+FFFD");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_accepts_dot_and_case() {
        assert_eq!(SourceFormat::from_extension(".JSON").unwrap(), SourceFormat::Json);
        assert_eq!(SourceFormat::from_extension("hl7").unwrap(), SourceFormat::Hl7);
        assert_eq!(
            SourceFormat::from_path(Path::new("upload/Hospitais.Xml")).unwrap(),
            SourceFormat::Xml
        );
    }

    #[test]
    fn test_unsupported_format() {
        let err = convert(b"%PDF", ".pdf").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
        assert!(SourceFormat::from_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_allowed_extensions_all_resolve() {
        for ext in ALLOWED_EXTENSIONS {
            assert!(SourceFormat::from_extension(ext).is_ok(), "{} should resolve", ext);
        }
    }

    #[test]
    fn test_xlsx_is_read_as_csv() {
        let parsed = convert(b"codigo,nome\nH1,Hosp A\n", ".xlsx").unwrap();
        let rows = parsed.as_sequence().unwrap();
        assert_eq!(rows[0].as_mapping().unwrap()["nome"], RawValue::text("Hosp A"));
    }

    #[test]
    fn test_fhir_is_read_as_json() {
        let parsed = convert(br#"{"resourceType": "Patient"}"#, ".fhir").unwrap();
        assert_eq!(
            parsed.as_mapping().unwrap()["resourceType"],
            RawValue::text("Patient")
        );
    }

    #[test]
    fn test_invalid_utf8_xml_is_decoded_lossily() {
        let parsed = convert(b"<Hospital><codigo>H1</codigo><nome>S\xe3o Jos\xe9</nome></Hospital>", ".xml").unwrap();
        let record = parsed.as_mapping().unwrap()["Hospital"].as_mapping().unwrap();
        assert_eq!(record["codigo"], RawValue::text("H1"));
        assert_eq!(record["nome"], RawValue::text("S\u{fffd}o Jos\u{fffd}"));
    }

    #[test]
    fn test_latin1_csv_keeps_every_row() {
        let csv = b"codigo,nome,cod_municipio,bairro\nH1,S\xe3o Jos\xe9,1,Centro\nH2,Ok,1,Norte\n";
        let parsed = convert(csv, ".csv").unwrap();
        let rows = parsed.as_sequence().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_mapping().unwrap()["nome"], RawValue::text("S\u{fffd}o Jos\u{fffd}"));
        assert_eq!(rows[1].as_mapping().unwrap()["codigo"], RawValue::text("H2"));
    }

    #[test]
    fn test_invalid_utf8_hl7_and_json() {
        let parsed = convert(b"PID|1||P\xe91\r", ".hl7").unwrap();
        assert_eq!(parsed.as_mapping().unwrap()["PID"].as_sequence().unwrap().len(), 1);

        let parsed = convert(b"{\"nome\": \"Jo\xe3o\"}", ".json").unwrap();
        assert_eq!(parsed.as_mapping().unwrap()["nome"], RawValue::text("Jo\u{fffd}o"));
    }
}

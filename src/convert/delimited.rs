//! Header-keyed CSV reading.
//!
//! Rows are read best-effort: a short row yields only the columns it has,
//! extra trailing cells are dropped, and blank lines are skipped. Cells are
//! decoded as UTF-8 one by one, lossily, so a Latin-1 cell cannot sink the
//! rest of the file.

use csv::{ByteRecord, ReaderBuilder};

use crate::error::ConvertError;
use crate::value::{RawRecord, RawValue};

pub fn parse_csv(bytes: &[u8]) -> Result<RawValue, ConvertError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = decode_cells(reader.byte_headers()?)
        .into_iter()
        .map(|h| h.trim_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.byte_records().enumerate() {
        let record = decode_cells(&record?);
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        if record.len() > headers.len() {
            tracing::debug!(
                row = line + 1,
                cells = record.len(),
                columns = headers.len(),
                "dropping cells beyond header width"
            );
        }

        let row: RawRecord = headers
            .iter()
            .zip(record)
            .map(|(header, cell)| (header.clone(), RawValue::text(cell)))
            .collect();
        rows.push(RawValue::Mapping(row));
    }

    Ok(RawValue::Sequence(rows))
}

fn decode_cells(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_keyed_rows() {
        let parsed = parse_csv(b"codigo,nome,cod_municipio,bairro\nH1,Hosp A,1100015,Centro\n").unwrap();
        let rows = parsed.as_sequence().unwrap();
        assert_eq!(rows.len(), 1);

        let row = rows[0].as_mapping().unwrap();
        assert_eq!(row["codigo"], RawValue::text("H1"));
        assert_eq!(row["cod_municipio"], RawValue::text("1100015"));
        assert_eq!(row["bairro"], RawValue::text("Centro"));
    }

    #[test]
    fn test_short_row_partially_parses() {
        let parsed = parse_csv(b"codigo,nome,bairro\nH1,Hosp A\n").unwrap();
        let row = parsed.as_sequence().unwrap()[0].as_mapping().unwrap().clone();
        assert_eq!(row.len(), 2);
        assert!(!row.contains_key("bairro"));
    }

    #[test]
    fn test_quoted_cell_with_separator() {
        let parsed = parse_csv(b"codigo,especialidades\nH1,\"Cardiologia; Pediatria, UTI\"\n").unwrap();
        let row = parsed.as_sequence().unwrap()[0].as_mapping().unwrap().clone();
        assert_eq!(row["especialidades"], RawValue::text("Cardiologia; Pediatria, UTI"));
    }

    #[test]
    fn test_blank_lines_and_bom() {
        let parsed = parse_csv("\u{feff}codigo,nome\n\nH1,A\n,\n".as_bytes()).unwrap();
        let rows = parsed.as_sequence().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].as_mapping().unwrap().contains_key("codigo"));
    }

    #[test]
    fn test_latin1_cell_is_decoded_lossily() {
        let parsed = parse_csv(b"codigo,bairro\nH1,Cora\xe7\xe3o\nH2,Norte\n").unwrap();
        let rows = parsed.as_sequence().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].as_mapping().unwrap()["bairro"],
            RawValue::text("Cora\u{fffd}\u{fffd}o")
        );
    }

    #[test]
    fn test_header_only() {
        let parsed = parse_csv(b"codigo,nome\n").unwrap();
        assert_eq!(parsed.as_sequence().unwrap().len(), 0);
    }
}

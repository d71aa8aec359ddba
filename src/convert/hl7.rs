//! Segment-naive HL7 v2 reader.
//!
//! Each line is split on `|`. The first token names the segment and the
//! remaining tokens are appended, as one array, under that name. Field
//! semantics, components (`^`) and escapes are not interpreted.

use crate::value::{RawRecord, RawValue};

pub fn parse_hl7(content: &str) -> RawValue {
    let mut segments = RawRecord::new();

    for line in content.split(['\n', '\r']).filter(|line| !line.is_empty()) {
        let mut fields = line.split('|');
        let name = fields.next().unwrap_or_default().to_string();
        let values: Vec<RawValue> = fields.map(RawValue::text).collect();

        let entry = segments
            .entry(name)
            .or_insert_with(|| RawValue::Sequence(Vec::new()));
        if let RawValue::Sequence(occurrences) = entry {
            occurrences.push(RawValue::Sequence(values));
        }
    }

    RawValue::Mapping(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "MSH|^~\\&|LAB|HOSP|||202401011200||ADT^A01|1|P|2.5\r\n\
PID|1||123456^^^MRN||Silva^Maria||19800115|F\n\
OBX|1|NM|GLU||98\n\
OBX|2|NM|HGB||13.5\n";

    #[test]
    fn test_segments_keyed_by_name() {
        let parsed = parse_hl7(MESSAGE);
        let map = parsed.as_mapping().unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["MSH", "PID", "OBX"]);
    }

    #[test]
    fn test_repeated_segments_accumulate() {
        let parsed = parse_hl7(MESSAGE);
        let obx = parsed.as_mapping().unwrap()["OBX"].as_sequence().unwrap();
        assert_eq!(obx.len(), 2);

        let second = obx[1].as_sequence().unwrap();
        assert_eq!(second[0], RawValue::text("2"));
        assert_eq!(second[4], RawValue::text("13.5"));
    }

    #[test]
    fn test_segment_name_is_not_a_field() {
        let parsed = parse_hl7("PID|1||123\n");
        let pid = parsed.as_mapping().unwrap()["PID"].as_sequence().unwrap();
        let fields = pid[0].as_sequence().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], RawValue::text("1"));
        assert_eq!(fields[1], RawValue::text(""));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_hl7(""), RawValue::Mapping(RawRecord::new()));
    }
}

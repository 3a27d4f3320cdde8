//! Property tests: every codec reproduces the fields it was given, and binary
//! MAB2 reproduces its input byte for byte.

mod common;

use common::TEST_LEADER;
use mab2::{diskette, mabjson, mabxml, reader, writer, Field, Record};
use proptest::prelude::*;

/// Text without the MAB2 separators, newlines, or XML-illegal controls.
fn value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 äöüßÄÖÜ.,:;/()&<>'\"-]{1,24}"
}

fn tag() -> impl Strategy<Value = String> {
    "[0-9]{3}"
}

fn indicator() -> impl Strategy<Value = String> {
    "[ a-z]"
}

fn field() -> impl Strategy<Value = Field> {
    prop_oneof![
        (tag(), indicator(), value())
            .prop_map(|(tag, ind, data)| Field::with_data(tag, &ind, data).unwrap()),
        (
            tag(),
            indicator(),
            prop::collection::vec(("[a-z0-9]", value()), 1..5)
        )
            .prop_map(|(tag, ind, pairs)| {
                let pairs = pairs
                    .into_iter()
                    .map(|(code, v)| (code.chars().next().unwrap(), v));
                Field::with_subfields(tag, &ind, pairs).unwrap()
            }),
    ]
}

fn record() -> impl Strategy<Value = Record> {
    prop::collection::vec(field(), 0..12).prop_map(|fields| {
        let mut record = Record::new(TEST_LEADER);
        record.append_fields(fields);
        record
    })
}

proptest! {
    #[test]
    fn binary_decode_encode_is_identity(record in record()) {
        let bytes = writer::encode(&record);
        let decoded = reader::decode(&bytes);
        prop_assert_eq!(writer::encode(&decoded), bytes);
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn diskette_roundtrip_preserves_record(record in record()) {
        let mut decoded = diskette::decode(&diskette::encode_to_string(&record)).unwrap();
        prop_assert!(decoded.warnings().is_empty());
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn xml_roundtrip_preserves_fields(record in record()) {
        let decoded = mabxml::decode_record(&mabxml::encode(&record).unwrap()).unwrap();
        prop_assert!(decoded.fields().eq(record.fields()));
    }

    #[test]
    fn json_roundtrip_preserves_record(record in record()) {
        let decoded = mabjson::decode(&mabjson::encode(&record).unwrap()).unwrap();
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn subfield_is_first_of_subfield_all(field in field(), code in "[a-z0-9]") {
        let code = code.chars().next().unwrap();
        if field.has_subfields() {
            let all = field.subfield_all(code).unwrap();
            prop_assert_eq!(field.subfield(code).unwrap(), all.first().copied());
        } else {
            prop_assert!(field.subfield(code).is_err());
        }
    }

    #[test]
    fn ordered_insert_keeps_tags_sorted(fields in prop::collection::vec(field(), 0..16)) {
        let mut record = Record::new(TEST_LEADER);
        let count = record.insert_fields_ordered(fields.clone());
        prop_assert_eq!(count, fields.len());
        let numbers: Vec<u32> = record.fields().map(|f| f.tag().parse().unwrap()).collect();
        prop_assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
    }
}

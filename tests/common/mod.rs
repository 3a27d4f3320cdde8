//! Common test helpers and fixtures shared across the test suite.

#![allow(dead_code)]

use mab2::{Field, Record};
use std::fs::File;
use std::path::PathBuf;

/// Leader used by records built in tests.
pub const TEST_LEADER: &str = "00000nM2.01200024      h";

/// Path of a file under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Open a file under `tests/data`.
pub fn open_fixture(name: &str) -> File {
    File::open(fixture_path(name)).expect("Could not open fixture")
}

/// Creates an empty record with [`TEST_LEADER`].
pub fn create_test_record() -> Record {
    Record::new(TEST_LEADER)
}

/// Creates a record resembling a catalogue title record, with data fields,
/// subfield fields and a repeated tag.
pub fn create_realistic_record() -> Record {
    let mut record = create_test_record();
    record.append_fields([
        Field::with_data("001", " ", "2415107-5").unwrap(),
        Field::with_data("100", " ", "Grass, Günter").unwrap(),
        Field::with_data("331", " ", "Die Blechtrommel").unwrap(),
        Field::with_data("425", "a", "1959").unwrap(),
        Field::with_subfields("542", "a", [('a', "0012-0413")]).unwrap(),
        Field::with_subfields(
            "655",
            "e",
            [('u', "http://d-nb.info/2415107-5/04"), ('x', "Inhaltsverzeichnis")],
        )
        .unwrap(),
        Field::with_subfields("700", "b", [('a', "Deutsche Literatur")]).unwrap(),
        Field::with_subfields("700", "b", [('a', "Roman")]).unwrap(),
    ]);
    record
}

/// Tags of a record's fields in order.
pub fn tags(record: &Record) -> Vec<String> {
    record.fields().map(|f| f.tag().to_string()).collect()
}

/// Field values of the first fixture record, shared by all four fixture files.
pub fn assert_first_fixture_record(record: &Record) {
    assert_eq!(record.record_id(), "2415107-5");
    assert_eq!(record.title(), "Die Blechtrommel");
    assert_eq!(record.issn(), "0012-0413");
    assert_eq!(record.record_status(), Some('n'));
    assert_eq!(record.record_type(), Some('h'));
    assert_eq!(tags(record), ["001", "100", "331", "425", "542", "655"]);
    assert_eq!(
        record.subfield("655", Some('e'), 'u').unwrap(),
        Some("http://d-nb.info/2415107-5/04")
    );
}

/// Field values of the second fixture record.
pub fn assert_second_fixture_record(record: &Record) {
    assert_eq!(record.record_id(), "BV012345678");
    assert_eq!(record.title(), "\u{88}Der \u{89}Prozess");
    assert_eq!(record.issn(), "");
    assert_eq!(record.record_status(), Some('c'));
    assert_eq!(record.record_type(), Some('u'));
    assert_eq!(
        record.subfield_all("700", None, 'a').unwrap(),
        vec!["Österreichische Literatur", "Roman"]
    );
}

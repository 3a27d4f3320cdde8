//! Reading binary MAB2 records.
//!
//! This module provides [`decode`] for a single framed record and
//! [`MabReader`] for reading records one at a time from any source that
//! implements [`std::io::Read`].
//!
//! Binary MAB2 has no directory: the 24-byte leader is followed directly by
//! the fields, each terminated by `0x1E`, and the record ends with `0x1D`.
//! Structural defects never abort decoding. They are recorded as warnings on
//! the returned [`Record`] (and, for field defects, on the [`Field`] too).
//!
//! # Examples
//!
//! ```
//! use mab2::MabReader;
//! use std::io::Cursor;
//!
//! let data = b"00049nM2.01200024      h001 2415107-5\x1e331 Titel\x1e\x1d".to_vec();
//! let mut reader = MabReader::new(Cursor::new(data));
//!
//! while let Some(mut record) = reader.read_record()? {
//!     assert_eq!(record.record_id(), "2415107-5");
//!     assert!(record.warnings().is_empty());
//! }
//! # Ok::<(), mab2::MabError>(())
//! ```

use crate::encoding::{decode_bytes, default_encoding};
use crate::error::Result;
use crate::field::Field;
use crate::formats::FormatReader;
use crate::leader::LEADER_LENGTH;
use crate::record::Record;
use encoding_rs::Encoding;
use std::io::{BufRead, BufReader, Read};

/// Subfield separator byte
pub const SUBFIELD_SEPARATOR: u8 = 0x1F;
/// Field separator byte
pub const FIELD_SEPARATOR: u8 = 0x1E;
/// Record terminator byte
pub const RECORD_TERMINATOR: u8 = 0x1D;

/// Decode one UTF-8 record frame.
///
/// The frame normally ends with the record terminator. See
/// [`decode_with_encoding`] for the decoding steps.
#[must_use]
pub fn decode(frame: &[u8]) -> Record {
    decode_with_encoding(frame, default_encoding())
}

/// Decode one record frame using `encoding` for all text.
///
/// 1. Leading whitespace and control bytes are dropped silently.
/// 2. The first five bytes are compared with the frame length.
/// 3. The last byte must be the record terminator.
/// 4. The first 24 bytes become the leader.
/// 5. The rest is split on the field separator and each chunk is parsed as
///    `tag[3] indicator[1] data`.
///
/// Every defect found on the way is a warning; a record is always returned.
#[must_use]
pub fn decode_with_encoding(frame: &[u8], encoding: &'static Encoding) -> Record {
    let frame = &frame[noise_len(frame)..];
    let mut warnings = Vec::new();

    let length_field = &frame[..frame.len().min(5)];
    match parse_length(length_field) {
        None => warnings.push(format!(
            "record length not numeric: {:?}",
            String::from_utf8_lossy(length_field)
        )),
        Some(length) if length != frame.len() => warnings.push(format!(
            "record length {length} does not match actual length {}",
            frame.len()
        )),
        Some(_) => {},
    }

    let body_end = if frame.last() == Some(&RECORD_TERMINATOR) {
        frame.len() - 1
    } else {
        warnings.push("record does not end with a record terminator".to_string());
        frame.len()
    };

    let leader_end = LEADER_LENGTH.min(body_end);
    let (leader, leader_errors) = decode_bytes(&frame[..leader_end], encoding);
    if leader_errors {
        warnings.push(format!("leader is not valid {}", encoding.name()));
    }
    let mut record = Record::new(leader);
    for warning in warnings {
        record.add_warning(warning);
    }

    let body = &frame[leader_end..body_end];
    let mut start = 0;
    let ends = memchr::memchr_iter(FIELD_SEPARATOR, body).chain([body.len()]);
    for (index, end) in ends.enumerate() {
        let chunk = &body[start..end];
        let last = end == body.len();
        start = (end + 1).min(body.len());
        if chunk.is_empty() {
            if !last {
                record.add_warning(format!("empty field at position {index}"));
            }
            continue;
        }
        let (text, errors) = decode_bytes(chunk, encoding);
        if errors {
            record.add_warning(format!(
                "field at position {index} is not valid {}",
                encoding.name()
            ));
        }
        append_decoded(&mut record, Field::from_chunk(&text));
    }

    log::debug!(
        "decoded MAB2 record {:?} with {} fields",
        record.record_id(),
        record.len()
    );
    if record.has_warnings() {
        log::warn!("MAB2 record {:?} decoded with warnings", record.record_id());
    }
    record
}

/// Append a decoded field, mirroring its warnings onto the record.
pub(crate) fn append_decoded(record: &mut Record, field: Field) {
    for warning in field.warnings() {
        record.add_warning(warning.clone());
    }
    record.append_field(field);
}

/// Number of stray whitespace/control bytes before the record starts.
fn noise_len(frame: &[u8]) -> usize {
    frame
        .iter()
        .take_while(|b| b.is_ascii_whitespace() || b.is_ascii_control())
        .count()
}

/// Parse the five-byte length field, tolerating surrounding spaces.
fn parse_length(bytes: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Reader for binary MAB2.
///
/// `MabReader` frames one record at a time by reading up to the record
/// terminator and decodes it with [`decode_with_encoding`].
#[derive(Debug)]
pub struct MabReader<R: Read> {
    reader: BufReader<R>,
    encoding: &'static Encoding,
    buffer: Vec<u8>,
    records_read: usize,
}

impl<R: Read> MabReader<R> {
    /// Create a new reader decoding UTF-8.
    ///
    /// # Arguments
    ///
    /// * `reader` - Any source implementing [`std::io::Read`]
    pub fn new(reader: R) -> Self {
        MabReader {
            reader: BufReader::new(reader),
            encoding: default_encoding(),
            buffer: Vec::new(),
            records_read: 0,
        }
    }

    /// Set the character encoding of the source.
    ///
    /// # Examples
    ///
    /// ```
    /// use mab2::MabReader;
    /// use std::io::Cursor;
    ///
    /// let reader = MabReader::new(Cursor::new(Vec::new()))
    ///     .with_encoding(encoding_rs::WINDOWS_1252);
    /// ```
    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Read a single record.
    ///
    /// Returns `Ok(Some(record))` for each record and `Ok(None)` at end of
    /// input. Stray bytes between records are skipped. A final record without
    /// a terminator is still returned, carrying a warning.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying source fails.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buffer.clear();
            let read = self.reader.read_until(RECORD_TERMINATOR, &mut self.buffer)?;
            if read == 0 {
                return Ok(None);
            }
            if noise_len(&self.buffer) == self.buffer.len() {
                continue;
            }
            self.records_read += 1;
            return Ok(Some(decode_with_encoding(&self.buffer, self.encoding)));
        }
    }
}

impl<R: Read + std::fmt::Debug> FormatReader for MabReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        MabReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a frame with a correct length header.
    fn frame(fields: &[&[u8]]) -> Vec<u8> {
        let mut body = Vec::new();
        for field in fields {
            body.extend_from_slice(field);
            body.push(FIELD_SEPARATOR);
        }
        let length = LEADER_LENGTH + body.len() + 1;
        let mut bytes = format!("{length:05}nM2.01200024      h").into_bytes();
        bytes.extend_from_slice(&body);
        bytes.push(RECORD_TERMINATOR);
        bytes
    }

    #[test]
    fn test_decode_simple_record() {
        let bytes = frame(&[b"001 2415107-5", b"331 Die Blechtrommel", b"542a\x1fa0012-0413"]);
        let mut record = decode(&bytes);

        assert!(record.warnings().is_empty());
        assert_eq!(record.leader().len(), LEADER_LENGTH);
        assert_eq!(record.record_status(), Some('n'));
        assert_eq!(record.record_type(), Some('h'));
        assert_eq!(record.len(), 3);
        assert_eq!(record.record_id(), "2415107-5");
        assert_eq!(record.title(), "Die Blechtrommel");
        assert_eq!(record.issn(), "0012-0413");
    }

    #[test]
    fn test_length_mismatch_warns() {
        let field = format!("001 {}", "x".repeat(535));
        let mut bytes = frame(&[field.as_bytes()]);
        assert_eq!(bytes.len(), 565);
        bytes[..5].copy_from_slice(b"00560");

        let mut record = decode(&bytes);
        assert!(!record.record_id().is_empty());
        let warnings = record.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("560"));
        assert!(warnings[0].contains("565"));
    }

    #[test]
    fn test_length_not_numeric_warns() {
        let mut bytes = frame(&[b"001 x"]);
        bytes[..5].copy_from_slice(b"0a0xy");
        let mut record = decode(&bytes);
        let warnings = record.warnings();
        assert!(warnings[0].contains("not numeric"));
        assert_eq!(record.record_id(), "x");
    }

    #[test]
    fn test_missing_terminator_warns() {
        let mut bytes = frame(&[b"001 x"]);
        bytes.pop();
        let mut record = decode(&bytes);
        let warnings = record.warnings();
        assert!(warnings.iter().any(|w| w.contains("record terminator")));
        assert_eq!(record.record_id(), "x");
    }

    #[test]
    fn test_invalid_tag_and_indicator_kept() {
        let bytes = frame(&[b"0X1 data", b"331ATitel"]);
        let mut record = decode(&bytes);
        let fields: Vec<&Field> = record.fields().collect();
        assert_eq!(fields[0].tag(), "0X1");
        assert_eq!(fields[0].warnings().len(), 1);
        assert_eq!(fields[1].indicator(), ' ');
        assert_eq!(fields[1].data().unwrap(), "Titel");
        assert_eq!(record.warnings().len(), 2);
    }

    #[test]
    fn test_no_subfield_data_keeps_field() {
        let bytes = frame(&[b"655 \x1f"]);
        let mut record = decode(&bytes);
        assert_eq!(record.len(), 1);
        let field = record.fields().next().unwrap();
        assert!(field.subfields().unwrap().is_empty());
        assert!(record.warnings()[0].contains("no subfield data found"));
    }

    #[test]
    fn test_leading_noise_is_dropped_silently() {
        let mut bytes = b"\r\n \x00".to_vec();
        bytes.extend(frame(&[b"001 x"]));
        let mut record = decode(&bytes);
        assert!(record.warnings().is_empty());
        assert_eq!(record.record_id(), "x");
    }

    #[test]
    fn test_invalid_utf8_warns() {
        let bytes = frame(&[b"100 G\xfcnter"]);
        let mut record = decode(&bytes);
        assert!(record.warnings()[0].contains("UTF-8"));

        let mut record = decode_with_encoding(&bytes, encoding_rs::WINDOWS_1252);
        assert!(record.warnings().is_empty());
        assert_eq!(record.field(&["100"], None).unwrap().unwrap().data().unwrap(), "Günter");
    }

    #[test]
    fn test_reader_multiple_records_with_noise() {
        let mut all = Vec::new();
        all.extend(frame(&[b"001 first"]));
        all.extend_from_slice(b"\r\n");
        all.extend(frame(&[b"001 second"]));
        all.extend_from_slice(b"\n");

        let mut reader = MabReader::new(Cursor::new(all));
        assert_eq!(reader.read_record().unwrap().unwrap().record_id(), "first");
        assert_eq!(reader.read_record().unwrap().unwrap().record_id(), "second");
        assert!(reader.read_record().unwrap().is_none());
        assert_eq!(FormatReader::records_read(&reader), Some(2));
    }

    #[test]
    fn test_reader_truncated_final_record() {
        let mut all = frame(&[b"001 first"]);
        let mut second = frame(&[b"001 second"]);
        second.pop();
        all.extend(second);

        let mut reader = MabReader::new(Cursor::new(all));
        reader.read_record().unwrap().unwrap();
        let mut last = reader.read_record().unwrap().unwrap();
        assert_eq!(last.record_id(), "second");
        assert!(!last.warnings().is_empty());
    }

    #[test]
    fn test_eof_returns_none() {
        let mut reader = MabReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_record().unwrap().is_none());
    }
}

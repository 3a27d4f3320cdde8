//! The MAB2 diskette format ("MAB-Diskette").
//!
//! A line-oriented rendition of binary MAB2 used for exchange on disk and in
//! mail. Each record starts with a leader line `### <leader>`, followed by one
//! line per field using the binary field grammar (`tag[3] indicator[1] data`,
//! subfields separated by `0x1F`). A blank line or the end of input ends the
//! record.
//!
//! Unlike the binary decoder, a malformed leader line is fatal for the record
//! and yields [`MabError::InvalidLeader`]. Field defects are warnings.
//!
//! # Examples
//!
//! ```
//! use mab2::diskette;
//!
//! let mut record = diskette::decode("### 0560nM2.01200024      h\n001 2415107-5\n")?;
//! assert_eq!(record.record_id(), "2415107-5");
//! assert!(record.warnings().is_empty());
//! # Ok::<(), mab2::MabError>(())
//! ```

use crate::encoding::{decode_bytes, default_encoding, encode_string};
use crate::error::{MabError, Result};
use crate::field::{Field, FieldContent, SUBFIELD_SEPARATOR};
use crate::formats::{FormatReader, FormatWriter};
use crate::reader::append_decoded;
use crate::record::Record;
use encoding_rs::Encoding;
use regex::Regex;
use std::io::{BufRead, BufReader, Read, Write};

/// Marker that opens the leader line
pub const LEADER_MARKER: &str = "###";

lazy_static::lazy_static! {
    /// Leader line: marker, length, status, version, indicator lengths and base
    /// address, reserved spaces, record type. The space after the marker is
    /// optional so the leader is always the trailing 24 characters.
    static ref LEADER_LINE: Regex =
        Regex::new(r"^###\s?([\d ]{5}[cdnpu]M2\.0[\d ]{7} {6}\w)$")
            .expect("leader line pattern is valid");
}

/// Extract the leader from a `### ...` line.
///
/// # Errors
///
/// Returns [`MabError::InvalidLeader`] if the line does not match the leader
/// pattern.
pub fn parse_leader_line(line: &str) -> Result<&str> {
    LEADER_LINE
        .captures(line.trim_end_matches('\r'))
        .and_then(|captures| captures.get(1))
        .map(|leader| leader.as_str())
        .ok_or_else(|| MabError::InvalidLeader(line.to_string()))
}

/// Decode one diskette record from text.
///
/// Leading blank lines are skipped. Decoding stops at the first blank line
/// after the leader, so at most one record is read.
///
/// # Errors
///
/// Returns [`MabError::InvalidLeader`] if the input is empty or the first line
/// is not a valid leader line.
pub fn decode(text: &str) -> Result<Record> {
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .skip_while(|line| line.trim().is_empty());

    let leader_line = lines.next().unwrap_or_default();
    let leader = match parse_leader_line(leader_line) {
        Ok(leader) => leader,
        Err(e) => {
            log::warn!("rejecting diskette record with leader line {leader_line:?}");
            return Err(e);
        },
    };

    let mut record = Record::new(leader);
    for line in lines.take_while(|line| !line.trim().is_empty()) {
        append_decoded(&mut record, Field::from_chunk(line));
    }

    log::debug!(
        "decoded diskette record {:?} with {} fields",
        record.record_id(),
        record.len()
    );
    if record.has_warnings() {
        log::warn!("diskette record {:?} decoded with warnings", record.record_id());
    }
    Ok(record)
}

/// Decode one diskette record from bytes in `encoding`.
///
/// Undecodable bytes are replaced and reported as a record warning.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_with_encoding(bytes: &[u8], encoding: &'static Encoding) -> Result<Record> {
    let (text, errors) = decode_bytes(bytes, encoding);
    let mut record = decode(&text)?;
    if errors {
        record.add_warning(format!("record is not valid {}", encoding.name()));
    }
    Ok(record)
}

/// Render a record as diskette text, including the trailing blank line.
#[must_use]
pub fn encode_to_string(record: &Record) -> String {
    let mut text = String::with_capacity(record.len() * 32 + 32);
    text.push_str(LEADER_MARKER);
    text.push(' ');
    text.push_str(record.leader());
    text.push('\n');
    for field in record.fields() {
        text.push_str(field.tag());
        text.push(field.indicator());
        match field.content() {
            FieldContent::Data(data) => text.push_str(data),
            FieldContent::Subfields(subfields) => {
                for subfield in subfields {
                    text.push(SUBFIELD_SEPARATOR);
                    text.push(subfield.code);
                    text.push_str(&subfield.value);
                }
            },
        }
        text.push('\n');
    }
    text.push('\n');
    text
}

/// Encode a record as UTF-8 diskette text.
#[must_use]
pub fn encode(record: &Record) -> Vec<u8> {
    encode_to_string(record).into_bytes()
}

/// Reader for diskette files containing any number of records.
#[derive(Debug)]
pub struct DisketteReader<R: Read> {
    reader: BufReader<R>,
    encoding: &'static Encoding,
    line: Vec<u8>,
    frame: Vec<u8>,
    records_read: usize,
}

impl<R: Read> DisketteReader<R> {
    /// Create a new reader decoding UTF-8.
    pub fn new(reader: R) -> Self {
        DisketteReader {
            reader: BufReader::new(reader),
            encoding: default_encoding(),
            line: Vec::new(),
            frame: Vec::new(),
            records_read: 0,
        }
    }

    /// Set the character encoding of the source.
    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Read the next record.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidLeader`] for a record whose leader line is
    /// malformed (the reader has then moved past that record), or an I/O
    /// error from the source.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        self.frame.clear();
        loop {
            self.line.clear();
            let read = self.reader.read_until(b'\n', &mut self.line)?;
            if read == 0 {
                break;
            }
            if self.line.iter().all(u8::is_ascii_whitespace) {
                if self.frame.is_empty() {
                    continue;
                }
                break;
            }
            self.frame.extend_from_slice(&self.line);
        }

        if self.frame.is_empty() {
            return Ok(None);
        }
        let record = decode_with_encoding(&self.frame, self.encoding)?;
        self.records_read += 1;
        Ok(Some(record))
    }
}

impl<R: Read + std::fmt::Debug> FormatReader for DisketteReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        DisketteReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// Writer for diskette files.
#[derive(Debug)]
pub struct DisketteWriter<W: Write> {
    writer: W,
    encoding: &'static Encoding,
    records_written: usize,
    finished: bool,
}

impl<W: Write> DisketteWriter<W> {
    /// Create a new writer producing UTF-8.
    pub fn new(writer: W) -> Self {
        DisketteWriter {
            writer,
            encoding: default_encoding(),
            records_written: 0,
            finished: false,
        }
    }

    /// Set the character encoding of the output.
    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Write a single record followed by a blank line.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer was already finished or an I/O error
    /// occurs.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MabError::WriterError(
                "Cannot write to a finished writer".to_string(),
            ));
        }
        let (bytes, unmappable) = encode_string(&encode_to_string(record), self.encoding);
        if unmappable {
            log::warn!(
                "record {:?} contains characters not representable in {}",
                record.record_id(),
                self.encoding.name()
            );
        }
        self.writer.write_all(&bytes)?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the output. Further writes are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + std::fmt::Debug> FormatWriter for DisketteWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        DisketteWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        DisketteWriter::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

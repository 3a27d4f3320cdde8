//! Writing binary MAB2 records.
//!
//! This module provides [`encode`] for a single record and [`MabWriter`] for
//! writing records to any destination implementing [`std::io::Write`].
//!
//! The leader is written verbatim; the record length is not recomputed and the
//! fields are not re-validated, so a decoded record encodes back to the bytes
//! it was read from.
//!
//! # Examples
//!
//! ```
//! use mab2::{Field, MabWriter, Record};
//!
//! let mut record = Record::new("00049nM2.01200024      h");
//! record.append_field(Field::with_data("001", " ", "2415107-5")?);
//! record.append_field(Field::with_data("331", " ", "Titel")?);
//!
//! let mut buffer = Vec::new();
//! {
//!     let mut writer = MabWriter::new(&mut buffer);
//!     writer.write_record(&record)?;
//!     writer.finish()?;
//! }
//! assert_eq!(buffer.len(), 49);
//! # Ok::<(), mab2::MabError>(())
//! ```

use crate::encoding::{default_encoding, encode_string};
use crate::error::{MabError, Result};
use crate::field::FieldContent;
use crate::formats::FormatWriter;
use crate::reader::{FIELD_SEPARATOR, RECORD_TERMINATOR, SUBFIELD_SEPARATOR};
use crate::record::Record;
use encoding_rs::Encoding;
use std::io::Write;

/// Encode a record as UTF-8 binary MAB2.
#[must_use]
pub fn encode(record: &Record) -> Vec<u8> {
    encode_with_encoding(record, default_encoding())
}

/// Encode a record as binary MAB2 using `encoding` for all text.
///
/// Characters the encoding cannot represent are written as numeric character
/// references and logged.
#[must_use]
pub fn encode_with_encoding(record: &Record, encoding: &'static Encoding) -> Vec<u8> {
    let mut text = String::with_capacity(record.leader().len() + record.len() * 32);
    text.push_str(record.leader());

    for field in record.fields() {
        text.push_str(field.tag());
        text.push(field.indicator());
        match field.content() {
            FieldContent::Data(data) => text.push_str(data),
            FieldContent::Subfields(subfields) => {
                for subfield in subfields {
                    text.push(char::from(SUBFIELD_SEPARATOR));
                    text.push(subfield.code);
                    text.push_str(&subfield.value);
                }
            },
        }
        text.push(char::from(FIELD_SEPARATOR));
    }
    text.push(char::from(RECORD_TERMINATOR));

    let (bytes, unmappable) = encode_string(&text, encoding);
    if unmappable {
        log::warn!(
            "record {:?} contains characters not representable in {}",
            record.record_id(),
            encoding.name()
        );
    }
    bytes
}

/// Writer for binary MAB2.
///
/// Records are written one at a time, back to back, with no separator other
/// than each record's terminator.
#[derive(Debug)]
pub struct MabWriter<W: Write> {
    writer: W,
    encoding: &'static Encoding,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MabWriter<W> {
    /// Create a new writer producing UTF-8.
    ///
    /// # Arguments
    ///
    /// * `writer` - Any destination implementing [`std::io::Write`]
    pub fn new(writer: W) -> Self {
        MabWriter {
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

    /// Write a single record.
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
        self.writer
            .write_all(&encode_with_encoding(record, self.encoding))?;
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

impl<W: Write + std::fmt::Debug> FormatWriter for MabWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MabWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        MabWriter::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

//! MABjson serialization of MAB2 records.
//!
//! A record is a JSON object holding the leader and an ordered field list.
//! Each field has either `data` or `subfields`, never both; subfields are
//! single-key objects so that order and repeated codes survive:
//!
//! ```json
//! {
//!   "leader": "00565nM2.01200024      h",
//!   "fields": [
//!     {"tag": "001", "ind": " ", "data": "2415107-5"},
//!     {"tag": "655", "ind": "e", "subfields": [{"u": "http://a"}, {"x": "TOC"}]}
//!   ]
//! }
//! ```
//!
//! Control characters are written as plain JSON string escapes; no markup is
//! involved. Syntax and shape errors are returned as [`MabError::JsonError`].
//! Field-level defects (invalid tags, empty fields) are warnings, as with the
//! other decoders.

use crate::error::{MabError, Result};
use crate::field::{Field, FieldContent, Subfield};
use crate::formats::{FormatReader, FormatWriter};
use crate::record::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::de::IoRead;
use serde_json::{StreamDeserializer, Value};
use std::io::{Read, Write};

/// Serialized shape of one record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JsonRecord {
    leader: String,
    #[serde(default)]
    fields: Vec<JsonField>,
}

/// Serialized shape of one field
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JsonField {
    tag: String,
    #[serde(default = "blank_indicator")]
    ind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subfields: Option<Vec<IndexMap<String, String>>>,
}

fn blank_indicator() -> String {
    " ".to_string()
}

fn shape_error(message: impl std::fmt::Display) -> MabError {
    MabError::JsonError(<serde_json::Error as serde::de::Error>::custom(message))
}

impl From<&Record> for JsonRecord {
    fn from(record: &Record) -> Self {
        let fields = record
            .fields()
            .map(|field| {
                let (data, subfields) = match field.content() {
                    FieldContent::Data(data) => (Some(data.clone()), None),
                    FieldContent::Subfields(subfields) => (
                        None,
                        Some(
                            subfields
                                .iter()
                                .map(|sf| {
                                    let mut pair = IndexMap::with_capacity(1);
                                    pair.insert(sf.code.to_string(), sf.value.clone());
                                    pair
                                })
                                .collect(),
                        ),
                    ),
                };
                JsonField {
                    tag: field.tag().to_string(),
                    ind: field.indicator().to_string(),
                    data,
                    subfields,
                }
            })
            .collect();
        JsonRecord {
            leader: record.leader().to_string(),
            fields,
        }
    }
}

impl JsonField {
    fn into_field(self) -> Result<Field> {
        let mut warnings = Vec::new();
        let content = match (self.data, self.subfields) {
            (Some(data), None) => FieldContent::Data(data),
            (None, Some(objects)) => {
                let mut subfields = smallvec::SmallVec::new();
                for (key, value) in objects.into_iter().flatten() {
                    let mut chars = key.chars();
                    match (chars.next(), chars.next()) {
                        (Some(code), None) => subfields.push(Subfield::new(code, value)),
                        (Some(code), Some(_)) => {
                            warnings.push(format!(
                                "{}: subfield code {key:?} truncated to {code:?}",
                                self.tag
                            ));
                            subfields.push(Subfield::new(code, value));
                        },
                        (None, _) => {
                            warnings.push(format!("{}: subfield without code dropped", self.tag));
                        },
                    }
                }
                FieldContent::Subfields(subfields)
            },
            (Some(_), Some(_)) => {
                return Err(shape_error(format!(
                    "field {:?} has both data and subfields",
                    self.tag
                )))
            },
            (None, None) => {
                return Err(shape_error(format!(
                    "field {:?} has neither data nor subfields",
                    self.tag
                )))
            },
        };
        Ok(Field::decoded(self.tag, &self.ind, content, warnings))
    }
}

impl JsonRecord {
    fn into_record(self) -> Result<Record> {
        let mut record = Record::new(self.leader);
        let fields = self
            .fields
            .into_iter()
            .map(JsonField::into_field)
            .collect::<Result<Vec<_>>>()?;
        for warning in fields.iter().flat_map(Field::warnings) {
            record.add_warning(warning.clone());
        }
        record.append_fields(fields);

        log::debug!(
            "decoded MABjson record {:?} with {} fields",
            record.record_id(),
            record.len()
        );
        if record.has_warnings() {
            log::warn!("MABjson record {:?} decoded with warnings", record.record_id());
        }
        Ok(record)
    }
}

/// Decode one record from a JSON object.
///
/// # Errors
///
/// Returns [`MabError::JsonError`] for invalid JSON, a missing leader, or a
/// field with both or neither of `data` and `subfields`.
///
/// # Examples
///
/// ```
/// use mab2::mabjson;
///
/// let json = r#"{"leader": "00000nM2.01200024      h",
///                "fields": [{"tag": "001", "ind": " ", "data": "2415107-5"}]}"#;
/// let record = mabjson::decode(json)?;
/// assert_eq!(record.record_id(), "2415107-5");
/// # Ok::<(), mab2::MabError>(())
/// ```
pub fn decode(json: &str) -> Result<Record> {
    serde_json::from_str::<JsonRecord>(json)?.into_record()
}

/// Decode one record from an already parsed JSON value.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_value(value: Value) -> Result<Record> {
    serde_json::from_value::<JsonRecord>(value)?.into_record()
}

/// Decode a JSON array of records or a stream of concatenated objects
/// (including JSON Lines).
///
/// # Errors
///
/// Returns the first decode error encountered.
pub fn decode_all(json: &str) -> Result<Vec<Record>> {
    if json.trim_start().starts_with('[') {
        return serde_json::from_str::<Vec<JsonRecord>>(json)?
            .into_iter()
            .map(JsonRecord::into_record)
            .collect();
    }
    serde_json::Deserializer::from_str(json)
        .into_iter::<JsonRecord>()
        .map(|item| item?.into_record())
        .collect()
}

/// Encode a record as a compact JSON object.
///
/// # Errors
///
/// Returns [`MabError::JsonError`] if serialization fails.
pub fn encode(record: &Record) -> Result<String> {
    Ok(serde_json::to_string(&JsonRecord::from(record))?)
}

/// Encode a record as an indented JSON object.
///
/// # Errors
///
/// Returns [`MabError::JsonError`] if serialization fails.
pub fn encode_pretty(record: &Record) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonRecord::from(record))?)
}

/// Convert a record to a [`serde_json::Value`].
///
/// # Errors
///
/// Returns [`MabError::JsonError`] if serialization fails.
pub fn to_value(record: &Record) -> Result<Value> {
    Ok(serde_json::to_value(JsonRecord::from(record))?)
}

/// Streaming reader over concatenated or newline-delimited JSON records.
pub struct MabJsonReader<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, JsonRecord>,
    records_read: usize,
}

impl<R: Read> std::fmt::Debug for MabJsonReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MabJsonReader")
            .field("records_read", &self.records_read)
            .finish_non_exhaustive()
    }
}

impl<R: Read> MabJsonReader<R> {
    /// Create a new reader.
    pub fn new(reader: R) -> Self {
        MabJsonReader {
            stream: serde_json::Deserializer::from_reader(reader).into_iter(),
            records_read: 0,
        }
    }

    /// Read the next record.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::JsonError`] on malformed input.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        match self.stream.next() {
            None => Ok(None),
            Some(item) => {
                let record = item?.into_record()?;
                self.records_read += 1;
                Ok(Some(record))
            },
        }
    }
}

impl<R: Read> FormatReader for MabJsonReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        MabJsonReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// Writer producing JSON Lines, one record object per line.
#[derive(Debug)]
pub struct MabJsonWriter<W: Write> {
    writer: W,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MabJsonWriter<W> {
    /// Create a new writer.
    pub fn new(writer: W) -> Self {
        MabJsonWriter {
            writer,
            records_written: 0,
            finished: false,
        }
    }

    /// Write a single record as one line.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer was already finished, serialization
    /// fails, or an I/O error occurs.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MabError::WriterError(
                "Cannot write to a finished writer".to_string(),
            ));
        }
        serde_json::to_writer(&mut self.writer, &JsonRecord::from(record))?;
        self.writer.write_all(b"\n")?;
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

impl<W: Write + std::fmt::Debug> FormatWriter for MabJsonWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MabJsonWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        MabJsonWriter::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

//! MABxml, the XML serialization of MAB2 published by the Deutsche
//! Nationalbibliothek.
//!
//! ```xml
//! <datensatz xmlns="http://www.ddb.de/professionell/mabxml/mabxml-1.xsd"
//!            typ="h" status="n" mabVersion="M2.0">
//!   <feld nr="001" ind=" ">2415107-5</feld>
//!   <feld nr="542" ind="a"><uf code="a">0012-0413</uf></feld>
//! </datensatz>
//! ```
//!
//! MABxml carries only three leader values (`typ`, `status`, `mabVersion`), so
//! decoded records get a synthetic leader (see [`leader::synthesize`]).
//!
//! MAB2 text may contain control characters that XML 1.0 cannot represent
//! directly. They are written as markup and turned back into characters on
//! decode:
//!
//! | Character | Meaning | Markup |
//! |-----------|---------|--------|
//! | U+0088 / U+0089 | begin / end of non-sorting text | `<ns>` ... `</ns>` |
//! | U+008A / U+008B | begin / end of keyword | `<stw>` ... `</stw>` |
//! | U+001F | subfield separator inside data | `<tf/>` |
//!
//! Element names are matched by local name, so prefixed documents are
//! accepted. Malformed XML is an error; structural defects inside well-formed
//! XML become warnings on the record.

use crate::error::{MabError, Result};
use crate::field::{Field, FieldContent, Subfield};
use crate::formats::{FormatReader, FormatWriter};
use crate::leader::{self, MAB_VERSION, PLACEHOLDER};
use crate::reader::append_decoded;
use crate::record::Record;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use smallvec::SmallVec;
use std::io::{BufRead, Write};

/// MABxml namespace
pub const NAMESPACE: &str = "http://www.ddb.de/professionell/mabxml/mabxml-1.xsd";

/// Begin of non-sorting text
pub const NON_SORTING_BEGIN: char = '\u{88}';
/// End of non-sorting text
pub const NON_SORTING_END: char = '\u{89}';
/// Begin of a keyword
pub const KEYWORD_BEGIN: char = '\u{8A}';
/// End of a keyword
pub const KEYWORD_END: char = '\u{8B}';
/// Subfield separator appearing inside field data
pub const SUBFIELD_MARK: char = '\u{1F}';

const RECORD: &[u8] = b"datensatz";
const FIELD: &[u8] = b"feld";
const SUBFIELD: &[u8] = b"uf";
const NON_SORTING: &[u8] = b"ns";
const KEYWORD: &[u8] = b"stw";
const SEPARATOR: &[u8] = b"tf";

/// Decode every `datensatz` in a document, in document order.
///
/// The records may sit under a `datei` root or be the root themselves.
///
/// # Errors
///
/// Returns [`MabError::XmlError`] if the document is not well-formed.
///
/// # Examples
///
/// ```
/// use mab2::mabxml;
///
/// let xml = r#"<datei>
///   <datensatz typ="h" status="n" mabVersion="M2.0"><feld nr="001" ind=" ">1</feld></datensatz>
///   <datensatz typ="u" status="c" mabVersion="M2.0"><feld nr="001" ind=" ">2</feld></datensatz>
/// </datei>"#;
/// let records = mabxml::decode(xml)?;
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1].record_id(), "2");
/// assert_eq!(records[1].leader(), "     cM2.0             u");
/// # Ok::<(), mab2::MabError>(())
/// ```
pub fn decode(xml: &str) -> Result<Vec<Record>> {
    let mut reader = Reader::from_str(xml);
    let mut state = ParseState::default();
    let mut records = Vec::new();
    loop {
        let event = reader.read_event()?;
        if matches!(event, Event::Eof) {
            break;
        }
        if let Some(record) = state.handle(event)? {
            records.push(record);
        }
    }
    state.finish()?;
    Ok(records)
}

/// Decode the first `datensatz` in a document.
///
/// # Errors
///
/// Returns [`MabError::XmlError`] if the document is not well-formed or holds
/// no record.
pub fn decode_record(xml: &str) -> Result<Record> {
    decode(xml)?
        .into_iter()
        .next()
        .ok_or_else(|| MabError::XmlError("no datensatz element found".to_string()))
}

/// Encode a record as a standalone `datensatz` element.
///
/// # Errors
///
/// Returns [`MabError::XmlError`] if serialization fails.
///
/// # Examples
///
/// ```
/// use mab2::{mabxml, Field, Record};
///
/// let mut record = Record::new("00000nM2.01200024      h");
/// record.append_field(Field::with_data("331", " ", "\u{88}Die \u{89}Blechtrommel")?);
///
/// let xml = mabxml::encode(&record)?;
/// assert!(xml.contains("<ns>Die </ns>Blechtrommel"));
/// # Ok::<(), mab2::MabError>(())
/// ```
pub fn encode(record: &Record) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_datensatz(&mut writer, record)?;
    let xml = String::from_utf8(writer.into_inner())
        .map_err(|e| MabError::XmlError(e.to_string()))?;
    Ok(substitute_control_characters(&xml))
}

fn write_datensatz<W: Write>(writer: &mut Writer<W>, record: &Record) -> Result<()> {
    let placeholder = PLACEHOLDER.to_string();
    let typ = record.record_type().map_or(placeholder.clone(), String::from);
    let status = record.record_status().map_or(placeholder, String::from);

    let datensatz = BytesStart::new("datensatz").with_attributes([
        ("xmlns", NAMESPACE),
        ("typ", typ.as_str()),
        ("status", status.as_str()),
        ("mabVersion", MAB_VERSION),
    ]);
    writer.write_event(Event::Start(datensatz))?;

    for field in record.fields() {
        let indicator = field.indicator().to_string();
        let feld = BytesStart::new("feld")
            .with_attributes([("nr", field.tag()), ("ind", indicator.as_str())]);
        writer.write_event(Event::Start(feld))?;
        match field.content() {
            FieldContent::Data(data) => {
                writer.write_event(Event::Text(BytesText::new(data)))?;
            },
            FieldContent::Subfields(subfields) => {
                for subfield in subfields {
                    let code = subfield.code.to_string();
                    let uf = BytesStart::new("uf").with_attributes([("code", code.as_str())]);
                    writer.write_event(Event::Start(uf))?;
                    writer.write_event(Event::Text(BytesText::new(&subfield.value)))?;
                    writer.write_event(Event::End(BytesEnd::new("uf")))?;
                }
            },
        }
        writer.write_event(Event::End(BytesEnd::new("feld")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("datensatz")))?;
    Ok(())
}

fn substitute_control_characters(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    for c in xml.chars() {
        match c {
            NON_SORTING_BEGIN => out.push_str("<ns>"),
            NON_SORTING_END => out.push_str("</ns>"),
            KEYWORD_BEGIN => out.push_str("<stw>"),
            KEYWORD_END => out.push_str("</stw>"),
            SUBFIELD_MARK => out.push_str("<tf/>"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Default)]
struct PendingField {
    tag: String,
    indicator: String,
    text: String,
    subfields: SmallVec<[Subfield; 4]>,
    warnings: Vec<String>,
}

#[derive(Debug, Default)]
struct PendingSubfield {
    code: String,
    value: String,
}

/// Decoder state for one document walk.
#[derive(Debug, Default)]
struct ParseState {
    record: Option<Record>,
    field: Option<PendingField>,
    subfield: Option<PendingSubfield>,
}

impl ParseState {
    /// Feed one event; returns a record when its `datensatz` closes.
    fn handle(&mut self, event: Event<'_>) -> Result<Option<Record>> {
        match event {
            Event::Start(e) => self.open(&e)?,
            Event::Empty(e) => {
                self.open(&e)?;
                return self.close(e.local_name().as_ref());
            },
            Event::End(e) => return self.close(e.local_name().as_ref()),
            Event::Text(e) => {
                let text = e.unescape()?;
                self.push_text(&text);
            },
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e);
                self.push_text(&text);
            },
            _ => {},
        }
        Ok(None)
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.local_name().as_ref() {
            RECORD => {
                if self.record.is_some() {
                    return Err(MabError::XmlError("nested datensatz element".to_string()));
                }
                let status = attribute(e, "status")?.and_then(|s| s.chars().next());
                let version = attribute(e, "mabVersion")?;
                let typ = attribute(e, "typ")?.and_then(|s| s.chars().next());
                self.record = Some(Record::new(leader::synthesize(
                    status,
                    version.as_deref(),
                    typ,
                )));
            },
            FIELD => {
                self.field = Some(PendingField {
                    tag: attribute(e, "nr")?.unwrap_or_default(),
                    indicator: attribute(e, "ind")?.unwrap_or_else(|| " ".to_string()),
                    ..PendingField::default()
                });
            },
            SUBFIELD => {
                self.subfield = Some(PendingSubfield {
                    code: attribute(e, "code")?.unwrap_or_default(),
                    value: String::new(),
                });
            },
            NON_SORTING => self.push_char(NON_SORTING_BEGIN),
            KEYWORD => self.push_char(KEYWORD_BEGIN),
            SEPARATOR => self.push_char(SUBFIELD_MARK),
            _ => {},
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<Option<Record>> {
        match name {
            RECORD => {
                if let Some(field) = self.field.take() {
                    self.append(field);
                }
                let Some(record) = self.record.take() else {
                    return Ok(None);
                };
                log::debug!(
                    "decoded MABxml record {:?} with {} fields",
                    record.record_id(),
                    record.len()
                );
                if record.has_warnings() {
                    log::warn!("MABxml record {:?} decoded with warnings", record.record_id());
                }
                return Ok(Some(record));
            },
            FIELD => {
                if let Some(field) = self.field.take() {
                    self.append(field);
                }
            },
            SUBFIELD => self.close_subfield(),
            NON_SORTING => self.push_char(NON_SORTING_END),
            KEYWORD => self.push_char(KEYWORD_END),
            _ => {},
        }
        Ok(None)
    }

    fn close_subfield(&mut self) {
        let (Some(subfield), Some(field)) = (self.subfield.take(), self.field.as_mut()) else {
            return;
        };
        let mut chars = subfield.code.chars();
        match (chars.next(), chars.next()) {
            (Some(code), None) => field.subfields.push(Subfield::new(code, subfield.value)),
            (Some(code), Some(_)) => {
                field.warnings.push(format!(
                    "{}: subfield code {:?} truncated to {code:?}",
                    field.tag, subfield.code
                ));
                field.subfields.push(Subfield::new(code, subfield.value));
            },
            (None, _) => field
                .warnings
                .push(format!("{}: subfield without code dropped", field.tag)),
        }
    }

    fn append(&mut self, mut field: PendingField) {
        let Some(record) = self.record.as_mut() else {
            log::warn!("ignoring MABxml field {:?} outside datensatz", field.tag);
            return;
        };
        let content = if field.subfields.is_empty() {
            FieldContent::Data(field.text)
        } else {
            if !field.text.trim().is_empty() {
                field.warnings.push(format!(
                    "{}: text outside subfields ignored",
                    field.tag
                ));
            }
            FieldContent::Subfields(field.subfields)
        };
        append_decoded(
            record,
            Field::decoded(field.tag, &field.indicator, content, field.warnings),
        );
    }

    /// Text goes to the innermost open subfield or field.
    fn push_text(&mut self, text: &str) {
        if let Some(subfield) = self.subfield.as_mut() {
            subfield.value.push_str(text);
        } else if let Some(field) = self.field.as_mut() {
            field.text.push_str(text);
        }
    }

    fn push_char(&mut self, c: char) {
        let mut buf = [0; 4];
        self.push_text(c.encode_utf8(&mut buf));
    }

    /// Check for an unterminated record at end of input.
    fn finish(&self) -> Result<()> {
        if self.record.is_some() {
            return Err(MabError::XmlError(
                "unexpected end of input inside datensatz".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unescaped value of the attribute with the given local name.
fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Streaming reader over a MABxml document.
///
/// Records are returned as each `datensatz` closes, so documents of any size
/// can be processed.
pub struct MabXmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
    state: ParseState,
    records_read: usize,
}

impl<R: BufRead> std::fmt::Debug for MabXmlReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MabXmlReader")
            .field("state", &self.state)
            .field("records_read", &self.records_read)
            .finish_non_exhaustive()
    }
}

impl<R: BufRead> MabXmlReader<R> {
    /// Create a reader over a buffered source.
    pub fn new(reader: R) -> Self {
        MabXmlReader {
            reader: Reader::from_reader(reader),
            buffer: Vec::new(),
            state: ParseState::default(),
            records_read: 0,
        }
    }

    /// Read the next record.
    ///
    /// After an error the partially decoded record is discarded, so a caller
    /// that keeps reading starts from the next `datensatz`.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::XmlError`] on malformed XML.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let result = self.next_record();
        if result.is_err() {
            self.state = ParseState::default();
        }
        result
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buffer.clear();
            let event = self.reader.read_event_into(&mut self.buffer)?;
            if matches!(event, Event::Eof) {
                self.state.finish()?;
                return Ok(None);
            }
            if let Some(record) = self.state.handle(event)? {
                self.records_read += 1;
                return Ok(Some(record));
            }
        }
    }
}

impl<R: BufRead> FormatReader for MabXmlReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        MabXmlReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// Writer producing a MABxml document with a `datei` root.
///
/// The declaration and root start tag are written before the first record;
/// [`finish`](Self::finish) closes the root.
#[derive(Debug)]
pub struct MabXmlWriter<W: Write> {
    writer: W,
    started: bool,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MabXmlWriter<W> {
    /// Create a new writer.
    pub fn new(writer: W) -> Self {
        MabXmlWriter {
            writer,
            started: false,
            records_written: 0,
            finished: false,
        }
    }

    fn start(&mut self) -> Result<()> {
        if !self.started {
            writeln!(self.writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
            writeln!(self.writer, r#"<datei xmlns="{NAMESPACE}">"#)?;
            self.started = true;
        }
        Ok(())
    }

    /// Write a single record.
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
        self.start()?;
        let xml = encode(record)?;
        writeln!(self.writer, "{xml}")?;
        self.records_written += 1;
        Ok(())
    }

    /// Close the document and flush. Further writes are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.start()?;
        writeln!(self.writer, "</datei>")?;
        self.finished = true;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + std::fmt::Debug> FormatWriter for MabXmlWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MabXmlWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        MabXmlWriter::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

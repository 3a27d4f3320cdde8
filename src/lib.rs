#![warn(missing_docs)]

//! # mab2: MAB2 records in Rust
//!
//! A library for reading, writing, and manipulating bibliographic records in
//! MAB2 (Maschinelles Austauschformat für Bibliotheken), the exchange format of
//! German-speaking libraries, in its four serializations: binary MAB2,
//! MAB-Diskette, MABxml and MABjson.
//!
//! ## Quick Start
//!
//! ### Reading Records
//!
//! ```no_run
//! use mab2::MabReader;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("titles.mab")?;
//! let mut reader = MabReader::new(file);
//!
//! while let Some(mut record) = reader.read_record()? {
//!     println!("{}: {}", record.record_id(), record.title());
//!     for warning in record.warnings() {
//!         eprintln!("  {warning}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Building and Writing Records
//!
//! ```
//! use mab2::{Field, MabWriter, Record};
//!
//! let mut record = Record::new("00000nM2.01200024      h");
//! record.append_field(Field::with_data("001", " ", "2415107-5")?);
//! record.append_field(Field::with_data("331", " ", "Die Blechtrommel")?);
//! record.insert_fields_ordered([Field::builder("100", " ").data("Grass, Günter").build()?]);
//!
//! assert_eq!(
//!     record.fields().map(|f| f.tag()).collect::<Vec<_>>(),
//!     vec!["001", "100", "331"]
//! );
//!
//! let mut buffer = Vec::new();
//! MabWriter::new(&mut buffer).write_record(&record)?;
//! # Ok::<(), mab2::MabError>(())
//! ```
//!
//! ### Querying Fields
//!
//! Tag specifications are exact tags or patterns matched against the whole
//! tag (`"33."`, `"[45]42"`):
//!
//! ```
//! use mab2::{Field, Record};
//!
//! let mut record = Record::new("00000nM2.01200024      h");
//! record.append_field(Field::with_data("331", " ", "Titel")?);
//! record.append_field(Field::with_data("335", " ", "Zusatz")?);
//! record.append_field(Field::with_subfields("542", "a", [('a', "0012-0413")])?);
//!
//! assert_eq!(record.field_all(&["33."], None)?.len(), 2);
//! assert_eq!(record.subfield("542", Some('a'), 'a')?, Some("0012-0413"));
//! assert_eq!(record.issn(), "0012-0413");
//! # Ok::<(), mab2::MabError>(())
//! ```
//!
//! ## Modules
//!
//! - [`field`] — Fields and subfields
//! - [`record`] — Records, field handles and tag-pattern queries
//! - [`tag_pattern`] — Tag pattern compilation and the per-record cache
//! - [`leader`] — Views into the 24-character leader
//! - [`reader`] / [`writer`] — Binary MAB2
//! - [`diskette`] — MAB-Diskette
//! - [`mabxml`] — MABxml
//! - [`mabjson`] — MABjson
//! - [`formats`] — Reader/writer traits and format dispatch
//! - [`encoding`] — Character encodings for the byte formats
//! - [`error`] — Error types and result type
//!
//! ## Warnings
//!
//! Decoders are lenient: structural defects are attached to the decoded
//! [`Record`] as warnings (drained by [`Record::warnings`]) and logged through
//! the [`log`] facade. Only malformed XML/JSON, I/O failures and invalid
//! diskette leaders are errors.

pub mod diskette;
pub mod encoding;
pub mod error;
pub mod field;
/// Format-agnostic reader/writer traits and format dispatch.
///
/// See the [`formats`] module documentation for the supported formats.
pub mod formats;
pub mod leader;
pub mod mabjson;
pub mod mabxml;
pub mod reader;
/// Records, field handles and queries
pub mod record;
pub mod tag_pattern;
pub mod writer;

pub use diskette::{DisketteReader, DisketteWriter};
pub use encoding_rs;
pub use error::{MabError, Result};
pub use field::{Field, FieldBuilder, FieldContent, Subfield};
pub use formats::{Format, FormatReader, FormatReaderExt, FormatWriter};
pub use mabjson::{MabJsonReader, MabJsonWriter};
pub use mabxml::{MabXmlReader, MabXmlWriter};
pub use reader::MabReader;
pub use record::{FieldId, Record};
pub use tag_pattern::TagPattern;
pub use writer::MabWriter;

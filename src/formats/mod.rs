//! Format-agnostic access to the MAB2 serializations.
//!
//! All codecs share the [`FormatReader`] and [`FormatWriter`] traits, so
//! records can be read from one serialization and written to another.
//!
//! # Supported Formats
//!
//! | Format | Module | Reader | Writer |
//! |--------|--------|--------|--------|
//! | Binary MAB2 | [`reader`](crate::reader) / [`writer`](crate::writer) | [`MabReader`] | [`MabWriter`] |
//! | MAB-Diskette | [`diskette`](crate::diskette) | [`DisketteReader`] | [`DisketteWriter`] |
//! | MABxml | [`mabxml`](crate::mabxml) | [`MabXmlReader`] | [`MabXmlWriter`] |
//! | MABjson | [`mabjson`](crate::mabjson) | [`MabJsonReader`] | [`MabJsonWriter`] |
//!
//! # Usage
//!
//! ```
//! use mab2::formats::{self, Format, FormatReader, FormatWriter};
//! use std::io::Cursor;
//!
//! let input = b"00049nM2.01200024      h001 2415107-5\x1e331 Titel\x1e\x1d".to_vec();
//! let mut reader = formats::reader_for(Format::Mab2, Cursor::new(input));
//!
//! let mut output = Vec::new();
//! {
//!     let mut writer = formats::writer_for(Format::Json, &mut output);
//!     while let Some(record) = reader.read_record()? {
//!         writer.write_record(&record)?;
//!     }
//!     writer.finish()?;
//! }
//! assert!(String::from_utf8_lossy(&output).contains("2415107-5"));
//! # Ok::<(), mab2::MabError>(())
//! ```

mod traits;

pub use traits::{FormatReader, FormatReaderExt, FormatWriter, RecordIterator};

use crate::diskette::{DisketteReader, DisketteWriter};
use crate::mabjson::{MabJsonReader, MabJsonWriter};
use crate::mabxml::{MabXmlReader, MabXmlWriter};
use crate::reader::MabReader;
use crate::writer::MabWriter;
use std::io::{BufReader, Read, Write};

// ============================================================================
// Format Detection and Dispatch
// ============================================================================

/// The MAB2 serializations this crate reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    /// Binary MAB2 (`.mab`, `.mab2`)
    Mab2,
    /// Line-oriented MAB-Diskette (`.dis`, `.mabdis`)
    Diskette,
    /// MABxml (`.xml`)
    Xml,
    /// MABjson, one object per line (`.json`, `.jsonl`)
    Json,
}

impl Format {
    /// Detect the format from a file extension (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use mab2::formats::Format;
    ///
    /// assert_eq!(Format::from_extension("MAB"), Some(Format::Mab2));
    /// assert_eq!(Format::from_extension("jsonl"), Some(Format::Json));
    /// assert_eq!(Format::from_extension("mrc"), None);
    /// ```
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "mab" | "mab2" => Some(Self::Mab2),
            "dis" | "mabdis" => Some(Self::Diskette),
            "xml" => Some(Self::Xml),
            "json" | "jsonl" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect the format from a file path's extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Mab2 => "mab",
            Self::Diskette => "dis",
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }

    /// Human-readable name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mab2 => "MAB2",
            Self::Diskette => "MAB-Diskette",
            Self::Xml => "MABxml",
            Self::Json => "MABjson",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create a boxed reader for `format` over `source` with default settings.
pub fn reader_for<'a, R>(format: Format, source: R) -> Box<dyn FormatReader + 'a>
where
    R: Read + std::fmt::Debug + 'a,
{
    match format {
        Format::Mab2 => Box::new(MabReader::new(source)),
        Format::Diskette => Box::new(DisketteReader::new(source)),
        Format::Xml => Box::new(MabXmlReader::new(BufReader::new(source))),
        Format::Json => Box::new(MabJsonReader::new(source)),
    }
}

/// Create a boxed writer for `format` over `sink` with default settings.
pub fn writer_for<'a, W>(format: Format, sink: W) -> Box<dyn FormatWriter + 'a>
where
    W: Write + std::fmt::Debug + 'a,
{
    match format {
        Format::Mab2 => Box::new(MabWriter::new(sink)),
        Format::Diskette => Box::new(DisketteWriter::new(sink)),
        Format::Xml => Box::new(MabXmlWriter::new(sink)),
        Format::Json => Box::new(MabJsonWriter::new(sink)),
    }
}

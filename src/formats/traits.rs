//! Reader and writer traits shared by all MAB2 serializations.
//!
//! Every codec module exposes a streaming reader and writer. Implementing
//! these traits lets callers copy records between formats without knowing
//! which serializations are involved.
//!
//! # Example
//!
//! ```
//! use mab2::formats::{FormatReader, FormatWriter};
//!
//! fn convert<R: FormatReader, W: FormatWriter>(
//!     reader: &mut R,
//!     writer: &mut W,
//! ) -> mab2::Result<usize> {
//!     let mut count = 0;
//!     while let Some(record) = reader.read_record()? {
//!         writer.write_record(&record)?;
//!         count += 1;
//!     }
//!     writer.finish()?;
//!     Ok(count)
//! }
//! ```

use crate::error::Result;
use crate::record::Record;

/// A source of MAB2 records.
///
/// Implementations return `Ok(None)` once the source is exhausted. Structural
/// defects in a record are attached to it as warnings; only I/O failures and
/// errors the format declares fatal are returned as `Err`.
pub trait FormatReader: std::fmt::Debug {
    /// Read the next record from the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source fails or the record cannot
    /// be decoded at all.
    fn read_record(&mut self) -> Result<Option<Record>>;

    /// Read all remaining records into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Records read before it are
    /// discarded.
    fn read_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Number of records read so far, if the reader tracks it
    fn records_read(&self) -> Option<usize> {
        None
    }
}

impl<R: FormatReader + ?Sized> FormatReader for Box<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        (**self).read_record()
    }

    fn records_read(&self) -> Option<usize> {
        (**self).records_read()
    }
}

/// A sink for MAB2 records.
///
/// [`finish`](Self::finish) must be called once all records are written;
/// some formats close a document element or flush buffered output there.
pub trait FormatWriter: std::fmt::Debug {
    /// Write a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is finished, the record cannot be
    /// serialized, or writing to the output fails.
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Write several records in order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    fn write_batch(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Finalize and flush the output.
    ///
    /// # Errors
    ///
    /// Returns an error if finalizing or flushing fails.
    fn finish(&mut self) -> Result<()>;

    /// Number of records written so far, if the writer tracks it
    fn records_written(&self) -> Option<usize> {
        None
    }
}

/// Iterator access for any [`FormatReader`].
pub trait FormatReaderExt: FormatReader {
    /// Iterate over the remaining records.
    ///
    /// # Example
    ///
    /// ```
    /// use mab2::formats::FormatReaderExt;
    /// use mab2::MabReader;
    /// use std::io::Cursor;
    ///
    /// let mut reader = MabReader::new(Cursor::new(Vec::new()));
    /// assert_eq!(reader.records().count(), 0);
    /// ```
    fn records(&mut self) -> RecordIterator<'_, Self>
    where
        Self: Sized,
    {
        RecordIterator { reader: self }
    }
}

impl<T: FormatReader> FormatReaderExt for T {}

/// Iterator adapter created by [`FormatReaderExt::records`].
#[derive(Debug)]
pub struct RecordIterator<'a, R: FormatReader> {
    reader: &'a mut R,
}

impl<R: FormatReader> Iterator for RecordIterator<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

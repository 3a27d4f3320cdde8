//! Error types for MAB2 operations.
//!
//! This module provides the [`MabError`] type for all library operations
//! and the [`Result`] convenience type.
//!
//! Two classes of problems exist. Contract violations (an invalid tag passed to
//! a constructor, a subfield query on a data field) are returned as errors.
//! Structural defects found while decoding are attached to the decoded
//! [`Record`](crate::Record) or [`Field`](crate::Field) as warnings instead,
//! with the single exception of the diskette leader check.

use thiserror::Error;

/// Error type for all MAB2 library operations.
#[derive(Error, Debug)]
pub enum MabError {
    /// A field tag that is not three ASCII digits.
    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    /// A non-empty indicator that is not a space or a lowercase letter.
    #[error("Invalid indicator: {0:?}")]
    InvalidIndicator(String),

    /// A field built with neither data nor subfields.
    #[error("Empty field: {0}")]
    EmptyField(String),

    /// An accessor used on the wrong kind of field (subfields on a data field
    /// or data on a subfield field).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A tag pattern that does not compile.
    #[error("Invalid tag pattern {pattern:?}: {message}")]
    InvalidTagPattern {
        /// The pattern as given by the caller
        pattern: String,
        /// Compiler diagnostic
        message: String,
    },

    /// An anchor handle that does not belong to the record's current fields.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// A leader line that fails the diskette leader format check.
    #[error("Invalid leader: {0:?}")]
    InvalidLeader(String),

    /// Malformed MABxml input or an XML writer failure.
    #[error("XML error: {0}")]
    XmlError(String),

    /// Malformed MABjson input or a JSON serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A writer used after it was finished.
    #[error("Writer error: {0}")]
    WriterError(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<quick_xml::Error> for MabError {
    fn from(err: quick_xml::Error) -> Self {
        MabError::XmlError(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for MabError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        MabError::XmlError(err.to_string())
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MabError`].
pub type Result<T> = std::result::Result<T, MabError>;

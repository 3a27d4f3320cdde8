//! MAB2 fields and subfields.
//!
//! A [`Field`] carries a three-digit tag, a one-character indicator and either
//! opaque data or an ordered list of [`Subfield`]s. Unlike MARC, MAB2 does not
//! split fields into control and data ranges by tag: any tag may hold either
//! kind of content, so the kind is stored explicitly in [`FieldContent`].
//!
//! # Examples
//!
//! ```
//! use mab2::Field;
//!
//! let id = Field::with_data("001", " ", "2415107-5")?;
//! assert_eq!(id.data()?, "2415107-5");
//!
//! let issn = Field::builder("542", " ")
//!     .subfield('a', "0012-0413")
//!     .build()?;
//! assert_eq!(issn.subfield('a')?, Some("0012-0413"));
//! # Ok::<(), mab2::MabError>(())
//! ```

use crate::error::{MabError, Result};
use smallvec::SmallVec;

/// Subfield separator as it appears in decoded text.
pub(crate) const SUBFIELD_SEPARATOR: char = '\u{1F}';

/// A subfield within a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

impl Subfield {
    /// Create a subfield from a code and a value
    #[must_use]
    pub fn new(code: char, value: impl Into<String>) -> Self {
        Subfield {
            code,
            value: value.into(),
        }
    }
}

/// Content of a field: opaque data or subfields, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldContent {
    /// Unstructured field data
    Data(String),
    /// Ordered subfields (stored in `SmallVec` to avoid allocation for typical fields)
    Subfields(SmallVec<[Subfield; 4]>),
}

impl FieldContent {
    fn is_empty(&self) -> bool {
        match self {
            FieldContent::Data(data) => data.is_empty(),
            FieldContent::Subfields(subfields) => subfields.is_empty(),
        }
    }
}

/// A field in a MAB2 record
///
/// Equality compares tag, indicator and content. Decode warnings are
/// diagnostic metadata and are ignored.
#[derive(Debug, Clone)]
pub struct Field {
    tag: String,
    indicator: char,
    content: FieldContent,
    warnings: Vec<String>,
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.indicator == other.indicator && self.content == other.content
    }
}

impl Eq for Field {}

/// Returns true for a three-digit numeric tag.
pub(crate) fn is_valid_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.bytes().all(|b| b.is_ascii_digit())
}

/// Returns the indicator character when `indicator` is a single space or
/// lowercase ASCII letter.
fn valid_indicator(indicator: &str) -> Option<char> {
    let mut chars = indicator.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c == ' ' || c.is_ascii_lowercase() => Some(c),
        _ => None,
    }
}

impl Field {
    /// Create a field, enforcing all construction invariants.
    ///
    /// An empty indicator is normalized to a space.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidTag`] if the tag is not three digits,
    /// [`MabError::InvalidIndicator`] for a non-empty indicator that is not a
    /// space or lowercase letter, and [`MabError::EmptyField`] if the content
    /// holds no data and no subfields.
    pub fn new(tag: impl Into<String>, indicator: &str, content: FieldContent) -> Result<Self> {
        let tag = tag.into();
        if !is_valid_tag(&tag) {
            return Err(MabError::InvalidTag(tag));
        }
        let indicator = if indicator.is_empty() {
            ' '
        } else {
            valid_indicator(indicator)
                .ok_or_else(|| MabError::InvalidIndicator(indicator.to_string()))?
        };
        if content.is_empty() {
            return Err(MabError::EmptyField(format!(
                "field {tag} has neither data nor subfields"
            )));
        }
        Ok(Field {
            tag,
            indicator,
            content,
            warnings: Vec::new(),
        })
    }

    /// Create a data field
    ///
    /// # Errors
    ///
    /// See [`Field::new`].
    pub fn with_data(
        tag: impl Into<String>,
        indicator: &str,
        data: impl Into<String>,
    ) -> Result<Self> {
        Field::new(tag, indicator, FieldContent::Data(data.into()))
    }

    /// Create a field from `(code, value)` pairs
    ///
    /// # Errors
    ///
    /// See [`Field::new`].
    pub fn with_subfields<I, V>(
        tag: impl Into<String>,
        indicator: &str,
        subfields: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (char, V)>,
        V: Into<String>,
    {
        let subfields = subfields
            .into_iter()
            .map(|(code, value)| Subfield::new(code, value))
            .collect();
        Field::new(tag, indicator, FieldContent::Subfields(subfields))
    }

    /// Create a builder for constructing fields fluently
    ///
    /// # Examples
    ///
    /// ```
    /// use mab2::Field;
    ///
    /// let field = Field::builder("655", "e")
    ///     .subfield('u', "http://d-nb.info/1012345678/04")
    ///     .subfield('x', "Inhaltsverzeichnis")
    ///     .build()?;
    /// assert_eq!(field.subfields()?.len(), 2);
    /// # Ok::<(), mab2::MabError>(())
    /// ```
    #[must_use]
    pub fn builder(tag: impl Into<String>, indicator: &str) -> FieldBuilder {
        FieldBuilder {
            tag: tag.into(),
            indicator: indicator.to_string(),
            data: None,
            subfields: SmallVec::new(),
        }
    }

    /// Build a field from decoded input without failing.
    ///
    /// Invalid tags are kept, invalid indicators become a space and empty
    /// content is accepted. Each problem is recorded as a warning on the field.
    pub(crate) fn decoded(
        tag: String,
        indicator: &str,
        content: FieldContent,
        mut warnings: Vec<String>,
    ) -> Self {
        if !is_valid_tag(&tag) {
            warnings.push(format!("invalid tag {tag:?}"));
        }
        let indicator = valid_indicator(indicator).unwrap_or_else(|| {
            warnings.push(format!("{tag}: invalid indicator {indicator:?}"));
            ' '
        });
        match &content {
            FieldContent::Data(data) if data.is_empty() => {
                warnings.push(format!("{tag}: no field data found"));
            },
            FieldContent::Subfields(subfields) if subfields.is_empty() => {
                warnings.push(format!("{tag}: no subfield data found"));
            },
            _ => {},
        }
        Field {
            tag,
            indicator,
            content,
            warnings,
        }
    }

    /// Parse the `tag[3] indicator[1] data` grammar shared by the binary and
    /// diskette formats.
    ///
    /// Data that contains the subfield separator is split into subfields;
    /// the first character of every chunk is the code.
    pub(crate) fn from_chunk(chunk: &str) -> Self {
        let tag_end = chunk.char_indices().nth(3).map_or(chunk.len(), |(i, _)| i);
        let tag = chunk[..tag_end].to_string();
        let mut rest = chunk[tag_end..].chars();
        let indicator = rest.next().map(String::from).unwrap_or_default();
        let data = rest.as_str();

        let mut warnings = Vec::new();
        let content = if data.contains(SUBFIELD_SEPARATOR) {
            if !data.starts_with(SUBFIELD_SEPARATOR) {
                warnings.push(format!(
                    "{tag}: subfield data does not start with a subfield separator"
                ));
            }
            FieldContent::Subfields(
                data.split(SUBFIELD_SEPARATOR)
                    .filter_map(|run| {
                        let mut chars = run.chars();
                        chars
                            .next()
                            .map(|code| Subfield::new(code, chars.as_str()))
                    })
                    .collect(),
            )
        } else {
            FieldContent::Data(data.to_string())
        };

        Field::decoded(tag, &indicator, content, warnings)
    }

    /// Field tag (3 digits for any field built through the public constructors)
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Field indicator (a space or a lowercase letter)
    #[must_use]
    pub fn indicator(&self) -> char {
        self.indicator
    }

    /// Raw field content
    #[must_use]
    pub fn content(&self) -> &FieldContent {
        &self.content
    }

    /// True if the field holds opaque data
    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(self.content, FieldContent::Data(_))
    }

    /// True if the field holds subfields
    #[must_use]
    pub fn has_subfields(&self) -> bool {
        matches!(self.content, FieldContent::Subfields(_))
    }

    /// Get all subfields in field order
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidOperation`] on a data field.
    pub fn subfields(&self) -> Result<&[Subfield]> {
        match &self.content {
            FieldContent::Subfields(subfields) => Ok(subfields),
            FieldContent::Data(_) => Err(self.not_subfields()),
        }
    }

    /// Get the first value for a subfield code
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidOperation`] on a data field.
    pub fn subfield(&self, code: char) -> Result<Option<&str>> {
        Ok(self
            .subfields()?
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str()))
    }

    /// Get all values for a subfield code, in field order
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidOperation`] on a data field.
    pub fn subfield_all(&self, code: char) -> Result<Vec<&str>> {
        Ok(self
            .subfields()?
            .iter()
            .filter(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
            .collect())
    }

    /// Get the data of a data field
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidOperation`] on a subfield field.
    pub fn data(&self) -> Result<&str> {
        match &self.content {
            FieldContent::Data(data) => Ok(data),
            FieldContent::Subfields(_) => Err(self.not_data()),
        }
    }

    /// Replace the data of a data field
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidOperation`] on a subfield field.
    pub fn set_data(&mut self, value: impl Into<String>) -> Result<()> {
        if let FieldContent::Data(data) = &mut self.content {
            *data = value.into();
            Ok(())
        } else {
            Err(self.not_data())
        }
    }

    /// Append `(code, value)` pairs, returning how many were appended
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidOperation`] on a data field.
    pub fn add_subfields<I, V>(&mut self, pairs: I) -> Result<usize>
    where
        I: IntoIterator<Item = (char, V)>,
        V: Into<String>,
    {
        let FieldContent::Subfields(subfields) = &mut self.content else {
            return Err(self.not_subfields());
        };
        let before = subfields.len();
        subfields.extend(pairs.into_iter().map(|(code, value)| Subfield::new(code, value)));
        Ok(subfields.len() - before)
    }

    /// Get the field's content as a plain string
    ///
    /// Data fields return their data verbatim. Subfield values are joined with
    /// a single space in field order; with `codes`, only subfields whose code
    /// is listed are included.
    ///
    /// # Examples
    ///
    /// ```
    /// use mab2::Field;
    ///
    /// let pairs = [('a', "Titel"), ('b', "Zusatz"), ('c', "Ende")];
    /// let field = Field::with_subfields("331", " ", pairs)?;
    /// assert_eq!(field.as_string(None), "Titel Zusatz Ende");
    /// assert_eq!(field.as_string(Some(&['c', 'a'])), "Titel Ende");
    /// # Ok::<(), mab2::MabError>(())
    /// ```
    #[must_use]
    pub fn as_string(&self, codes: Option<&[char]>) -> String {
        match &self.content {
            FieldContent::Data(data) => data.clone(),
            FieldContent::Subfields(subfields) => subfields
                .iter()
                .filter(|sf| codes.map_or(true, |codes| codes.contains(&sf.code)))
                .map(|sf| sf.value.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Warnings recorded while this field was decoded
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn not_subfields(&self) -> MabError {
        MabError::InvalidOperation(format!("field {} holds data, not subfields", self.tag))
    }

    fn not_data(&self) -> MabError {
        MabError::InvalidOperation(format!("field {} holds subfields, not data", self.tag))
    }
}

/// Builder for fluently constructing MAB2 fields
///
/// A builder that received `data` produces a data field; otherwise it
/// produces a subfield field. Validation happens in [`FieldBuilder::build`].
#[derive(Debug)]
pub struct FieldBuilder {
    tag: String,
    indicator: String,
    data: Option<String>,
    subfields: SmallVec<[Subfield; 4]>,
}

impl FieldBuilder {
    /// Add a subfield to the field being built
    #[must_use]
    pub fn subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.subfields.push(Subfield::new(code, value));
        self
    }

    /// Set the data of the field being built
    #[must_use]
    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Build the field
    ///
    /// # Errors
    ///
    /// See [`Field::new`]. Supplying both data and subfields is reported as
    /// [`MabError::InvalidOperation`].
    pub fn build(self) -> Result<Field> {
        let content = match (self.data, self.subfields.is_empty()) {
            (Some(data), true) => FieldContent::Data(data),
            (None, _) => FieldContent::Subfields(self.subfields),
            (Some(_), false) => {
                return Err(MabError::InvalidOperation(format!(
                    "field {} cannot hold both data and subfields",
                    self.tag
                )))
            },
        };
        Field::new(self.tag, &self.indicator, content)
    }
}

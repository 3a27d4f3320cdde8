//! Tag pattern matching for field lookups.
//!
//! A tag spec is either an exact three-digit tag (`"331"`) or a small regular
//! expression using `.` wildcards and bracket classes (`"33."`, `"5[0-4]2"`).
//! Patterns always match the whole three-character tag.
//!
//! [`TagPatternCache`] memoizes compiled patterns. Each [`Record`](crate::Record)
//! owns one, so repeated lookups with the same tag spec compile it only once.

use crate::error::{MabError, Result};
use crate::field::is_valid_tag;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

/// A compiled tag spec.
#[derive(Debug, Clone)]
pub enum TagPattern {
    /// Exact three-digit tag, compared without a regex
    Exact(String),
    /// Anchored pattern
    Pattern(Regex),
}

impl TagPattern {
    /// Compile a tag spec.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidTagPattern`] if the tag spec is not a valid
    /// regular expression.
    pub fn compile(spec: &str) -> Result<Self> {
        if is_valid_tag(spec) {
            return Ok(TagPattern::Exact(spec.to_string()));
        }
        Regex::new(&format!("^(?:{spec})$"))
            .map(TagPattern::Pattern)
            .map_err(|e| MabError::InvalidTagPattern {
                pattern: spec.to_string(),
                message: e.to_string(),
            })
    }

    /// Test a tag against the pattern
    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            TagPattern::Exact(exact) => exact == tag,
            TagPattern::Pattern(re) => re.is_match(tag),
        }
    }
}

/// Memoizing cache of compiled tag patterns keyed by the raw tag spec.
#[derive(Debug, Default, Clone)]
pub struct TagPatternCache {
    compiled: RefCell<HashMap<String, TagPattern>>,
}

impl TagPatternCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the compiled pattern for `spec`, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidTagPattern`] if the tag spec does not compile.
    /// Failed specs are not cached.
    pub fn get(&self, spec: &str) -> Result<TagPattern> {
        if let Some(pattern) = self.compiled.borrow().get(spec) {
            return Ok(pattern.clone());
        }
        let pattern = TagPattern::compile(spec)?;
        self.compiled
            .borrow_mut()
            .insert(spec.to_string(), pattern.clone());
        Ok(pattern)
    }

    /// Compile every tag spec, preserving argument order.
    ///
    /// # Errors
    ///
    /// Returns the first compilation error.
    pub fn get_all(&self, specs: &[&str]) -> Result<Vec<TagPattern>> {
        specs.iter().map(|spec| self.get(spec)).collect()
    }

    /// Number of distinct specs compiled so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.borrow().len()
    }

    /// True if nothing has been compiled yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.borrow().is_empty()
    }
}

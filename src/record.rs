//! MAB2 record structure and operations.
//!
//! A [`Record`] is a 24-character leader plus an ordered list of
//! [`Field`]s. Fields live in arena slots and are addressed by [`FieldId`]
//! handles, which stay valid while other fields are inserted or removed. The
//! handles are what the positional insert operations use as anchors, so two
//! fields with identical content are still distinct anchors.
//!
//! # Examples
//!
//! ```
//! use mab2::{Field, Record};
//!
//! let mut record = Record::new("00000nM2.01200024      h");
//! record.append_fields([
//!     Field::with_data("001", " ", "2415107-5")?,
//!     Field::with_data("331", " ", "Die Blechtrommel")?,
//! ]);
//!
//! assert_eq!(record.record_id(), "2415107-5");
//! assert_eq!(record.title(), "Die Blechtrommel");
//!
//! // Patterns with wildcards and bracket classes, optional indicator filter
//! let fields = record.field_all(&["00.", "3[0-3]1"], None)?;
//! assert_eq!(fields.len(), 2);
//! # Ok::<(), mab2::MabError>(())
//! ```

use crate::error::{MabError, Result};
use crate::field::Field;
use crate::leader::{self, LEADER_LENGTH};
use crate::tag_pattern::TagPatternCache;

/// Stable handle to a field inside one [`Record`].
///
/// A handle from a different record is a caller error and is not detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

/// A MAB2 record
///
/// Equality compares the leader and the ordered fields; warnings and the
/// pattern cache are ignored.
#[derive(Debug, Clone, Default)]
pub struct Record {
    leader: String,
    slots: Vec<Option<Field>>,
    order: Vec<FieldId>,
    warnings: Vec<String>,
    patterns: TagPatternCache,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.leader == other.leader && self.fields().eq(other.fields())
    }
}

impl Record {
    /// Create an empty record with the given leader
    ///
    /// A leader that is not 24 characters long is stored with a warning.
    #[must_use]
    pub fn new(leader: impl Into<String>) -> Self {
        let mut record = Record::default();
        record.set_leader(leader);
        record
    }

    /// Get the leader
    #[must_use]
    pub fn leader(&self) -> &str {
        &self.leader
    }

    /// Replace the leader
    ///
    /// The value is stored even when its length is not 24; a warning is
    /// recorded in that case.
    pub fn set_leader(&mut self, leader: impl Into<String>) {
        let leader = leader.into();
        let len = leader.chars().count();
        if len != LEADER_LENGTH {
            self.add_warning(format!(
                "leader length {len} differs from {LEADER_LENGTH}: {leader:?}"
            ));
        }
        self.leader = leader;
    }

    /// Record length field of the leader (positions 0-4)
    #[must_use]
    pub fn record_length(&self) -> &str {
        leader::record_length(&self.leader)
    }

    /// Record status (leader position 5)
    #[must_use]
    pub fn record_status(&self) -> Option<char> {
        leader::record_status(&self.leader)
    }

    /// Record type (last leader character)
    #[must_use]
    pub fn record_type(&self) -> Option<char> {
        leader::record_type(&self.leader)
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over all fields in record order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    /// Iterate over `(handle, field)` pairs in record order
    pub fn fields_with_ids(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.order
            .iter()
            .filter_map(|id| self.get(*id).map(|field| (*id, field)))
    }

    /// Get a field by handle
    #[must_use]
    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Get a mutable field by handle
    pub fn get_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Remove a field, returning it if the handle was live.
    ///
    /// The slot is never reused, so a removed handle stays dead for the life
    /// of the record. Slots are only reclaimed when the record is dropped.
    pub fn remove_field(&mut self, id: FieldId) -> Option<Field> {
        let pos = self.position(id)?;
        self.order.remove(pos);
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    fn alloc(&mut self, field: Field) -> FieldId {
        let id = FieldId(self.slots.len());
        self.slots.push(Some(field));
        id
    }

    fn position(&self, id: FieldId) -> Option<usize> {
        self.order.iter().position(|live| *live == id)
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// Find the first field whose tag matches any of `tags`.
    ///
    /// Each entry is an exact tag or a pattern with `.` wildcards and bracket
    /// classes. With `indicator`, only fields carrying exactly that indicator
    /// match. Fields are scanned in record order.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidTagPattern`] for a pattern that does not compile.
    pub fn field(&self, tags: &[&str], indicator: Option<char>) -> Result<Option<&Field>> {
        let patterns = self.patterns.get_all(tags)?;
        Ok(self.fields().find(|field| {
            indicator_matches(field, indicator) && patterns.iter().any(|p| p.matches(field.tag()))
        }))
    }

    /// Find every field whose tag matches one of `tags`.
    ///
    /// Results are grouped by pattern in argument order, each group in record
    /// order. A field matched by two overlapping patterns appears twice.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidTagPattern`] for a pattern that does not compile.
    pub fn field_all(&self, tags: &[&str], indicator: Option<char>) -> Result<Vec<&Field>> {
        let patterns = self.patterns.get_all(tags)?;
        let mut found = Vec::new();
        for pattern in &patterns {
            found.extend(self.fields().filter(|field| {
                indicator_matches(field, indicator) && pattern.matches(field.tag())
            }));
        }
        Ok(found)
    }

    /// First value of subfield `code` across the fields matching `tag`.
    ///
    /// Data fields among the matches are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidTagPattern`] for a pattern that does not compile.
    pub fn subfield(
        &self,
        tag: &str,
        indicator: Option<char>,
        code: char,
    ) -> Result<Option<&str>> {
        Ok(self.subfield_all(tag, indicator, code)?.into_iter().next())
    }

    /// All values of subfield `code` across the fields matching `tag`, in
    /// record order.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::InvalidTagPattern`] for a pattern that does not compile.
    pub fn subfield_all(
        &self,
        tag: &str,
        indicator: Option<char>,
        code: char,
    ) -> Result<Vec<&str>> {
        Ok(self
            .field_all(&[tag], indicator)?
            .into_iter()
            .filter_map(|field| field.subfield_all(code).ok())
            .flatten()
            .collect())
    }

    // ============================================================================
    // Mutation
    // ============================================================================

    /// Append one field, returning its handle
    pub fn append_field(&mut self, field: Field) -> FieldId {
        let id = self.alloc(field);
        self.order.push(id);
        id
    }

    /// Append fields in order, returning how many were appended
    pub fn append_fields(&mut self, fields: impl IntoIterator<Item = Field>) -> usize {
        fields
            .into_iter()
            .map(|field| self.append_field(field))
            .count()
    }

    /// Insert fields immediately before `anchor`, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::FieldNotFound`] and records a warning if `anchor` is
    /// not one of the record's current fields.
    pub fn insert_fields_before(
        &mut self,
        anchor: FieldId,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<usize> {
        let pos = self.anchor_position(anchor, "insert_fields_before")?;
        Ok(self.splice_at(pos, fields))
    }

    /// Insert fields immediately after `anchor`, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`MabError::FieldNotFound`] and records a warning if `anchor` is
    /// not one of the record's current fields.
    pub fn insert_fields_after(
        &mut self,
        anchor: FieldId,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<usize> {
        let pos = self.anchor_position(anchor, "insert_fields_after")?;
        Ok(self.splice_at(pos + 1, fields))
    }

    /// Insert each field before the first existing field with a numerically
    /// greater or equal tag, or append it if there is none.
    ///
    /// Fields are placed one at a time, so later fields see earlier ones.
    /// Fields with equal tags keep their relative insertion order among the
    /// new fields and are placed ahead of existing fields with that tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use mab2::{Field, Record};
    ///
    /// let mut record = Record::new("00000nM2.01200024      h");
    /// record.insert_fields_ordered([
    ///     Field::with_data("008", " ", "a")?,
    ///     Field::with_data("001", " ", "b")?,
    /// ]);
    /// let tags: Vec<&str> = record.fields().map(|f| f.tag()).collect();
    /// assert_eq!(tags, ["001", "008"]);
    /// # Ok::<(), mab2::MabError>(())
    /// ```
    pub fn insert_fields_ordered(&mut self, fields: impl IntoIterator<Item = Field>) -> usize {
        let mut placed: Vec<FieldId> = Vec::new();
        for field in fields {
            let key = tag_number(field.tag());
            let pos = self
                .order
                .iter()
                .position(|id| {
                    self.get(*id).is_some_and(|existing| {
                        let existing_key = tag_number(existing.tag());
                        existing_key > key || (existing_key == key && !placed.contains(id))
                    })
                })
                .unwrap_or(self.order.len());
            let id = self.alloc(field);
            self.order.insert(pos, id);
            placed.push(id);
        }
        placed.len()
    }

    fn anchor_position(&mut self, anchor: FieldId, operation: &str) -> Result<usize> {
        self.position(anchor).ok_or_else(|| {
            let message = format!("{operation}: anchor {anchor:?} is not a field of this record");
            self.add_warning(message.clone());
            MabError::FieldNotFound(message)
        })
    }

    fn splice_at(&mut self, pos: usize, fields: impl IntoIterator<Item = Field>) -> usize {
        let ids: Vec<FieldId> = fields.into_iter().map(|field| self.alloc(field)).collect();
        let count = ids.len();
        self.order.splice(pos..pos, ids);
        count
    }

    // ============================================================================
    // Derived accessors
    // ============================================================================

    /// Title: the first 331 field as a string, or empty
    #[must_use]
    pub fn title(&self) -> String {
        self.first_as_string("331", None)
    }

    /// Record identifier: the first 001 field as a string, or empty
    #[must_use]
    pub fn record_id(&self) -> String {
        self.first_as_string("001", None)
    }

    /// ISSN: subfield `a` of the first 542 field with subfields, or empty
    #[must_use]
    pub fn issn(&self) -> String {
        self.fields()
            .find(|field| field.tag() == "542" && field.has_subfields())
            .map(|field| field.as_string(Some(&['a'])))
            .unwrap_or_default()
    }

    fn first_as_string(&self, tag: &str, codes: Option<&[char]>) -> String {
        self.fields()
            .find(|field| field.tag() == tag)
            .map(|field| field.as_string(codes))
            .unwrap_or_default()
    }

    // ============================================================================
    // Warnings
    // ============================================================================

    /// Record a warning
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Take all accumulated warnings, leaving the list empty
    pub fn warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// True if warnings are pending
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

fn indicator_matches(field: &Field, indicator: Option<char>) -> bool {
    indicator.map_or(true, |ind| field.indicator() == ind)
}

/// Numeric value of a tag for ordering; invalid tags sort last.
fn tag_number(tag: &str) -> u32 {
    tag.parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEADER: &str = "00000nM2.01200024      h";

    fn data(tag: &str, value: &str) -> Field {
        Field::with_data(tag, " ", value).unwrap()
    }

    fn tags(record: &Record) -> Vec<&str> {
        record.fields().map(Field::tag).collect()
    }

    fn sample() -> Record {
        let mut record = Record::new(LEADER);
        record.append_fields([
            data("001", "2415107-5"),
            data("002", "19980331"),
            Field::with_data("100", "b", "Grass, Günter").unwrap(),
            data("331", "Die Blechtrommel"),
            data("335", "Roman"),
            Field::with_subfields("542", "a", [('a', "0012-0413")]).unwrap(),
            Field::with_subfields("655", "e", [('u', "http://a"), ('x', "TOC")]).unwrap(),
            Field::with_subfields("655", "e", [('u', "http://b")]).unwrap(),
        ]);
        record
    }

    #[test]
    fn test_new_record() {
        let mut record = Record::new(LEADER);
        assert_eq!(record.leader(), LEADER);
        assert!(record.is_empty());
        assert!(record.warnings().is_empty());
    }

    #[test]
    fn test_short_leader_warns_but_is_stored() {
        let mut record = Record::new(LEADER);
        record.set_leader("00000nM2.0");
        assert_eq!(record.leader(), "00000nM2.0");
        let warnings = record.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("leader length 10"));
        // drained
        assert!(record.warnings().is_empty());
    }

    #[test]
    fn test_leader_views() {
        let record = Record::new("00565nM2.01200024      h");
        assert_eq!(record.record_length(), "00565");
        assert_eq!(record.record_status(), Some('n'));
        assert_eq!(record.record_type(), Some('h'));
    }

    #[test]
    fn test_field_exact_and_pattern() {
        let record = sample();
        let title = record.field(&["331"], None).unwrap().unwrap();
        assert_eq!(title.data().unwrap(), "Die Blechtrommel");
        assert_eq!(record.field(&["33."], None).unwrap().unwrap().tag(), "331");
        assert!(record.field(&["999"], None).unwrap().is_none());
        assert_eq!(record.field_all(&["33."], None).unwrap().len(), 2);
    }

    #[test]
    fn test_field_first_mode_uses_record_order() {
        let record = sample();
        let first = record.field(&["331", "00[12]"], None).unwrap().unwrap();
        assert_eq!(first.tag(), "001");
    }

    #[test]
    fn test_field_all_groups_by_pattern() {
        let record = sample();
        let found: Vec<&str> = record
            .field_all(&["33.", "00."], None)
            .unwrap()
            .into_iter()
            .map(Field::tag)
            .collect();
        assert_eq!(found, vec!["331", "335", "001", "002"]);
    }

    #[test]
    fn test_field_all_overlapping_patterns_duplicate() {
        let record = sample();
        let found = record.field_all(&["331", "33."], None).unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].tag(), "331");
        assert_eq!(found[1].tag(), "331");
    }

    #[test]
    fn test_field_indicator_filter() {
        let record = sample();
        assert_eq!(record.field(&["..."], Some('b')).unwrap().unwrap().tag(), "100");
        assert_eq!(record.field_all(&["655"], Some('e')).unwrap().len(), 2);
        assert!(record.field_all(&["655"], Some(' ')).unwrap().is_empty());
    }

    #[test]
    fn test_field_invalid_pattern() {
        let record = sample();
        assert!(matches!(
            record.field(&["[12"], None),
            Err(MabError::InvalidTagPattern { .. })
        ));
    }

    #[test]
    fn test_record_subfield() {
        let record = sample();
        assert_eq!(record.subfield("655", Some('e'), 'u').unwrap(), Some("http://a"));
        assert_eq!(
            record.subfield_all("655", None, 'u').unwrap(),
            vec!["http://a", "http://b"]
        );
        assert_eq!(record.subfield("655", None, 'z').unwrap(), None);
        // data fields are skipped
        assert_eq!(record.subfield_all("...", None, 'x').unwrap(), vec!["TOC"]);
    }

    #[test]
    fn test_derived_accessors() {
        let record = sample();
        assert_eq!(record.record_id(), "2415107-5");
        assert_eq!(record.title(), "Die Blechtrommel");
        assert_eq!(record.issn(), "0012-0413");
    }

    #[test]
    fn test_derived_accessors_absent() {
        let record = Record::new(LEADER);
        assert_eq!(record.record_id(), "");
        assert_eq!(record.title(), "");
        assert_eq!(record.issn(), "");

        let mut record = Record::new(LEADER);
        record.append_field(data("542", "no subfields here"));
        assert_eq!(record.issn(), "");
    }

    #[test]
    fn test_append_fields_count_and_order() {
        let mut record = Record::new(LEADER);
        assert_eq!(record.append_fields([data("331", "a"), data("001", "b")]), 2);
        assert_eq!(tags(&record), vec!["331", "001"]);
        assert_eq!(record.append_fields(Vec::new()), 0);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut record = Record::new(LEADER);
        let first = record.append_field(data("001", "a"));
        let last = record.append_field(data("331", "b"));

        let n = record
            .insert_fields_before(last, [data("100", "c"), data("200", "d")])
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(tags(&record), vec!["001", "100", "200", "331"]);

        record.insert_fields_after(first, [data("002", "e")]).unwrap();
        record.insert_fields_after(last, [data("400", "f")]).unwrap();
        assert_eq!(tags(&record), vec!["001", "002", "100", "200", "331", "400"]);
    }

    #[test]
    fn test_anchor_is_identity_not_value() {
        let mut record = Record::new(LEADER);
        record.append_field(data("331", "same"));
        let second = record.append_field(data("331", "same"));
        record.insert_fields_before(second, [data("100", "x")]).unwrap();
        assert_eq!(tags(&record), vec!["331", "100", "331"]);
    }

    #[test]
    fn test_missing_anchor_errors_and_warns() {
        let mut record = Record::new(LEADER);
        let id = record.append_field(data("001", "a"));
        record.remove_field(id).unwrap();

        let err = record.insert_fields_before(id, [data("331", "b")]).unwrap_err();
        assert!(matches!(err, MabError::FieldNotFound(_)));
        assert!(record.insert_fields_after(id, [data("331", "b")]).is_err());
        assert_eq!(record.warnings().len(), 2);
        assert!(record.is_empty());
    }

    #[test]
    fn test_insert_ordered_into_empty() {
        let mut record = Record::new(LEADER);
        let n = record.insert_fields_ordered([data("008", "a"), data("001", "b")]);
        assert_eq!(n, 2);
        assert_eq!(tags(&record), vec!["001", "008"]);
    }

    #[test]
    fn test_insert_ordered_between_existing() {
        let mut record = Record::new(LEADER);
        record.append_fields([data("001", "a"), data("331", "b"), data("700", "c")]);
        record.insert_fields_ordered([data("100", "d"), data("999", "e"), data("000", "f")]);
        assert_eq!(tags(&record), vec!["000", "001", "100", "331", "700", "999"]);
    }

    #[test]
    fn test_insert_ordered_ties() {
        let mut record = Record::new(LEADER);
        record.append_field(data("331", "old"));
        record.insert_fields_ordered([data("331", "new1"), data("331", "new2")]);
        let values: Vec<&str> = record.fields().map(|f| f.data().unwrap()).collect();
        assert_eq!(values, vec!["new1", "new2", "old"]);
    }

    #[test]
    fn test_insert_ordered_ties_into_empty_record() {
        let mut record = Record::new(LEADER);
        record.insert_fields_ordered([
            data("331", "new1"),
            data("100", "x"),
            data("331", "new2"),
            data("331", "new3"),
        ]);
        let values: Vec<&str> = record.fields().map(|f| f.data().unwrap()).collect();
        assert_eq!(values, vec!["x", "new1", "new2", "new3"]);
    }

    #[test]
    fn test_insert_ordered_ties_across_calls() {
        let mut record = Record::new(LEADER);
        record.insert_fields_ordered([data("331", "a1"), data("331", "a2")]);
        record.insert_fields_ordered([data("331", "b1"), data("331", "b2")]);
        let values: Vec<&str> = record.fields().map(|f| f.data().unwrap()).collect();
        assert_eq!(values, vec!["b1", "b2", "a1", "a2"]);
    }

    #[test]
    fn test_removed_handle_stays_dead_after_inserts() {
        let mut record = Record::new(LEADER);
        let a = record.append_field(data("001", "a"));
        record.remove_field(a).unwrap();
        let b = record.append_field(data("002", "b"));
        assert_ne!(a, b);
        assert!(record.get(a).is_none());
        assert!(record.insert_fields_after(a, [data("003", "c")]).is_err());
        assert_eq!(tags(&record), vec!["002"]);
    }

    #[test]
    fn test_field_all_returns_owned_result() {
        let mut record = Record::new(LEADER);
        record.append_fields([data("001", "a"), data("100", "b"), data("002", "c")]);
        let found = record.field_all(&["00.", "1.."], None).unwrap();
        let values: Vec<&str> = found.iter().map(|f| f.data().unwrap()).collect();
        assert_eq!(values, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_handles_survive_insertion_and_removal() {
        let mut record = Record::new(LEADER);
        let a = record.append_field(data("001", "a"));
        let b = record.append_field(data("331", "b"));
        record.insert_fields_ordered([data("000", "z")]);
        assert_eq!(record.get(a).unwrap().data().unwrap(), "a");

        record.get_mut(b).unwrap().set_data("changed").unwrap();
        assert_eq!(record.title(), "changed");

        assert!(record.remove_field(a).is_some());
        assert!(record.remove_field(a).is_none());
        assert!(record.get(a).is_none());
        assert_eq!(tags(&record), vec!["000", "331"]);
    }

    #[test]
    fn test_fields_with_ids() {
        let mut record = Record::new(LEADER);
        let a = record.append_field(data("001", "a"));
        let b = record.append_field(data("331", "b"));
        let ids: Vec<FieldId> = record.fields_with_ids().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_equality() {
        let mut left = sample();
        let right = sample();
        assert_eq!(left, right);

        left.add_warning("ignored");
        assert_eq!(left, right);

        left.append_field(data("999", "extra"));
        assert_ne!(left, right);
    }
}

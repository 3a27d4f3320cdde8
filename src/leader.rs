//! MAB2 record leader helpers.
//!
//! The MAB2 leader ("Satzkennung") is a 24-character fixed-length string at the
//! start of every record. It is stored verbatim on the [`Record`](crate::Record);
//! this module provides the fixed-offset views into it.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Positions 6-9: Format version (`M2.0`)
//! - Position 10: Indicator length
//! - Position 11: Subfield code length
//! - Positions 12-16: Base address of data
//! - Positions 17-22: Reserved for applications (spaces)
//! - Position 23: Record type

/// Length of a MAB2 leader in characters.
pub const LEADER_LENGTH: usize = 24;

/// Format version written into leaders and MABxml `mabVersion` attributes.
pub const MAB_VERSION: &str = "M2.0";

/// Filler for a missing status or record type.
pub const PLACEHOLDER: char = '-';

/// Filler for the numeric leader positions MABxml does not carry.
pub const NUMERIC_PLACEHOLDER: char = ' ';

fn slice(leader: &str, start: usize, len: usize) -> &str {
    let mut indices = leader.char_indices().map(|(i, _)| i).chain([leader.len()]);
    let begin = indices.nth(start);
    let end = indices.nth(len.saturating_sub(1));
    match (begin, end) {
        (Some(begin), Some(end)) => &leader[begin..end],
        (Some(begin), None) => &leader[begin..],
        _ => "",
    }
}

/// Record length field (positions 0-4), possibly shorter for short leaders
#[must_use]
pub fn record_length(leader: &str) -> &str {
    slice(leader, 0, 5)
}

/// Record status (position 5)
#[must_use]
pub fn record_status(leader: &str) -> Option<char> {
    leader.chars().nth(5)
}

/// Format version (positions 6-9)
#[must_use]
pub fn version(leader: &str) -> &str {
    slice(leader, 6, 4)
}

/// Record type (last character of the leader)
#[must_use]
pub fn record_type(leader: &str) -> Option<char> {
    leader.chars().last()
}

/// Build a leader from the three values MABxml carries.
///
/// The numeric positions (record length and 10-16) are filled with
/// [`NUMERIC_PLACEHOLDER`], which keeps the result a valid diskette leader.
/// A missing status or type becomes [`PLACEHOLDER`]. The
/// application-reserved block (17-22) is filled with spaces.
///
/// # Examples
///
/// ```
/// use mab2::leader;
///
/// let synthetic = leader::synthesize(Some('n'), Some("M2.0"), Some('h'));
/// assert_eq!(synthetic, "     nM2.0             h");
/// assert_eq!(synthetic.len(), leader::LEADER_LENGTH);
/// ```
#[must_use]
pub fn synthesize(
    status: Option<char>,
    version: Option<&str>,
    record_type: Option<char>,
) -> String {
    let version = version
        .filter(|v| v.chars().count() == 4)
        .unwrap_or(MAB_VERSION);
    let mut leader = String::with_capacity(LEADER_LENGTH);
    leader.extend(std::iter::repeat(NUMERIC_PLACEHOLDER).take(5));
    leader.push(status.unwrap_or(PLACEHOLDER));
    leader.push_str(version);
    leader.extend(std::iter::repeat(NUMERIC_PLACEHOLDER).take(7));
    leader.push_str("      ");
    leader.push(record_type.unwrap_or(PLACEHOLDER));
    leader
}

/// Valid record status codes (position 5) with their descriptions.
///
/// These are the codes the diskette leader check accepts.
#[must_use]
pub fn valid_status_codes() -> &'static [(char, &'static str)] {
    &[
        ('c', "Corrected record"),
        ('d', "Deleted record"),
        ('n', "New record"),
        ('p', "Provisional record"),
        ('u', "Updated record"),
    ]
}

/// Description of a record status code, if it is a valid one
#[must_use]
pub fn describe_status(code: char) -> Option<&'static str> {
    valid_status_codes()
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, description)| *description)
}

//! Version-reference expressions
//!
//! Grammar (textual):
//!
//! ```text
//! ref   := point | point ".." point | "*"
//! point := "HEAD" | <uint> | <tagname>
//! ```
//!
//! Parsing yields a [`RefExpr`], which still contains symbolic points
//! (`HEAD`, tags). Resolution against a head version and a tag table turns it
//! into a concrete [`Ref`]. Parsing never resolves: an expression holding
//! `HEAD` means "whatever the head is when this is resolved".

use crate::contract::{TagName, Version, VersionRange, HEAD_KEYWORD};
use crate::error::{GeoError, GeoResult};
use std::fmt;
use std::str::FromStr;

/// Range separator
pub const RANGE_SEPARATOR: &str = "..";

/// "All versions" sentinel
pub const ALL_VERSIONS: &str = "*";

/// One end of a ref: a single symbolic or literal version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefPoint {
    /// Newest committed version at resolution time
    Head,
    /// Literal version number
    Version(Version),
    /// Version a tag points to at resolution time
    Tag(TagName),
}

/// Unresolved version-reference expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefExpr {
    /// A single version
    Point(RefPoint),
    /// Inclusive range; each end resolves independently
    Range(RefPoint, RefPoint),
    /// Every retained version
    All,
}

/// Resolved version reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ref {
    /// Exactly this version (reads are as-of this version)
    Version(Version),
    /// Every version within the range
    Range(VersionRange),
    /// Every retained version
    All,
}

impl RefExpr {
    /// The HEAD expression
    pub const fn head() -> Self {
        RefExpr::Point(RefPoint::Head)
    }

    /// A literal version expression
    pub const fn version(version: Version) -> Self {
        RefExpr::Point(RefPoint::Version(version))
    }
}

impl Default for RefExpr {
    fn default() -> Self {
        RefExpr::head()
    }
}

fn parse_point(raw: &str, whole: &str) -> GeoResult<RefPoint> {
    if raw.eq_ignore_ascii_case(HEAD_KEYWORD) {
        return Ok(RefPoint::Head);
    }
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse::<Version>().map(RefPoint::Version).map_err(|_| {
            GeoError::validation(format!("version number out of range in ref '{}'", whole))
        });
    }
    if raw == ALL_VERSIONS {
        return Err(GeoError::validation(format!(
            "'*' cannot be a range endpoint in ref '{}'",
            whole
        )));
    }
    TagName::new(raw)
        .map(RefPoint::Tag)
        .map_err(|e| GeoError::validation(format!("invalid ref '{}': {}", whole, e)))
}

impl FromStr for RefExpr {
    type Err = GeoError;

    fn from_str(s: &str) -> GeoResult<Self> {
        let text = s.trim();
        if text.is_empty() {
            return Err(GeoError::validation("ref cannot be empty"));
        }
        if text == ALL_VERSIONS {
            return Ok(RefExpr::All);
        }
        match text.split_once(RANGE_SEPARATOR) {
            Some((start, end)) => Ok(RefExpr::Range(
                parse_point(start.trim(), text)?,
                parse_point(end.trim(), text)?,
            )),
            None => Ok(RefExpr::Point(parse_point(text, text)?)),
        }
    }
}

impl fmt::Display for RefPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefPoint::Head => f.write_str(HEAD_KEYWORD),
            RefPoint::Version(v) => write!(f, "{}", v),
            RefPoint::Tag(t) => write!(f, "{}", t),
        }
    }
}

impl fmt::Display for RefExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefExpr::Point(p) => write!(f, "{}", p),
            RefExpr::Range(a, b) => write!(f, "{}{}{}", a, RANGE_SEPARATOR, b),
            RefExpr::All => f.write_str(ALL_VERSIONS),
        }
    }
}

//! Tag name type
//!
//! A tag is a named, mutable alias bound to a version of a space. Tag names
//! share the ref grammar with version numbers, `HEAD` and `*`, so they are
//! validated before they are ever persisted.
//!
//! ## Validation
//!
//! Tag names must:
//! - Be 1-50 characters
//! - Start with an ASCII letter (never a digit, so `12` is always a version)
//! - Not equal `HEAD` in any letter case, nor `*`
//! - Carry no leading or trailing whitespace
//! - Contain only alphanumeric, dash, underscore, dot
//! - Never contain `..`, which would parse as a range

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a tag name
pub const MAX_TAG_NAME_LENGTH: usize = 50;

/// Reserved word naming the newest version
pub const HEAD_KEYWORD: &str = "HEAD";

/// Validated tag name
///
/// ## Examples
///
/// Valid names:
/// - "a"
/// - "release-2024.1"
/// - "a1bc"
///
/// Invalid names:
/// - "" (empty)
/// - "1abc" (starts with a digit)
/// - "HEAD", "head" (reserved)
/// - " abc" (leading whitespace)
/// - "a..b" (range separator)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

/// Error when validating a tag name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagNameError {
    /// Name is empty
    Empty,
    /// Name exceeds maximum length
    TooLong {
        /// Actual length of the name
        length: usize,
        /// Maximum allowed length
        max: usize,
    },
    /// Name has leading or trailing whitespace
    SurroundingWhitespace,
    /// Name is a reserved ref keyword
    Reserved,
    /// Name does not start with a letter
    InvalidStart {
        /// The invalid starting character
        char: char,
    },
    /// Name contains an invalid character
    InvalidChar {
        /// The invalid character
        char: char,
        /// Position of the invalid character
        position: usize,
    },
}

impl fmt::Display for TagNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagNameError::Empty => write!(f, "tag name cannot be empty"),
            TagNameError::TooLong { length, max } => {
                write!(f, "tag name too long: {} chars (max {})", length, max)
            }
            TagNameError::SurroundingWhitespace => {
                write!(f, "tag name cannot have leading or trailing whitespace")
            }
            TagNameError::Reserved => write!(f, "tag name is a reserved ref keyword"),
            TagNameError::InvalidStart { char } => {
                write!(f, "tag name cannot start with '{}' (must start with a letter)", char)
            }
            TagNameError::InvalidChar { char, position } => write!(
                f,
                "invalid character '{}' at position {} (only alphanumeric, dash, underscore, dot allowed)",
                char, position
            ),
        }
    }
}

impl std::error::Error for TagNameError {}

impl TagName {
    /// Create a new TagName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self, TagNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(TagName(name))
    }

    /// Validate a tag name
    pub fn validate(name: &str) -> Result<(), TagNameError> {
        if name.trim().is_empty() {
            return if name.is_empty() {
                Err(TagNameError::Empty)
            } else {
                Err(TagNameError::SurroundingWhitespace)
            };
        }
        if name.trim() != name {
            return Err(TagNameError::SurroundingWhitespace);
        }

        let length = name.chars().count();
        if length > MAX_TAG_NAME_LENGTH {
            return Err(TagNameError::TooLong {
                length,
                max: MAX_TAG_NAME_LENGTH,
            });
        }

        if name == "*" || name.eq_ignore_ascii_case(HEAD_KEYWORD) {
            return Err(TagNameError::Reserved);
        }

        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            if !first.is_ascii_alphabetic() {
                return Err(TagNameError::InvalidStart { char: first });
            }
        }

        let mut prev = None;
        for (pos, ch) in name.chars().enumerate() {
            if !Self::is_valid_char(ch) || (ch == '.' && prev == Some('.')) {
                return Err(TagNameError::InvalidChar {
                    char: ch,
                    position: pos,
                });
            }
            prev = Some(ch);
        }

        Ok(())
    }

    /// Cheap check without constructing the error
    pub fn is_valid(name: &str) -> bool {
        Self::validate(name).is_ok()
    }

    #[inline]
    fn is_valid_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
    }

    /// Get the name as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TagName {
    type Error = TagNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TagName::new(value)
    }
}

impl From<TagName> for String {
    fn from(name: TagName) -> Self {
        name.0
    }
}

impl std::str::FromStr for TagName {
    type Err = TagNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagName::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_tag_names() {
        assert_eq!(TagName::validate(""), Err(TagNameError::Empty));
        assert_eq!(TagName::validate("  "), Err(TagNameError::SurroundingWhitespace));
        assert_eq!(TagName::validate("  abc"), Err(TagNameError::SurroundingWhitespace));
        assert_eq!(TagName::validate("abc "), Err(TagNameError::SurroundingWhitespace));
        assert_eq!(
            TagName::validate("1abc"),
            Err(TagNameError::InvalidStart { char: '1' })
        );
        assert_eq!(TagName::validate("HEAD"), Err(TagNameError::Reserved));
        assert_eq!(TagName::validate("head"), Err(TagNameError::Reserved));
        assert_eq!(TagName::validate("*"), Err(TagNameError::Reserved));
        assert!(matches!(
            TagName::validate("abcdefghijabcdefghijabcdefghijabcdefghijabcdefghijX"),
            Err(TagNameError::TooLong { length: 51, max: 50 })
        ));
        assert!(matches!(
            TagName::validate("a b"),
            Err(TagNameError::InvalidChar { char: ' ', position: 1 })
        ));
        assert_eq!(
            TagName::validate("a..b"),
            Err(TagNameError::InvalidChar { char: '.', position: 2 })
        );
        assert!(!TagName::is_valid("release..HEAD"));
    }

    #[test]
    fn test_valid_tag_names() {
        for name in ["abcdefghij", "a1bc", "abc", "a", "release-2024.1", "v1.2.3", "HEADS"] {
            assert!(TagName::is_valid(name), "{name} should be valid");
        }
        let fifty = "a".repeat(50);
        assert!(TagName::is_valid(&fifty));
    }

    #[test]
    fn test_tag_name_serde_validates() {
        let ok: TagName = serde_json::from_str("\"stable\"").unwrap();
        assert_eq!(ok.as_str(), "stable");
        assert!(serde_json::from_str::<TagName>("\"1x\"").is_err());
    }
}

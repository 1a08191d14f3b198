//! Request-level modification policies
//!
//! - `IfNotExists` governs entries whose feature has no live head
//! - `IfExists` governs entries whose feature has a live head
//! - `ConflictResolution` governs version drift and key-level divergence
//!
//! Policy values parse case-insensitively from their wire names
//! (`CREATE`, `merge`, ...). Anything else is a `ValidationError`.

use crate::error::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Action when the feature has no live head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IfNotExists {
    /// Insert the input as version 1 (or after the tombstone)
    Create,
    /// Reject the entry
    Error,
    /// Succeed without writing
    Retain,
}

/// Action when the feature has a live head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IfExists {
    /// Input replaces content wholesale
    Replace,
    /// Input is a merge-patch applied to head
    Patch,
    /// Three-way merge of base, head and input
    Merge,
    /// Succeed without writing
    Retain,
    /// Reject the entry
    Error,
    /// Commit a tombstone
    Delete,
}

/// How version drift and key-level divergence are settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConflictResolution {
    /// Fail the entry
    Error,
    /// Keep head's state
    Retain,
    /// Defer to the three-way merge; input wins on diverging keys
    Merge,
}

fn parse_policy<T: Copy>(kind: &str, raw: &str, table: &[(&str, T)]) -> GeoResult<T> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw.trim()))
        .map(|(_, value)| *value)
        .ok_or_else(|| GeoError::validation(format!("invalid {} value '{}'", kind, raw)))
}

impl FromStr for IfNotExists {
    type Err = GeoError;

    fn from_str(s: &str) -> GeoResult<Self> {
        parse_policy(
            "ifNotExists",
            s,
            &[
                ("CREATE", IfNotExists::Create),
                ("ERROR", IfNotExists::Error),
                ("RETAIN", IfNotExists::Retain),
            ],
        )
    }
}

impl FromStr for IfExists {
    type Err = GeoError;

    fn from_str(s: &str) -> GeoResult<Self> {
        parse_policy(
            "ifExists",
            s,
            &[
                ("REPLACE", IfExists::Replace),
                ("PATCH", IfExists::Patch),
                ("MERGE", IfExists::Merge),
                ("RETAIN", IfExists::Retain),
                ("ERROR", IfExists::Error),
                ("DELETE", IfExists::Delete),
            ],
        )
    }
}

impl FromStr for ConflictResolution {
    type Err = GeoError;

    fn from_str(s: &str) -> GeoResult<Self> {
        parse_policy(
            "conflictResolution",
            s,
            &[
                ("ERROR", ConflictResolution::Error),
                ("RETAIN", ConflictResolution::Retain),
                ("MERGE", ConflictResolution::Merge),
            ],
        )
    }
}

impl fmt::Display for IfNotExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IfNotExists::Create => "CREATE",
            IfNotExists::Error => "ERROR",
            IfNotExists::Retain => "RETAIN",
        };
        write!(f, "IfNotExists::{}", name)
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IfExists::Replace => "REPLACE",
            IfExists::Patch => "PATCH",
            IfExists::Merge => "MERGE",
            IfExists::Retain => "RETAIN",
            IfExists::Error => "ERROR",
            IfExists::Delete => "DELETE",
        };
        write!(f, "IfExists::{}", name)
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictResolution::Error => "ERROR",
            ConflictResolution::Retain => "RETAIN",
            ConflictResolution::Merge => "MERGE",
        };
        write!(f, "ConflictResolution::{}", name)
    }
}

/// The three policy values governing one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policies {
    /// Applied when no live head exists
    pub if_not_exists: IfNotExists,
    /// Applied when a live head exists
    pub if_exists: IfExists,
    /// Applied on version drift and key-level divergence
    pub conflict_resolution: ConflictResolution,
}

impl Policies {
    /// Build from explicit values
    pub const fn new(
        if_not_exists: IfNotExists,
        if_exists: IfExists,
        conflict_resolution: ConflictResolution,
    ) -> Self {
        Policies {
            if_not_exists,
            if_exists,
            conflict_resolution,
        }
    }

    /// Parse all three from their wire names
    pub fn parse(if_not_exists: &str, if_exists: &str, conflict_resolution: &str) -> GeoResult<Self> {
        Ok(Policies {
            if_not_exists: if_not_exists.parse()?,
            if_exists: if_exists.parse()?,
            conflict_resolution: conflict_resolution.parse()?,
        })
    }
}

impl Default for Policies {
    /// CREATE / PATCH / ERROR, the defaults of a feature POST
    fn default() -> Self {
        Policies::new(IfNotExists::Create, IfExists::Patch, ConflictResolution::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("merge".parse::<IfExists>().unwrap(), IfExists::Merge);
        assert_eq!("DELETE".parse::<IfExists>().unwrap(), IfExists::Delete);
        assert_eq!(" Retain ".parse::<IfNotExists>().unwrap(), IfNotExists::Retain);
        assert_eq!(
            "error".parse::<ConflictResolution>().unwrap(),
            ConflictResolution::Error
        );
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        let err = "UPSERT".parse::<IfExists>().unwrap_err();
        assert_eq!(err.error_code(), "ValidationError");
        assert!(err.to_string().contains("UPSERT"));
        assert!("DELETE".parse::<IfNotExists>().is_err());
        assert!("PATCH".parse::<ConflictResolution>().is_err());
    }

    #[test]
    fn test_policies_parse_and_default() {
        let p = Policies::parse("CREATE", "MERGE", "RETAIN").unwrap();
        assert_eq!(p.if_exists, IfExists::Merge);
        assert_eq!(p.conflict_resolution, ConflictResolution::Retain);

        let d = Policies::default();
        assert_eq!(d.if_not_exists, IfNotExists::Create);
        assert_eq!(d.if_exists, IfExists::Patch);
        assert_eq!(d.conflict_resolution, ConflictResolution::Error);
    }

    #[test]
    fn test_policies_serde_wire_names() {
        let p: Policies = serde_json::from_str(
            r#"{"ifNotExists":"RETAIN","ifExists":"REPLACE","conflictResolution":"MERGE"}"#,
        )
        .unwrap();
        assert_eq!(p.if_not_exists, IfNotExists::Retain);
        assert_eq!(p.if_exists, IfExists::Replace);
        assert_eq!(p.conflict_resolution, ConflictResolution::Merge);
    }
}

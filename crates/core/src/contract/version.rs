//! Version numbers and version ranges
//!
//! Every committed write produces a new immutable version of a feature.
//! Versions are plain integers: 1 for the first commit of a feature id, then
//! strictly +1 per commit, tombstones included. They are assigned by the
//! store at commit time and never taken from a client.

use serde::{Deserialize, Serialize};

/// Version number of a committed feature (always >= 1)
pub type Version = u64;

/// Version a feature gets when it has never been committed
pub const FIRST_VERSION: Version = 1;

/// The version that follows `previous` (`None` = never committed)
#[inline]
pub const fn next_version(previous: Option<Version>) -> Version {
    match previous {
        Some(v) => v + 1,
        None => FIRST_VERSION,
    }
}

/// Inclusive range of versions `[start, end]`
///
/// ## Invariants
///
/// - `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRange {
    start: Version,
    end: Version,
}

impl VersionRange {
    /// Create a range, `None` if `start > end`
    pub fn new(start: Version, end: Version) -> Option<Self> {
        (start <= end).then_some(VersionRange { start, end })
    }

    /// Range covering every possible version
    pub const fn all() -> Self {
        VersionRange {
            start: 0,
            end: Version::MAX,
        }
    }

    /// Range holding exactly one version
    pub const fn single(version: Version) -> Self {
        VersionRange {
            start: version,
            end: version,
        }
    }

    /// First version in the range
    #[inline]
    pub const fn start(&self) -> Version {
        self.start
    }

    /// Last version in the range
    #[inline]
    pub const fn end(&self) -> Version {
        self.end
    }

    /// Whether `version` lies within the range
    #[inline]
    pub const fn contains(&self, version: Version) -> bool {
        self.start <= version && version <= self.end
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

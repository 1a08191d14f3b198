//! Retention policy types
//!
//! Controls how much version history is retained per feature.
//!
//! # Policy Types
//!
//! - **KeepAll**: Keep every version forever
//! - **KeepLast(n)**: Keep only the newest N versions of each feature
//!
//! The newest version of a feature, tombstone or not, is never removed.

use geoversion_core::{GeoError, GeoResult};

/// Retention policy for a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Keep all versions forever
    #[default]
    KeepAll,

    /// Keep only the newest N versions (N >= 1)
    KeepLast(usize),
}

impl RetentionPolicy {
    /// Create a KeepAll policy
    pub fn keep_all() -> Self {
        RetentionPolicy::KeepAll
    }

    /// Create a KeepLast policy
    ///
    /// # Errors
    ///
    /// Returns a validation error if `n` is 0.
    pub fn keep_last(n: usize) -> GeoResult<Self> {
        if n == 0 {
            return Err(GeoError::validation("versions to keep must be at least 1"));
        }
        Ok(RetentionPolicy::KeepLast(n))
    }

    /// Check if a version should be retained
    ///
    /// `rank` is the version's position counted from the newest (newest = 1).
    #[inline]
    pub fn should_retain(&self, rank: usize) -> bool {
        match self {
            RetentionPolicy::KeepAll => true,
            RetentionPolicy::KeepLast(n) => rank <= (*n).max(1),
        }
    }

    /// Get a human-readable summary of the policy
    pub fn summary(&self) -> String {
        match self {
            RetentionPolicy::KeepAll => "KeepAll".to_string(),
            RetentionPolicy::KeepLast(n) => format!("KeepLast({})", n),
        }
    }
}

//! Per-feature version chain
//!
//! Every committed version of a feature id is kept in one chain, newest first.
//! Each entry carries two numbers: the feature's own `version` and the space
//! `revision` it was committed at. Version reads serve conflict bases;
//! revision reads serve refs, which name points in the space's history.
//!
//! # Invariants
//!
//! - Versions are strictly decreasing from front to back
//! - Revisions are non-increasing from front to back (one batch commit may
//!   store several versions of a feature at the same revision)
//! - The chain is never empty once created
//! - Pruning never removes the newest version

use geoversion_core::{Feature, Version, VersionRange};
use std::collections::VecDeque;

use crate::retention::RetentionPolicy;

/// One stored version
#[derive(Debug, Clone)]
struct ChainEntry {
    version: Version,
    revision: Version,
    feature: Feature,
}

/// Version chain of one feature id
///
/// Uses VecDeque for O(1) push_front; repeated updates of the same feature
/// (the optimistic-commit hot path) never shift the history.
#[derive(Debug, Clone)]
pub struct VersionChain {
    versions: VecDeque<ChainEntry>,
}

impl VersionChain {
    /// Create a new chain with a single version
    pub fn new(version: Version, revision: Version, feature: Feature) -> Self {
        let mut versions = VecDeque::with_capacity(4);
        versions.push_front(ChainEntry {
            version,
            revision,
            feature,
        });
        Self { versions }
    }

    /// Add a new version (must be newer than every existing version)
    #[inline]
    pub fn push(&mut self, version: Version, revision: Version, feature: Feature) {
        debug_assert!(
            self.versions
                .front()
                .map_or(true, |head| version > head.version && revision >= head.revision),
            "versions must be pushed in increasing order"
        );
        self.versions.push_front(ChainEntry {
            version,
            revision,
            feature,
        });
    }

    /// Newest version, tombstone or not
    #[inline]
    pub fn latest(&self) -> Option<&Feature> {
        self.versions.front().map(|e| &e.feature)
    }

    /// Version number of the newest entry
    #[inline]
    pub fn head_version(&self) -> Option<Version> {
        self.versions.front().map(|e| e.version)
    }

    /// Whether the newest version is a tombstone
    pub fn is_tombstoned(&self) -> bool {
        self.latest().map_or(false, Feature::is_tombstone)
    }

    /// Newest retained version `<= max_version`
    pub fn get_at_version(&self, max_version: Version) -> Option<&Feature> {
        self.versions
            .iter()
            .find(|e| e.version <= max_version)
            .map(|e| &e.feature)
    }

    /// Newest retained version committed at or before space `revision`
    pub fn get_at_revision(&self, revision: Version) -> Option<&Feature> {
        self.versions
            .iter()
            .find(|e| e.revision <= revision)
            .map(|e| &e.feature)
    }

    /// Retained versions committed at a space revision inside `range`, oldest first
    pub fn revision_range(&self, range: VersionRange) -> Vec<&Feature> {
        self.versions
            .iter()
            .rev()
            .filter(|e| range.contains(e.revision))
            .map(|e| &e.feature)
            .collect()
    }

    /// Drop versions the policy no longer retains; returns how many were removed
    pub fn prune(&mut self, policy: &RetentionPolicy) -> usize {
        // Rank 1 is the newest entry at the front
        let keep = (1..=self.versions.len())
            .take_while(|rank| policy.should_retain(*rank))
            .count()
            .max(1);
        let before = self.versions.len();
        self.versions.truncate(keep);
        before - self.versions.len()
    }

    /// Number of versions stored
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(n: i64) -> Feature {
        Feature::new("F").with_property("n", n)
    }

    /// Chain whose revisions equal its versions
    fn chain_of(versions: &[Version]) -> VersionChain {
        let mut chain = VersionChain::new(versions[0], versions[0], feature(versions[0] as i64));
        for v in &versions[1..] {
            chain.push(*v, *v, feature(*v as i64));
        }
        chain
    }

    #[test]
    fn test_latest_and_head_version() {
        let chain = chain_of(&[1, 2, 3]);
        assert_eq!(chain.head_version(), Some(3));
        assert_eq!(chain.latest().unwrap().property("n"), Some(&json!(3)));
        assert_eq!(chain.version_count(), 3);
        assert!(!chain.is_empty());
    }

    #[test]
    fn test_get_at_version_is_as_of() {
        let chain = chain_of(&[1, 2, 5]);
        assert_eq!(chain.get_at_version(5).unwrap().property("n"), Some(&json!(5)));
        assert_eq!(chain.get_at_version(4).unwrap().property("n"), Some(&json!(2)));
        assert_eq!(chain.get_at_version(100).unwrap().property("n"), Some(&json!(5)));
        assert!(chain.get_at_version(0).is_none());
    }

    #[test]
    fn test_revision_range_is_ascending_and_inclusive() {
        let chain = chain_of(&[1, 2, 3, 4]);
        let got: Vec<_> = chain
            .revision_range(VersionRange::new(2, 3).unwrap())
            .iter()
            .map(|f| f.property("n").cloned())
            .collect();
        assert_eq!(got, vec![Some(json!(2)), Some(json!(3))]);
        assert_eq!(chain.revision_range(VersionRange::all()).len(), 4);
    }

    #[test]
    fn test_revision_reads_follow_space_revisions() {
        // Versions 1..3 of this feature landed at space revisions 4, 9, 9
        let mut chain = VersionChain::new(1, 4, feature(1));
        chain.push(2, 9, feature(2));
        chain.push(3, 9, feature(3));

        assert!(chain.get_at_revision(3).is_none());
        assert_eq!(chain.get_at_revision(8).unwrap().property("n"), Some(&json!(1)));
        assert_eq!(chain.get_at_revision(9).unwrap().property("n"), Some(&json!(3)));
        assert_eq!(chain.revision_range(VersionRange::new(5, 9).unwrap()).len(), 2);
        assert!(chain.revision_range(VersionRange::new(1, 3).unwrap()).is_empty());
    }

    #[test]
    fn test_prune_keeps_newest() {
        let mut chain = chain_of(&[1, 2, 3, 4, 5]);
        assert_eq!(chain.prune(&RetentionPolicy::KeepAll), 0);
        assert_eq!(chain.prune(&RetentionPolicy::keep_last(2).unwrap()), 3);
        assert_eq!(chain.version_count(), 2);
        assert_eq!(chain.head_version(), Some(5));
        assert!(chain.get_at_version(3).is_none());
    }

    #[test]
    fn test_tombstone_detection() {
        let mut chain = chain_of(&[1]);
        assert!(!chain.is_tombstoned());
        let mut dead = Feature::new("F");
        dead.properties.namespace.deleted = true;
        chain.push(2, 2, dead);
        assert!(chain.is_tombstoned());
    }
}

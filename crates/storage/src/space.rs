//! One space: its feature chains, revision counter and tag table
//!
//! Feature versions count the commits of one feature id. The space revision
//! counts every commit in the space: a single-feature commit takes the next
//! revision, a batch commit takes one revision for all of its versions.
//! Tags and refs name revisions, so a tag set before a feature existed never
//! reaches that feature.
//!
//! # Locking
//!
//! - `features`: DashMap; a single-feature commit holds only its entry lock
//! - `commit_gate`: single-feature commits and reads take it shared,
//!   multi-feature batch commits take it exclusive so a batch is applied
//!   (and observed) all at once
//! - `revision`: AtomicU64, bumped while the committing entry lock is held

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use geoversion_core::{
    next_version, BatchCommitOutcome, CommitOutcome, CommitRequest, Feature, GeoResult, SpaceId,
    SpaceStatistics, TagName, Version, VersionRange,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::chain::VersionChain;
use crate::retention::RetentionPolicy;

/// Space configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpaceConfig {
    /// How many versions of each feature are kept
    pub retention: RetentionPolicy,
}

impl SpaceConfig {
    /// Keep the newest `versions_to_keep` versions of each feature
    pub fn with_versions_to_keep(versions_to_keep: usize) -> GeoResult<Self> {
        Ok(SpaceConfig {
            retention: RetentionPolicy::keep_last(versions_to_keep)?,
        })
    }
}

/// Storage for one space
#[derive(Debug)]
pub(crate) struct Space {
    id: SpaceId,
    config: SpaceConfig,
    features: DashMap<String, VersionChain>,
    revision: AtomicU64,
    tags: RwLock<BTreeMap<TagName, Version>>,
    commit_gate: RwLock<()>,
}

impl Space {
    pub(crate) fn new(id: SpaceId, config: SpaceConfig) -> Self {
        Space {
            id,
            config,
            features: DashMap::new(),
            revision: AtomicU64::new(0),
            tags: RwLock::new(BTreeMap::new()),
            commit_gate: RwLock::new(()),
        }
    }

    pub(crate) fn config(&self) -> SpaceConfig {
        self.config
    }

    /// Latest space revision (0 when nothing was ever committed)
    pub(crate) fn head(&self) -> Version {
        self.revision.load(Ordering::Acquire)
    }

    pub(crate) fn get(&self, feature_id: &str, at: Option<Version>) -> Option<Feature> {
        let _gate = self.commit_gate.read();
        let chain = self.features.get(feature_id)?;
        match at {
            None => chain.latest().cloned(),
            Some(max) => chain.get_at_version(max).cloned(),
        }
    }

    pub(crate) fn get_at_revision(&self, feature_id: &str, revision: Version) -> Option<Feature> {
        let _gate = self.commit_gate.read();
        self.features
            .get(feature_id)?
            .get_at_revision(revision)
            .cloned()
    }

    pub(crate) fn history(&self, feature_id: &str, revisions: VersionRange) -> Vec<Feature> {
        let _gate = self.commit_gate.read();
        self.features
            .get(feature_id)
            .map(|chain| chain.revision_range(revisions).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn head_version(&self, feature_id: &str) -> Option<Version> {
        let _gate = self.commit_gate.read();
        self.features.get(feature_id).and_then(|c| c.head_version())
    }

    /// Compare-and-set commit of one feature
    pub(crate) fn commit(&self, request: CommitRequest) -> CommitOutcome {
        let _gate = self.commit_gate.read();
        let CommitRequest {
            feature_id,
            expected_head,
            content,
        } = request;

        match self.features.entry(feature_id) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get().head_version();
                if current != expected_head {
                    return self.head_advanced(occupied.key(), expected_head, current);
                }
                let version = next_version(current);
                let revision = self.next_revision();
                let chain = occupied.get_mut();
                chain.push(version, revision, stamp(content, version));
                chain.prune(&self.config.retention);
                self.committed(occupied.key(), version, revision)
            }
            Entry::Vacant(vacant) => {
                if expected_head.is_some() {
                    return self.head_advanced(vacant.key(), expected_head, None);
                }
                let version = next_version(None);
                let revision = self.next_revision();
                let key = vacant.key().clone();
                vacant.insert(VersionChain::new(version, revision, stamp(content, version)));
                self.committed(&key, version, revision)
            }
        }
    }

    /// All-or-nothing commit of several features
    pub(crate) fn commit_all(&self, requests: Vec<CommitRequest>) -> BatchCommitOutcome {
        let _gate = self.commit_gate.write();

        // Validate the whole batch before touching anything
        let mut tentative: HashMap<&str, Option<Version>> = HashMap::new();
        for (index, request) in requests.iter().enumerate() {
            let current = match tentative.get(request.feature_id.as_str()) {
                Some(head) => *head,
                None => self
                    .features
                    .get(&request.feature_id)
                    .and_then(|c| c.head_version()),
            };
            if current != request.expected_head {
                debug!(
                    target: "geoversion::storage",
                    space = %self.id,
                    index,
                    feature_id = %request.feature_id,
                    ?current,
                    expected = ?request.expected_head,
                    "Batch commit refused, head advanced"
                );
                return BatchCommitOutcome::HeadAdvanced { index, current };
            }
            tentative.insert(&request.feature_id, Some(next_version(current)));
        }
        drop(tentative);

        let revision = self.next_revision();
        let mut versions = Vec::with_capacity(requests.len());
        for request in requests {
            let version = request.next_version();
            let content = stamp(request.content, version);
            match self.features.entry(request.feature_id) {
                Entry::Occupied(mut occupied) => {
                    let chain = occupied.get_mut();
                    chain.push(version, revision, content);
                    chain.prune(&self.config.retention);
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(VersionChain::new(version, revision, content));
                }
            }
            versions.push(version);
        }
        debug!(
            target: "geoversion::storage",
            space = %self.id,
            count = versions.len(),
            revision,
            "Batch committed"
        );
        BatchCommitOutcome::Committed(versions)
    }

    pub(crate) fn statistics(&self) -> SpaceStatistics {
        let _gate = self.commit_gate.read();
        let mut stats = SpaceStatistics {
            revision: self.head(),
            ..SpaceStatistics::default()
        };
        for chain in self.features.iter() {
            stats.max_version = stats.max_version.max(chain.head_version().unwrap_or(0));
            if chain.is_tombstoned() {
                stats.tombstone_count += 1;
            } else {
                stats.feature_count += 1;
            }
        }
        stats
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub(crate) fn put_tag(&self, name: TagName, version: Version) {
        self.tags.write().insert(name, version);
    }

    pub(crate) fn resolve_tag(&self, name: &TagName) -> Option<Version> {
        self.tags.read().get(name).copied()
    }

    pub(crate) fn delete_tag(&self, name: &TagName) -> bool {
        self.tags.write().remove(name).is_some()
    }

    pub(crate) fn tags(&self) -> Vec<(TagName, Version)> {
        self.tags
            .read()
            .iter()
            .map(|(name, version)| (name.clone(), *version))
            .collect()
    }

    fn next_revision(&self) -> Version {
        self.revision.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn committed(&self, feature_id: &str, version: Version, revision: Version) -> CommitOutcome {
        debug!(
            target: "geoversion::storage",
            space = %self.id,
            feature_id,
            version,
            revision,
            "Committed"
        );
        CommitOutcome::Committed(version)
    }

    fn head_advanced(
        &self,
        feature_id: &str,
        expected: Option<Version>,
        current: Option<Version>,
    ) -> CommitOutcome {
        debug!(
            target: "geoversion::storage",
            space = %self.id,
            feature_id,
            ?expected,
            ?current,
            "Commit refused, head advanced"
        );
        CommitOutcome::HeadAdvanced { current }
    }
}

/// The stored version number always comes from the store
fn stamp(mut content: Feature, version: Version) -> Feature {
    content.properties.namespace.version = Some(version);
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> Space {
        Space::new(SpaceId::new("s"), SpaceConfig::default())
    }

    #[test]
    fn test_commit_assigns_sequential_versions() {
        let s = space();
        assert_eq!(
            s.commit(CommitRequest::new(None, Feature::new("F"))),
            CommitOutcome::Committed(1)
        );
        assert_eq!(
            s.commit(CommitRequest::new(Some(1), Feature::new("F"))),
            CommitOutcome::Committed(2)
        );
        assert_eq!(s.head_version("F"), Some(2));
        assert_eq!(s.get("F", None).unwrap().version(), Some(2));
        assert_eq!(s.head(), 2);
    }

    #[test]
    fn test_stale_expected_head_is_refused() {
        let s = space();
        s.commit(CommitRequest::new(None, Feature::new("F")));
        assert_eq!(
            s.commit(CommitRequest::new(None, Feature::new("F"))),
            CommitOutcome::HeadAdvanced { current: Some(1) }
        );
        assert_eq!(
            s.commit(CommitRequest::new(Some(3), Feature::new("G"))),
            CommitOutcome::HeadAdvanced { current: None }
        );
        assert_eq!(s.head_version("F"), Some(1));
        assert_eq!(s.head_version("G"), None);
    }

    #[test]
    fn test_client_version_is_overwritten() {
        let s = space();
        s.commit(CommitRequest::new(None, Feature::new("F").with_base_version(77)));
        assert_eq!(s.get("F", None).unwrap().version(), Some(1));
    }

    #[test]
    fn test_commit_all_chains_same_feature() {
        let s = space();
        let outcome = s.commit_all(vec![
            CommitRequest::new(None, Feature::new("F")),
            CommitRequest::new(Some(1), Feature::new("F")),
            CommitRequest::new(None, Feature::new("G")),
        ]);
        assert_eq!(outcome, BatchCommitOutcome::Committed(vec![1, 2, 1]));
        // One revision for the whole batch
        assert_eq!(s.head(), 1);
        assert_eq!(s.get_at_revision("F", 1).unwrap().version(), Some(2));
    }

    #[test]
    fn test_commit_all_is_all_or_nothing() {
        let s = space();
        s.commit(CommitRequest::new(None, Feature::new("G")));
        let outcome = s.commit_all(vec![
            CommitRequest::new(None, Feature::new("F")),
            CommitRequest::new(None, Feature::new("G")),
        ]);
        assert_eq!(
            outcome,
            BatchCommitOutcome::HeadAdvanced {
                index: 1,
                current: Some(1)
            }
        );
        assert!(s.get("F", None).is_none());
        assert_eq!(s.head_version("G"), Some(1));
    }

    #[test]
    fn test_retention_prunes_history() {
        let s = Space::new(SpaceId::new("s"), SpaceConfig::with_versions_to_keep(2).unwrap());
        let mut head = None;
        for _ in 0..4 {
            if let CommitOutcome::Committed(v) = s.commit(CommitRequest::new(head, Feature::new("F"))) {
                head = Some(v);
            }
        }
        let versions: Vec<_> = s
            .history("F", VersionRange::all())
            .iter()
            .filter_map(Feature::version)
            .collect();
        assert_eq!(versions, vec![3, 4]);
    }

    #[test]
    fn test_statistics_counts_tombstones() {
        let s = space();
        s.commit(CommitRequest::new(None, Feature::new("A")));
        let mut dead = Feature::new("B");
        dead.properties.namespace.deleted = true;
        s.commit(CommitRequest::new(None, dead));
        let stats = s.statistics();
        assert_eq!(stats.feature_count, 1);
        assert_eq!(stats.tombstone_count, 1);
        assert_eq!(stats.max_version, 1);
        assert_eq!(stats.revision, 2);
    }

    #[test]
    fn test_revision_counts_commits_of_every_feature() {
        let s = space();
        s.commit(CommitRequest::new(None, Feature::new("A")));
        s.commit(CommitRequest::new(Some(1), Feature::new("A")));
        assert_eq!(s.head(), 2);

        s.commit(CommitRequest::new(None, Feature::new("B")));
        assert_eq!(s.head(), 3);
        assert!(s.get_at_revision("B", 2).is_none());
        assert_eq!(s.get_at_revision("B", 3).unwrap().version(), Some(1));
        assert_eq!(s.get_at_revision("A", 3).unwrap().version(), Some(2));

        let refused = s.commit(CommitRequest::new(None, Feature::new("B")));
        assert!(matches!(refused, CommitOutcome::HeadAdvanced { .. }));
        assert_eq!(s.head(), 3);
    }
}

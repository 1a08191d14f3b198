//! Collaborator traits for feature storage and tag tables
//!
//! The write path never touches persistence directly. It reads base/head
//! state and commits results through [`FeatureStorage`], and resolves tag
//! names through [`TagStore`]. Implementations must be safe to call from
//! many threads at once (`Send + Sync`).

use crate::contract::{next_version, TagName, Version, VersionRange};
use crate::error::GeoResult;
use crate::feature::{Feature, SpaceId};
use serde::{Deserialize, Serialize};

/// One feature write handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    /// Target feature id
    pub feature_id: String,
    /// Head version the result was computed against (`None` = never committed)
    pub expected_head: Option<Version>,
    /// Fully stamped result content
    pub content: Feature,
}

impl CommitRequest {
    /// Build a request for `content`, keyed by its own id
    pub fn new(expected_head: Option<Version>, content: Feature) -> Self {
        CommitRequest {
            feature_id: content.id.clone(),
            expected_head,
            content,
        }
    }

    /// Version this request produces if it commits
    #[inline]
    pub fn next_version(&self) -> Version {
        next_version(self.expected_head)
    }
}

/// Outcome of a single compare-and-set commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Stored as this new version
    Committed(Version),
    /// Another writer moved head; nothing was written
    HeadAdvanced {
        /// Head version observed by the store
        current: Option<Version>,
    },
}

/// Outcome of an all-or-nothing multi-feature commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchCommitOutcome {
    /// Every request stored; versions in request order
    Committed(Vec<Version>),
    /// Request `index` found head moved; nothing was written
    HeadAdvanced {
        /// Position of the first stale request
        index: usize,
        /// Head version observed by the store for that request
        current: Option<Version>,
    },
}

/// Per-space counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceStatistics {
    /// Features whose head is live
    pub feature_count: usize,
    /// Features whose head is a tombstone
    pub tombstone_count: usize,
    /// Highest feature version in the space (0 when empty)
    pub max_version: Version,
    /// Latest space revision, the value `HEAD` and tags resolve against
    pub revision: Version,
}

/// Storage collaborator for versioned features
///
/// ## Contract
///
/// - `commit` is atomic per (space, feature id): it either stores the content
///   as `next_version(expected_head)` or reports `HeadAdvanced` and writes
///   nothing. Once a commit succeeds, no other commit for the same id can
///   observe the old head.
/// - Version numbers are assigned here, never trusted from the content.
/// - Every commit also advances the space revision: a monotonic counter over
///   all features of the space, never reused. Refs and tags name revisions.
/// - Transient I/O faults surface as `GeoError::StorageUnavailable`.
pub trait FeatureStorage: Send + Sync {
    /// Read a feature version
    ///
    /// `at = None` reads the current head. `at = Some(n)` reads the newest
    /// retained feature version `<= n`. Tombstones are returned as stored;
    /// callers decide what a tombstone means.
    fn get(&self, space: &SpaceId, feature_id: &str, at: Option<Version>)
        -> GeoResult<Option<Feature>>;

    /// The feature as it stood at space revision `revision`
    ///
    /// Returns the newest retained version committed at or before that
    /// revision, `None` if the feature did not exist yet.
    fn get_at_revision(
        &self,
        space: &SpaceId,
        feature_id: &str,
        revision: Version,
    ) -> GeoResult<Option<Feature>>;

    /// Retained versions of a feature committed at a space revision inside
    /// `revisions`, ascending
    fn history(
        &self,
        space: &SpaceId,
        feature_id: &str,
        revisions: VersionRange,
    ) -> GeoResult<Vec<Feature>>;

    /// Current head version of a feature, tombstones included
    fn head_version(&self, space: &SpaceId, feature_id: &str) -> GeoResult<Option<Version>> {
        Ok(self.get(space, feature_id, None)?.and_then(|f| f.version()))
    }

    /// Latest space revision (0 when nothing was committed)
    fn space_head(&self, space: &SpaceId) -> GeoResult<Version>;

    /// Compare-and-set commit of one feature
    fn commit(&self, space: &SpaceId, request: CommitRequest) -> GeoResult<CommitOutcome>;

    /// Commit every request or none
    ///
    /// Requests for the same feature id chain: the second request's expected
    /// head is the version the first one produces.
    fn commit_all(
        &self,
        space: &SpaceId,
        requests: Vec<CommitRequest>,
    ) -> GeoResult<BatchCommitOutcome>;

    /// Live and tombstone counts plus the space revision
    fn statistics(&self, space: &SpaceId) -> GeoResult<SpaceStatistics>;
}

/// A named alias for a space revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Validated name
    pub name: TagName,
    /// Space revision the tag points to
    pub version: Version,
}

/// Tag collaborator
///
/// Tags are mutable: a lookup must always reach the table, never a cache.
pub trait TagStore: Send + Sync {
    /// Create or move a tag
    ///
    /// The name is validated before anything is stored; `version` is a space
    /// revision and may not exceed the latest one.
    fn put_tag(&self, space: &SpaceId, name: &str, version: Version) -> GeoResult<Tag>;

    /// Version a tag points to, `None` when unknown
    fn resolve_tag(&self, space: &SpaceId, name: &TagName) -> GeoResult<Option<Version>>;

    /// Remove a tag; returns whether it existed
    fn delete_tag(&self, space: &SpaceId, name: &TagName) -> GeoResult<bool>;

    /// All tags of a space, ordered by name
    fn list_tags(&self, space: &SpaceId) -> GeoResult<Vec<Tag>>;
}

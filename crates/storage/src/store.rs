//! In-memory versioned feature store
//!
//! Reference implementation of the storage and tag collaborators.
//!
//! # Design
//!
//! - DashMap of spaces: different spaces never contend
//! - Per space, a DashMap of version chains: different features only contend
//!   on shard locks, commits to one feature id are serialized by its entry lock
//! - Version numbers are assigned here at commit time

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use geoversion_core::{
    BatchCommitOutcome, CommitOutcome, CommitRequest, Feature, FeatureStorage, GeoError,
    GeoResult, SpaceId, SpaceStatistics, Tag, TagName, TagStore, Version, VersionRange,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::space::{Space, SpaceConfig};

/// In-memory store of spaces, features and tags
#[derive(Debug, Default)]
pub struct InMemoryStore {
    spaces: DashMap<SpaceId, Arc<Space>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a space
    ///
    /// # Errors
    ///
    /// Returns a validation error if the space already exists.
    pub fn create_space(&self, id: impl Into<SpaceId>, config: SpaceConfig) -> GeoResult<()> {
        let id = id.into();
        match self.spaces.entry(id.clone()) {
            Entry::Occupied(_) => Err(GeoError::validation(format!(
                "space '{}' already exists",
                id
            ))),
            Entry::Vacant(vacant) => {
                info!(
                    target: "geoversion::storage",
                    space = %id,
                    retention = %config.retention.summary(),
                    "Space created"
                );
                vacant.insert(Arc::new(Space::new(id, config)));
                Ok(())
            }
        }
    }

    /// Drop a space and all of its versions and tags; returns whether it existed
    pub fn drop_space(&self, id: &SpaceId) -> bool {
        let removed = self.spaces.remove(id).is_some();
        if removed {
            info!(target: "geoversion::storage", space = %id, "Space dropped");
        }
        removed
    }

    /// Whether a space exists
    pub fn has_space(&self, id: &SpaceId) -> bool {
        self.spaces.contains_key(id)
    }

    /// Configuration of a space
    pub fn space_config(&self, id: &SpaceId) -> GeoResult<SpaceConfig> {
        Ok(self.space(id)?.config())
    }

    /// Ids of every space, sorted
    pub fn space_ids(&self) -> Vec<SpaceId> {
        let mut ids: Vec<SpaceId> = self.spaces.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn space(&self, id: &SpaceId) -> GeoResult<Arc<Space>> {
        self.spaces
            .get(id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| GeoError::not_found(format!("space '{}'", id)))
    }
}

impl FeatureStorage for InMemoryStore {
    fn get(
        &self,
        space: &SpaceId,
        feature_id: &str,
        at: Option<Version>,
    ) -> GeoResult<Option<Feature>> {
        Ok(self.space(space)?.get(feature_id, at))
    }

    fn get_at_revision(
        &self,
        space: &SpaceId,
        feature_id: &str,
        revision: Version,
    ) -> GeoResult<Option<Feature>> {
        Ok(self.space(space)?.get_at_revision(feature_id, revision))
    }

    fn history(
        &self,
        space: &SpaceId,
        feature_id: &str,
        revisions: VersionRange,
    ) -> GeoResult<Vec<Feature>> {
        Ok(self.space(space)?.history(feature_id, revisions))
    }

    fn head_version(&self, space: &SpaceId, feature_id: &str) -> GeoResult<Option<Version>> {
        Ok(self.space(space)?.head_version(feature_id))
    }

    fn space_head(&self, space: &SpaceId) -> GeoResult<Version> {
        Ok(self.space(space)?.head())
    }

    fn commit(&self, space: &SpaceId, request: CommitRequest) -> GeoResult<CommitOutcome> {
        Ok(self.space(space)?.commit(request))
    }

    fn commit_all(
        &self,
        space: &SpaceId,
        requests: Vec<CommitRequest>,
    ) -> GeoResult<BatchCommitOutcome> {
        let space = self.space(space)?;
        if requests.is_empty() {
            return Ok(BatchCommitOutcome::Committed(Vec::new()));
        }
        Ok(space.commit_all(requests))
    }

    fn statistics(&self, space: &SpaceId) -> GeoResult<SpaceStatistics> {
        Ok(self.space(space)?.statistics())
    }
}

impl TagStore for InMemoryStore {
    fn put_tag(&self, space: &SpaceId, name: &str, version: Version) -> GeoResult<Tag> {
        let name = TagName::new(name)
            .map_err(|e| GeoError::validation(format!("invalid tag name '{}': {}", name, e)))?;
        let space_ref = self.space(space)?;
        let head = space_ref.head();
        if version > head {
            return Err(GeoError::validation(format!(
                "tag '{}' cannot point to revision {} beyond space head {}",
                name, version, head
            )));
        }
        space_ref.put_tag(name.clone(), version);
        debug!(target: "geoversion::storage", space = %space, tag = %name, version, "Tag set");
        Ok(Tag { name, version })
    }

    fn resolve_tag(&self, space: &SpaceId, name: &TagName) -> GeoResult<Option<Version>> {
        Ok(self.space(space)?.resolve_tag(name))
    }

    fn delete_tag(&self, space: &SpaceId, name: &TagName) -> GeoResult<bool> {
        let removed = self.space(space)?.delete_tag(name);
        if removed {
            debug!(target: "geoversion::storage", space = %space, tag = %name, "Tag deleted");
        }
        Ok(removed)
    }

    fn list_tags(&self, space: &SpaceId) -> GeoResult<Vec<Tag>> {
        Ok(self
            .space(space)?
            .tags()
            .into_iter()
            .map(|(name, version)| Tag { name, version })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(space: &str) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.create_space(space, SpaceConfig::default()).unwrap();
        store
    }

    #[test]
    fn test_unknown_space_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get(&SpaceId::new("nope"), "F", None).unwrap_err();
        assert_eq!(err.error_code(), "NotFound");
    }

    #[test]
    fn test_duplicate_space_rejected() {
        let store = store_with("s");
        assert!(store.create_space("s", SpaceConfig::default()).is_err());
        assert!(store.drop_space(&SpaceId::new("s")));
        assert!(!store.has_space(&SpaceId::new("s")));
    }

    #[test]
    fn test_tags_validate_name_and_version() {
        let store = store_with("s");
        let space = SpaceId::new("s");
        store
            .commit(&space, CommitRequest::new(None, Feature::new("F")))
            .unwrap();

        assert_eq!(store.put_tag(&space, "stable", 1).unwrap().version, 1);
        assert_eq!(
            store.put_tag(&space, "1abc", 1).unwrap_err().error_code(),
            "ValidationError"
        );
        assert_eq!(
            store.put_tag(&space, "head", 1).unwrap_err().error_code(),
            "ValidationError"
        );
        assert_eq!(
            store.put_tag(&space, "future", 2).unwrap_err().error_code(),
            "ValidationError"
        );
        assert_eq!(
            store.put_tag(&space, "a..b", 1).unwrap_err().error_code(),
            "ValidationError"
        );

        let stable = TagName::new("stable").unwrap();
        assert_eq!(store.resolve_tag(&space, &stable).unwrap(), Some(1));
        assert_eq!(store.list_tags(&space).unwrap().len(), 1);
        assert!(store.delete_tag(&space, &stable).unwrap());
        assert_eq!(store.resolve_tag(&space, &stable).unwrap(), None);
    }

    #[test]
    fn test_space_head_counts_every_commit() {
        let store = store_with("s");
        let space = SpaceId::new("s");
        store
            .commit(&space, CommitRequest::new(None, Feature::new("A")))
            .unwrap();
        store
            .commit(&space, CommitRequest::new(Some(1), Feature::new("A")))
            .unwrap();
        store
            .commit(&space, CommitRequest::new(None, Feature::new("B")))
            .unwrap();
        assert_eq!(store.space_head(&space).unwrap(), 3);
        assert_eq!(store.statistics(&space).unwrap().max_version, 2);
    }
}

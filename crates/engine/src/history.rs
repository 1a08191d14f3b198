//! Version history reads
//!
//! `HistoryReader` answers "which versions of this feature match this ref".
//! Refs name space revisions: `HEAD` is the latest revision, a number is a
//! revision, a tag maps to one. The ref text is parsed and resolved on every
//! call against the revision read from storage at that moment, so `1..HEAD`
//! grows as versions are committed. Tags are looked up in the tag store on
//! every call as well.

use std::sync::Arc;

use geoversion_concurrency::{RefResolver, RefUsage};
use geoversion_core::{
    clamp_history_limit, Feature, FeatureStorage, GeoError, GeoResult, Ref, SpaceId,
    SpaceStatistics, TagStore, VersionRange,
};

/// Optional filters of a history read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Keep only versions written by this author
    pub author: Option<String>,
    /// Maximum number of versions returned (clamped)
    pub limit: Option<usize>,
}

impl HistoryQuery {
    /// Query without filters
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only versions written by `author`
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Cap the number of versions returned
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Reads feature versions by ref
pub struct HistoryReader {
    storage: Arc<dyn FeatureStorage>,
    tags: Arc<dyn TagStore>,
    default_limit: usize,
}

impl HistoryReader {
    /// Reader over `storage`, resolving tags through `tags`
    pub fn new(
        storage: Arc<dyn FeatureStorage>,
        tags: Arc<dyn TagStore>,
        default_limit: usize,
    ) -> Self {
        HistoryReader {
            storage,
            tags,
            default_limit,
        }
    }

    /// Versions of `feature_id` selected by `ref_text`, ascending by version
    ///
    /// - a single revision is an as-of read: the feature as it stood at that
    ///   revision, `NotFound` when it did not exist yet or was deleted
    /// - a range or `*` returns every retained version committed inside it,
    ///   tombstones included; an empty result is not an error
    ///
    /// Author filtering applies before the limit; the limit keeps the oldest
    /// matching versions.
    pub fn read(
        &self,
        space: &SpaceId,
        feature_id: &str,
        ref_text: &str,
        query: &HistoryQuery,
    ) -> GeoResult<Vec<Feature>> {
        let resolved = self.resolve(space, ref_text)?;
        let versions = match resolved {
            Ref::Version(revision) => {
                let found = self.at_revision(space, feature_id, revision)?.ok_or_else(|| {
                    GeoError::not_found(format!(
                        "feature '{}' at revision {} in space '{}'",
                        feature_id, revision, space
                    ))
                })?;
                vec![found]
            }
            Ref::Range(range) => self.storage.history(space, feature_id, range)?,
            Ref::All => self.storage.history(space, feature_id, VersionRange::all())?,
        };
        Ok(self.filter(versions, query))
    }

    /// Versions of several features selected by one ref
    ///
    /// The ref is resolved once, so every feature is read at the same point
    /// of the space's history. Features in `feature_ids` order; a feature that
    /// did not exist at a single revision is left out rather than failing the
    /// read. Author filter and limit apply to the combined result.
    pub fn read_many(
        &self,
        space: &SpaceId,
        feature_ids: &[&str],
        ref_text: &str,
        query: &HistoryQuery,
    ) -> GeoResult<Vec<Feature>> {
        let resolved = self.resolve(space, ref_text)?;
        let mut versions = Vec::new();
        for &feature_id in feature_ids {
            match resolved {
                Ref::Version(revision) => {
                    versions.extend(self.at_revision(space, feature_id, revision)?)
                }
                Ref::Range(range) => versions.extend(self.storage.history(space, feature_id, range)?),
                Ref::All => {
                    versions.extend(self.storage.history(space, feature_id, VersionRange::all())?)
                }
            }
        }
        Ok(self.filter(versions, query))
    }

    /// Live and tombstone counts plus the space revision
    pub fn statistics(&self, space: &SpaceId) -> GeoResult<SpaceStatistics> {
        self.storage.statistics(space)
    }

    fn resolve(&self, space: &SpaceId, ref_text: &str) -> GeoResult<Ref> {
        let head = self.storage.space_head(space)?;
        RefResolver::new(self.tags.as_ref()).resolve_str(space, ref_text, head, RefUsage::Query)
    }

    /// Live feature at `revision`; tombstones read as absent
    fn at_revision(
        &self,
        space: &SpaceId,
        feature_id: &str,
        revision: u64,
    ) -> GeoResult<Option<Feature>> {
        Ok(self
            .storage
            .get_at_revision(space, feature_id, revision)?
            .filter(|f| !f.is_tombstone()))
    }

    fn filter(&self, versions: Vec<Feature>, query: &HistoryQuery) -> Vec<Feature> {
        let limit = clamp_history_limit(query.limit, self.default_limit);
        versions
            .into_iter()
            .filter(|f| match &query.author {
                Some(author) => f.namespace().author.as_deref() == Some(author.as_str()),
                None => true,
            })
            .take(limit)
            .collect()
    }
}

//! Engine: the write path and read path of one feature store
//!
//! Owns the in-memory store and wires it to the batch coordinator and the
//! history reader. Spaces, tags and statistics are managed here too.
//!
//! # Example
//!
//! ```ignore
//! let engine = Engine::open("/var/lib/geoversion")?;
//! let space = engine.create_space("buildings", None)?;
//! let response = engine.write(
//!     &BatchRequest::new(space.clone(), "alice").feature(Feature::new("b1")),
//! )?;
//! let history = engine.read(&space, "b1", "*", &HistoryQuery::new())?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use geoversion_core::{
    Clock, Feature, FeatureStorage, GeoError, GeoResult, SpaceId, SpaceStatistics, SystemClock,
    Tag, TagName, TagStore,
};
use geoversion_storage::{InMemoryStore, SpaceConfig};
use tracing::info;

use crate::config::{EngineConfig, CONFIG_FILE_NAME};
use crate::coordinator::{BatchCoordinator, BatchMetrics, BatchRequest, BatchResponse};
use crate::history::{HistoryQuery, HistoryReader};

/// A feature store with its write and read paths
pub struct Engine {
    store: Arc<InMemoryStore>,
    coordinator: BatchCoordinator,
    history: HistoryReader,
    config: EngineConfig,
    data_dir: Option<PathBuf>,
}

impl Engine {
    /// Engine with an explicit configuration and wall-clock time
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is out of range.
    pub fn new(config: EngineConfig) -> GeoResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Engine with an explicit configuration and clock
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> GeoResult<Self> {
        config.validate()?;
        let store = Arc::new(InMemoryStore::new());
        let storage: Arc<dyn FeatureStorage> = store.clone();
        let tags: Arc<dyn TagStore> = store.clone();
        Ok(Engine {
            coordinator: BatchCoordinator::with_clock(Arc::clone(&storage), config.clone(), clock),
            history: HistoryReader::new(storage, tags, config.history_limit),
            store,
            config,
            data_dir: None,
        })
    }

    /// Open an engine configured by `geoversion.toml` in `dir`
    ///
    /// The directory is created if needed. A commented default config is
    /// written when none exists.
    pub fn open(dir: impl AsRef<Path>) -> GeoResult<Self> {
        let data_dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            GeoError::internal(format!(
                "Failed to create data directory '{}': {}",
                data_dir.display(),
                e
            ))
        })?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        EngineConfig::write_default_if_missing(&config_path)?;
        let config = EngineConfig::from_file(&config_path)?;

        let mut engine = Self::new(config)?;
        info!(
            target: "geoversion::storage",
            path = %data_dir.display(),
            parallel = engine.config.parallel,
            max_commit_retries = engine.config.max_commit_retries,
            "Engine opened"
        );
        engine.data_dir = Some(data_dir);
        Ok(engine)
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Directory the config was loaded from, if opened from disk
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    /// Coordinator counters
    pub fn metrics(&self) -> BatchMetrics {
        self.coordinator.metrics()
    }

    // ========================================================================
    // Spaces
    // ========================================================================

    /// Create a space keeping `versions_to_keep` versions per feature
    ///
    /// `None` uses `default_versions_to_keep` from the configuration.
    pub fn create_space(
        &self,
        id: impl Into<SpaceId>,
        versions_to_keep: Option<usize>,
    ) -> GeoResult<SpaceId> {
        let id = id.into();
        let config = SpaceConfig::with_versions_to_keep(
            versions_to_keep.unwrap_or(self.config.default_versions_to_keep),
        )?;
        self.store.create_space(id.clone(), config)?;
        Ok(id)
    }

    /// Remove a space and everything in it; returns whether it existed
    pub fn drop_space(&self, id: &SpaceId) -> bool {
        self.store.drop_space(id)
    }

    /// Live and tombstone counts plus the space revision
    pub fn statistics(&self, space: &SpaceId) -> GeoResult<SpaceStatistics> {
        self.history.statistics(space)
    }

    // ========================================================================
    // Writes and reads
    // ========================================================================

    /// Execute a write request
    pub fn write(&self, request: &BatchRequest) -> GeoResult<BatchResponse> {
        self.coordinator.execute(request)
    }

    /// Versions of a feature selected by a ref (`HEAD`, `3`, `stable`, `1..HEAD`, `*`)
    pub fn read(
        &self,
        space: &SpaceId,
        feature_id: &str,
        ref_text: &str,
        query: &HistoryQuery,
    ) -> GeoResult<Vec<Feature>> {
        self.history.read(space, feature_id, ref_text, query)
    }

    /// Versions of several features selected by one ref, resolved once
    pub fn read_many(
        &self,
        space: &SpaceId,
        feature_ids: &[&str],
        ref_text: &str,
        query: &HistoryQuery,
    ) -> GeoResult<Vec<Feature>> {
        self.history.read_many(space, feature_ids, ref_text, query)
    }

    /// Latest space revision, the point a new tag usually names
    pub fn revision(&self, space: &SpaceId) -> GeoResult<u64> {
        self.store.space_head(space)
    }

    /// Live head of a feature; `None` when never written or deleted
    pub fn head(&self, space: &SpaceId, feature_id: &str) -> GeoResult<Option<Feature>> {
        Ok(self
            .store
            .get(space, feature_id, None)?
            .filter(|f| !f.is_tombstone()))
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Create or move a tag to space revision `revision`
    pub fn tag(&self, space: &SpaceId, name: &str, revision: u64) -> GeoResult<Tag> {
        self.store.put_tag(space, name, revision)
    }

    /// Remove a tag; returns whether it existed
    pub fn untag(&self, space: &SpaceId, name: &str) -> GeoResult<bool> {
        let name = TagName::new(name).map_err(|e| GeoError::validation(e.to_string()))?;
        self.store.delete_tag(space, &name)
    }

    /// All tags of a space, ordered by name
    pub fn tags(&self, space: &SpaceId) -> GeoResult<Vec<Tag>> {
        self.store.list_tags(space)
    }
}

//! geoversion - write path of a versioned, multi-tenant feature store
//!
//! Clients submit batches of feature mutations against named spaces. Every
//! successful write produces a new immutable version; concurrent writers are
//! reconciled by policy-driven classification, version-drift detection and
//! a three-way merge.
//!
//! # Quick Start
//!
//! ```ignore
//! use geoversion::{BatchRequest, Engine, EngineConfig, Feature, HistoryQuery};
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! let space = engine.create_space("roads", None)?;
//!
//! engine.write(
//!     &BatchRequest::new(space.clone(), "alice")
//!         .feature(Feature::new("r1").with_property("lanes", 2)),
//! )?;
//!
//! let versions = engine.read(&space, "r1", "1..HEAD", &HistoryQuery::new())?;
//! ```
//!
//! # Architecture
//!
//! - `geoversion-core`: data model, policies, refs, errors, collaborator traits
//! - `geoversion-storage`: in-memory versioned store and tag table
//! - `geoversion-concurrency`: pure per-entry planning (classify, detect, merge, stamp)
//! - `geoversion-engine`: batches, retries, deadline, history reads, config

pub use geoversion_concurrency::{Action, Entry, RefResolver, RefUsage};
pub use geoversion_core::{
    ConflictResolution, Feature, GeoError, GeoResult, IfExists, IfNotExists, Namespace,
    Policies, Ref, RefExpr, SpaceId, SpaceStatistics, Tag, TagName, Version, VersionRange,
};
pub use geoversion_engine::{
    BatchCoordinator, BatchMetrics, BatchRequest, BatchResponse, Engine, EngineConfig,
    EntryResult, HistoryQuery, HistoryReader,
};
pub use geoversion_storage::{InMemoryStore, RetentionPolicy, SpaceConfig};

//! Core types and traits for geoversion
//!
//! This crate defines the foundational types used throughout the write path:
//! - Feature, Namespace, SpaceId: the versioned feature data model
//! - Policies: IfNotExists / IfExists / ConflictResolution
//! - RefExpr / Ref: version-reference expressions and their resolved form
//! - Contract types: Version, VersionRange, Timestamp, Clock, TagName
//! - GeoError: the error taxonomy
//! - Traits: storage and tag collaborators (FeatureStorage, TagStore)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod feature;
pub mod limits;
pub mod policy;
pub mod reference;
pub mod traits;

pub use contract::{
    next_version, Clock, ManualClock, SystemClock, TagName, TagNameError, Timestamp, Version,
    VersionRange, FIRST_VERSION, HEAD_KEYWORD, MAX_TAG_NAME_LENGTH,
};
pub use error::{GeoError, GeoResult};
pub use feature::{Feature, Geometry, HeadState, Namespace, Properties, SpaceId, NAMESPACE_KEY};
pub use limits::{clamp_history_limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use policy::{ConflictResolution, IfExists, IfNotExists, Policies};
pub use reference::{Ref, RefExpr, RefPoint};
pub use traits::{
    BatchCommitOutcome, CommitOutcome, CommitRequest, FeatureStorage, SpaceStatistics, Tag,
    TagStore,
};

//! Concurrency layer for geoversion
//!
//! This crate implements the optimistic write pipeline for one entry:
//! - RefResolver: HEAD / version / tag / range / `*` resolution
//! - EntryClassifier: exhaustive (head state × policy) decision table
//! - ConflictDetector: declared-base vs head version drift
//! - Replacer / Patcher / Merger: result construction
//! - NamespaceManager: engine-owned metadata stamping
//! - EntryPlanner: the pure composition of all of the above
//!
//! Everything here is a pure function of immutable snapshots. Reading
//! snapshots and committing plans is the engine's job.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod conflict;
pub mod entry;
pub mod merge;
pub mod namespace;
pub mod resolver;

pub use classifier::{Action, Decision, EntryClassifier};
pub use conflict::{BaseDeclaration, ConflictDetector, Drift, DriftResolution};
pub use entry::{Entry, EntryPlan, EntryPlanner, PlanOutcome, Snapshot};
pub use merge::{merge_patch_value, MergeOutcome, Merger, Patcher, Replacer, GEOMETRY_KEY};
pub use namespace::{NamespaceManager, WriteContext};
pub use resolver::{RefResolver, RefUsage};

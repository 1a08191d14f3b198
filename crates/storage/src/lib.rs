//! Storage layer for geoversion
//!
//! This crate implements the in-memory feature store behind the storage
//! and tag collaborator traits:
//! - InMemoryStore: DashMap of spaces, each a DashMap of version chains
//! - VersionChain: newest-first history of one feature id
//! - RetentionPolicy: per-space history depth (KeepAll / KeepLast)
//! - Tag table per space, validated on write
//! - Space revision counter (one step per commit) maintained with AtomicU64
//!
//! # Commit Model
//!
//! Commits are compare-and-set on the feature's head version:
//! - Single-feature commits lock only the target entry
//! - Multi-feature batch commits are validated in full, then applied at once
//! - Version numbers are assigned here, never taken from the payload

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod retention;
pub mod space;
pub mod store;
pub mod testing;

pub use chain::VersionChain;
pub use retention::RetentionPolicy;
pub use space::SpaceConfig;
pub use store::InMemoryStore;

//! Write-path engine for geoversion
//!
//! This crate orchestrates the lower layers:
//! - Engine: store, spaces, tags and statistics behind one handle
//! - BatchCoordinator: transactional and legacy batches, commit retries,
//!   storage retries, request deadline
//! - HistoryReader: ref-based version reads (HEAD never cached)
//! - EngineConfig: `geoversion.toml`
//!
//! Planning an entry is pure (see `geoversion-concurrency`). The engine is
//! the only component that reads from and commits to storage.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod history;

pub use config::{EngineConfig, CONFIG_FILE_NAME};
pub use coordinator::{BatchCoordinator, BatchMetrics, BatchRequest, BatchResponse, EntryResult};
pub use engine::Engine;
pub use history::{HistoryQuery, HistoryReader};

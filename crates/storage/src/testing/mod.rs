//! Testing utilities for the storage collaborator
//!
//! - **FlakyStorage**: wraps a store and injects `StorageUnavailable`
//!   failures and concurrent head advances
//!
//! # Example
//!
//! ```ignore
//! use geoversion_storage::testing::FlakyStorage;
//!
//! let storage = FlakyStorage::new(Arc::new(store));
//! storage.fail_next_commits(2);
//! storage.interleave_write(space.clone(), Feature::new("F1"));
//! ```

mod flaky;

pub use flaky::FlakyStorage;

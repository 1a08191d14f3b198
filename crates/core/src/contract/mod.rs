//! Contract types shared by every layer
//!
//! - `version`: version numbers and inclusive ranges
//! - `timestamp`: commit-time instants and clocks
//! - `tag_name`: validated tag names

pub mod tag_name;
pub mod timestamp;
pub mod version;

pub use tag_name::{TagName, TagNameError, HEAD_KEYWORD, MAX_TAG_NAME_LENGTH};
pub use timestamp::{Clock, ManualClock, SystemClock, Timestamp};
pub use version::{next_version, Version, VersionRange, FIRST_VERSION};

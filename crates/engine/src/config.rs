//! Engine configuration via `geoversion.toml`
//!
//! A default `geoversion.toml` can be written next to the data the engine
//! serves. To change settings, edit the file and restart.

use geoversion_core::{GeoError, GeoResult, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "geoversion.toml";

fn default_max_commit_retries() -> usize {
    3
}

fn default_max_storage_retries() -> usize {
    3
}

fn default_storage_retry_backoff_ms() -> u64 {
    5
}

fn default_storage_retry_max_backoff_ms() -> u64 {
    100
}

fn default_parallel() -> bool {
    true
}

fn default_versions_to_keep() -> usize {
    10
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// Engine configuration loaded from `geoversion.toml`.
///
/// # Example
///
/// ```toml
/// max_commit_retries = 3
/// max_storage_retries = 3
/// storage_retry_backoff_ms = 5
/// # request_deadline_ms = 30000
/// parallel = true
/// default_versions_to_keep = 10
/// history_limit = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Re-classifications after a commit finds its head advanced
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: usize,
    /// Retries of a storage call failing with `StorageUnavailable`
    #[serde(default = "default_max_storage_retries")]
    pub max_storage_retries: usize,
    /// Base delay between storage retries (exponential backoff)
    #[serde(default = "default_storage_retry_backoff_ms")]
    pub storage_retry_backoff_ms: u64,
    /// Maximum delay between storage retries
    #[serde(default = "default_storage_retry_max_backoff_ms")]
    pub storage_retry_max_backoff_ms: u64,
    /// Whole-request deadline; commits not started by then are not started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_deadline_ms: Option<u64>,
    /// Process distinct feature ids of a batch on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Retention depth of spaces created without an explicit one
    #[serde(default = "default_versions_to_keep")]
    pub default_versions_to_keep: usize,
    /// History read limit when a query does not set one
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: default_max_commit_retries(),
            max_storage_retries: default_max_storage_retries(),
            storage_retry_backoff_ms: default_storage_retry_backoff_ms(),
            storage_retry_max_backoff_ms: default_storage_retry_max_backoff_ms(),
            request_deadline_ms: None,
            parallel: default_parallel(),
            default_versions_to_keep: default_versions_to_keep(),
            history_limit: default_history_limit(),
        }
    }
}

impl EngineConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the commit retry budget
    pub fn with_max_commit_retries(mut self, retries: usize) -> Self {
        self.max_commit_retries = retries;
        self
    }

    /// Set the storage retry budget
    pub fn with_max_storage_retries(mut self, retries: usize) -> Self {
        self.max_storage_retries = retries;
        self
    }

    /// Set the storage retry base delay
    pub fn with_storage_retry_backoff_ms(mut self, ms: u64) -> Self {
        self.storage_retry_backoff_ms = ms;
        self
    }

    /// Set the request deadline
    pub fn with_request_deadline_ms(mut self, ms: u64) -> Self {
        self.request_deadline_ms = Some(ms);
        self
    }

    /// Enable or disable parallel processing
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Request deadline as a duration
    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_ms.map(Duration::from_millis)
    }

    /// Delay before storage retry number `attempt` (0-based, exponential backoff)
    pub fn storage_retry_delay(&self, attempt: usize) -> Duration {
        // Cap the shift to prevent overflow
        let shift = attempt.min(63);
        let delay_ms = self.storage_retry_backoff_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay_ms.min(self.storage_retry_max_backoff_ms))
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first out-of-range setting.
    pub fn validate(&self) -> GeoResult<()> {
        if self.max_commit_retries == 0 {
            return Err(GeoError::validation("max_commit_retries must be at least 1"));
        }
        if self.default_versions_to_keep == 0 {
            return Err(GeoError::validation("default_versions_to_keep must be at least 1"));
        }
        if self.history_limit == 0 || self.history_limit > MAX_HISTORY_LIMIT {
            return Err(GeoError::validation(format!(
                "history_limit must be within 1..={}, got {}",
                MAX_HISTORY_LIMIT, self.history_limit
            )));
        }
        if self.request_deadline_ms == Some(0) {
            return Err(GeoError::validation("request_deadline_ms must be positive"));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# geoversion engine configuration
#
# How often a commit that found its head advanced is re-classified
# against the new head before the entry fails with a conflict.
max_commit_retries = 3

# How often a storage call failing with StorageUnavailable is retried
# with unchanged inputs, and the exponential backoff between attempts.
max_storage_retries = 3
storage_retry_backoff_ms = 5
storage_retry_max_backoff_ms = 100

# Whole-request deadline. Commits already started run to completion,
# entries whose commit has not started fail with DeadlineExceeded.
# request_deadline_ms = 30000

# Process distinct feature ids of a batch in parallel (default: true)
parallel = true

# Versions kept per feature in spaces created without a retention depth
default_versions_to_keep = 10

# History read limit when a query does not set one (max 100000)
history_limit = 1000
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> GeoResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GeoError::internal(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            GeoError::validation(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> GeoResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                GeoError::internal(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> GeoResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GeoError::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            GeoError::internal(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

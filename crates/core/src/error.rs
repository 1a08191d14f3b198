//! Error types for the feature store write path
//!
//! Every layer reports failures through [`GeoError`]. The variants follow the
//! taxonomy of the modify pipeline:
//!
//! - **Validation**: malformed ref, tag or policy value
//! - **Classification**: a policy forbids the requested state transition
//! - **Conflict**: version drift detected under conflict detection
//! - **MergeConflict**: irreconcilable field-level divergence
//! - **StorageUnavailable**: collaborator I/O failure (the only retryable kind)
//! - **RefResolution**: unknown tag, or "all versions" where it is not allowed
//!
//! Only `StorageUnavailable` is ever retried automatically. Every other kind
//! reflects a decision, not a transient fault.

use crate::feature::HeadState;
use thiserror::Error;

/// Result type alias for feature store operations
pub type GeoResult<T> = std::result::Result<T, GeoError>;

/// Error type for the feature store write path
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeoError {
    /// Malformed ref, tag or policy value
    #[error("validation error: {message}")]
    Validation {
        /// What was malformed
        message: String,
    },

    /// The configured policy forbids the transition for this feature
    #[error("classification error for feature '{feature_id}': head {head}, policy {policy}")]
    Classification {
        /// Feature the entry targets
        feature_id: String,
        /// Whether a live head existed
        head: HeadState,
        /// The policy value that was applied
        policy: String,
    },

    /// The declared base version is no longer the head version
    #[error("conflict on feature '{feature_id}': base version {base_version}, head version {head_version}")]
    Conflict {
        /// Feature the entry targets
        feature_id: String,
        /// Version the client declared it was editing
        base_version: u64,
        /// Version currently stored
        head_version: u64,
    },

    /// Head and input changed the same property to different values
    #[error("merge conflict on feature '{feature_id}' at key '{key}'")]
    MergeConflict {
        /// Feature the entry targets
        feature_id: String,
        /// Property key (or `geometry`) that diverged
        key: String,
    },

    /// The merge or replace could not produce a result
    #[error("modify op error on feature '{feature_id}': {reason}")]
    ModifyOp {
        /// Feature the entry targets
        feature_id: String,
        /// Why the operation failed
        reason: String,
    },

    /// Storage collaborator failed; the same request may be retried
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Collaborator failure description
        message: String,
    },

    /// A ref could not be resolved to a version
    #[error("ref resolution error: {message}")]
    RefResolution {
        /// What could not be resolved
        message: String,
    },

    /// A space, tag or feature does not exist
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// The request deadline passed before this entry's commit started
    #[error("request deadline exceeded before commit of feature '{feature_id}'")]
    DeadlineExceeded {
        /// Feature whose commit was not started
        feature_id: String,
    },

    /// A transactional batch was rejected as a whole
    #[error("batch aborted at entry {index} (feature '{feature_id}'): {cause}")]
    BatchAborted {
        /// Position of the first failing entry in the request
        index: usize,
        /// Feature of the first failing entry
        feature_id: String,
        /// The entry-level failure
        cause: Box<GeoError>,
    },

    /// Invariant violation inside the engine
    #[error("internal error: {message}")]
    Internal {
        /// Description of the violated invariant
        message: String,
    },
}

impl GeoError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        GeoError::Validation {
            message: message.into(),
        }
    }

    /// Create a classification error
    pub fn classification(
        feature_id: impl Into<String>,
        head: HeadState,
        policy: impl std::fmt::Display,
    ) -> Self {
        GeoError::Classification {
            feature_id: feature_id.into(),
            head,
            policy: policy.to_string(),
        }
    }

    /// Create a version conflict error
    pub fn conflict(feature_id: impl Into<String>, base_version: u64, head_version: u64) -> Self {
        GeoError::Conflict {
            feature_id: feature_id.into(),
            base_version,
            head_version,
        }
    }

    /// Create a key-level merge conflict error
    pub fn merge_conflict(feature_id: impl Into<String>, key: impl Into<String>) -> Self {
        GeoError::MergeConflict {
            feature_id: feature_id.into(),
            key: key.into(),
        }
    }

    /// Create a modify op error
    pub fn modify_op(feature_id: impl Into<String>, reason: impl Into<String>) -> Self {
        GeoError::ModifyOp {
            feature_id: feature_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage unavailable error
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        GeoError::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Create a ref resolution error
    pub fn ref_resolution(message: impl Into<String>) -> Self {
        GeoError::RefResolution {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        GeoError::NotFound { what: what.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        GeoError::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            GeoError::Validation { .. } => "ValidationError",
            GeoError::Classification { .. } => "ClassificationError",
            GeoError::Conflict { .. } => "ConflictError",
            GeoError::MergeConflict { .. } => "MergeConflictError",
            GeoError::ModifyOp { .. } => "ModifyOpError",
            GeoError::StorageUnavailable { .. } => "StorageUnavailable",
            GeoError::RefResolution { .. } => "RefResolutionError",
            GeoError::NotFound { .. } => "NotFound",
            GeoError::DeadlineExceeded { .. } => "DeadlineExceeded",
            GeoError::BatchAborted { .. } => "BatchAborted",
            GeoError::Internal { .. } => "Internal",
        }
    }

    /// Whether the failed call may be repeated with unchanged inputs
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeoError::StorageUnavailable { .. })
    }

    /// Whether this error reports version drift, at entry or batch level
    pub fn is_conflict(&self) -> bool {
        match self {
            GeoError::Conflict { .. } | GeoError::MergeConflict { .. } => true,
            GeoError::BatchAborted { cause, .. } => cause.is_conflict(),
            _ => false,
        }
    }
}

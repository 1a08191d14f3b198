//! Version-drift detection
//!
//! An entry may declare the version it was based on. When conflict
//! detection is on and such a base is declared, the entry conflicts iff the
//! declared base differs from the stored head version. Content is never
//! compared: a no-op edit on top of a stale base still conflicts.
//!
//! Tombstones count as head versions here. A feature id that was never
//! committed has nothing to drift from and never conflicts.

use geoversion_core::{ConflictResolution, GeoError, GeoResult, Version};

use crate::classifier::Action;

/// Where the base version of an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDeclaration {
    /// No base; the entry is never checked for drift
    Undeclared,
    /// The client sent `namespace.version`
    Explicit(Version),
    /// Legacy mode: the head version at first read, frozen for retries
    Implicit(Version),
}

impl BaseDeclaration {
    /// The declared version, if any
    pub fn version(&self) -> Option<Version> {
        match self {
            BaseDeclaration::Undeclared => None,
            BaseDeclaration::Explicit(v) | BaseDeclaration::Implicit(v) => Some(*v),
        }
    }
}

/// Drift between a declared base and the head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drift {
    /// Version the entry was based on
    pub base_version: Version,
    /// Version actually stored
    pub head_version: Version,
}

/// What drift resolution decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftResolution {
    /// No drift; keep the classified action
    Clean(Action),
    /// Drift settled; continue with this action
    Resolved(Action),
}

impl DriftResolution {
    /// Action to carry out
    pub fn action(&self) -> Action {
        match self {
            DriftResolution::Clean(a) | DriftResolution::Resolved(a) => *a,
        }
    }
}

/// Stateless drift detector
pub struct ConflictDetector;

impl ConflictDetector {
    /// Compare the declared base against the head
    pub fn detect(
        conflict_detection: bool,
        base: BaseDeclaration,
        head_version: Option<Version>,
    ) -> Option<Drift> {
        if !conflict_detection {
            return None;
        }
        match (base.version(), head_version) {
            (Some(base_version), Some(head_version)) if base_version != head_version => {
                Some(Drift {
                    base_version,
                    head_version,
                })
            }
            _ => None,
        }
    }

    /// Settle a detected drift under the configured resolution
    ///
    /// - `ERROR`: the entry fails with `ConflictError`
    /// - `RETAIN`: the entry succeeds without writing; head stays
    /// - `MERGE`: replace and patch are upgraded to a three-way merge; a
    ///   delete cannot be merged and fails with `ConflictError`
    pub fn resolve(
        feature_id: &str,
        action: Action,
        drift: Option<Drift>,
        resolution: ConflictResolution,
    ) -> GeoResult<DriftResolution> {
        let drift = match drift {
            None => return Ok(DriftResolution::Clean(action)),
            Some(d) => d,
        };
        let conflict = || GeoError::conflict(feature_id, drift.base_version, drift.head_version);

        let resolved = match (resolution, action) {
            (ConflictResolution::Error, _) => return Err(conflict()),
            (ConflictResolution::Retain, _) => Action::Retain,
            (ConflictResolution::Merge, Action::Replace | Action::Patch | Action::Merge) => {
                Action::Merge
            }
            (ConflictResolution::Merge, Action::Delete) => return Err(conflict()),
            (ConflictResolution::Merge, Action::Create | Action::Retain) => action,
        };
        Ok(DriftResolution::Resolved(resolved))
    }
}

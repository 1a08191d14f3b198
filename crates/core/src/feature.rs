//! Feature data model
//!
//! Wire shape:
//!
//! ```text
//! { "id": "...", "geometry": {...},
//!   "properties": { ...free-form..., "@ns:com:here:xyz": {
//!       "version": 3, "createdAt": ..., "updatedAt": ..., "author": "...",
//!       "tags": [...], "deleted": false } } }
//! ```
//!
//! The namespace block is owned by the engine. On client input only its
//! `version` (the declared base) and `tags` are read; everything else is
//! regenerated at commit time.

use crate::contract::{Timestamp, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Property key holding the namespace block
pub const NAMESPACE_KEY: &str = "@ns:com:here:xyz";

/// Geometry is an opaque GeoJSON value; validation happens upstream
pub type Geometry = Value;

/// Identifier of a space (tenant-visible dataset)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(String);

impl SpaceId {
    /// Wrap a space identifier
    pub fn new(id: impl Into<String>) -> Self {
        SpaceId(id.into())
    }

    /// Get the identifier as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpaceId {
    fn from(s: &str) -> Self {
        SpaceId::new(s)
    }
}

/// Reserved metadata block attached to every feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    /// Committed version; on input, the version the client based its edit on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// First commit time of this feature id (immutable once set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Commit time of this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Authenticated caller that committed this version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Free-form labels, accumulated across versions
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Tombstone marker
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// Free-form properties plus the namespace block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    /// Engine-owned metadata
    #[serde(rename = "@ns:com:here:xyz", default)]
    pub namespace: Namespace,
    /// Client-owned properties
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// One version of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Identifier, unique within a space+version
    pub id: String,
    /// GeoJSON geometry, merged as one atomic value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    /// Properties and namespace
    #[serde(default)]
    pub properties: Properties,
}

impl Feature {
    /// Create an empty feature
    pub fn new(id: impl Into<String>) -> Self {
        Feature {
            id: id.into(),
            geometry: None,
            properties: Properties::default(),
        }
    }

    /// Set a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.fields.insert(key.into(), value.into());
        self
    }

    /// Set the geometry
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Declare the version this edit is based on
    pub fn with_base_version(mut self, version: Version) -> Self {
        self.properties.namespace.version = Some(version);
        self
    }

    /// Add a namespace tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.properties.namespace.tags.insert(tag.into());
        self
    }

    /// Namespace block
    #[inline]
    pub fn namespace(&self) -> &Namespace {
        &self.properties.namespace
    }

    /// Version recorded in the namespace block
    #[inline]
    pub fn version(&self) -> Option<Version> {
        self.properties.namespace.version
    }

    /// Whether this version is a deletion marker
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.properties.namespace.deleted
    }

    /// Property lookup
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.fields.get(key)
    }

    /// Parse a feature from its JSON wire form
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Render the JSON wire form
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Whether a live head version existed when an entry was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadState {
    /// No version, or the newest version is a tombstone
    Absent,
    /// A live head exists
    Present,
}

impl HeadState {
    /// Classify an optional stored head
    pub fn of(head: Option<&Feature>) -> Self {
        match head {
            Some(f) if !f.is_tombstone() => HeadState::Present,
            _ => HeadState::Absent,
        }
    }
}

impl fmt::Display for HeadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadState::Absent => write!(f, "absent"),
            HeadState::Present => write!(f, "present"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_wire_shape() {
        let feature = Feature::from_json(json!({
            "id": "F1",
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
            "properties": {
                "name": "Stade",
                "@ns:com:here:xyz": {"version": 3, "createdAt": 10, "tags": ["t1"]}
            }
        }))
        .unwrap();

        assert_eq!(feature.id, "F1");
        assert_eq!(feature.property("name"), Some(&json!("Stade")));
        assert_eq!(feature.version(), Some(3));
        assert_eq!(feature.namespace().created_at, Some(Timestamp::from_millis(10)));
        assert!(feature.namespace().tags.contains("t1"));
        assert!(!feature.properties.fields.contains_key(NAMESPACE_KEY));

        let back = feature.to_json().unwrap();
        assert_eq!(back["properties"][NAMESPACE_KEY]["version"], json!(3));
        assert_eq!(back["properties"]["name"], json!("Stade"));
    }

    #[test]
    fn test_missing_namespace_defaults() {
        let feature = Feature::from_json(json!({"id": "F", "properties": {"a": 1}})).unwrap();
        assert_eq!(feature.version(), None);
        assert!(feature.namespace().tags.is_empty());
        assert!(feature.geometry.is_none());
    }

    #[test]
    fn test_head_state_ignores_tombstones() {
        let live = Feature::new("F");
        let mut dead = Feature::new("F");
        dead.properties.namespace.deleted = true;

        assert_eq!(HeadState::of(None), HeadState::Absent);
        assert_eq!(HeadState::of(Some(&live)), HeadState::Present);
        assert_eq!(HeadState::of(Some(&dead)), HeadState::Absent);
    }
}

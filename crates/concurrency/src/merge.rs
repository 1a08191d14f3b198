//! Result construction: replace, patch and three-way merge
//!
//! Each function builds a fresh result from immutable snapshots of base,
//! head and input. Only geometry and client properties are produced here;
//! the namespace block is stamped afterwards by `NamespaceManager`.
//!
//! # Input semantics
//!
//! - A property key absent from the input is untouched
//! - An explicit `null` deletes the key
//! - `geometry: None` on the input leaves the geometry untouched

use geoversion_core::{ConflictResolution, Feature, GeoError, GeoResult, Properties};
use serde_json::Value;
use std::collections::BTreeMap;

/// Pseudo-key naming the geometry in conflict reports
pub const GEOMETRY_KEY: &str = "geometry";

/// Content-only copy of a feature (namespace left empty)
fn content_of(feature: &Feature) -> Feature {
    Feature {
        id: feature.id.clone(),
        geometry: feature.geometry.clone(),
        properties: Properties {
            namespace: Default::default(),
            fields: feature.properties.fields.clone(),
        },
    }
}

fn check_same_id(head: &Feature, input: &Feature) -> GeoResult<()> {
    if head.id != input.id {
        return Err(GeoError::modify_op(
            input.id.as_str(),
            format!("head snapshot belongs to feature '{}'", head.id),
        ));
    }
    Ok(())
}

// ============================================================================
// Replace
// ============================================================================

/// Two-way replace: the input becomes the content wholesale
pub struct Replacer;

impl Replacer {
    /// Content of a CREATE or REPLACE result
    ///
    /// `null` properties are dropped; they carry no value to store.
    pub fn replace(input: &Feature) -> Feature {
        let mut out = content_of(input);
        out.properties.fields.retain(|_, v| !v.is_null());
        out
    }
}

// ============================================================================
// Patch
// ============================================================================

/// Two-way merge-patch of the input onto the head
pub struct Patcher;

impl Patcher {
    /// Content of a PATCH result
    ///
    /// Object values are patched recursively, anything else replaces the
    /// head's value, `null` removes.
    pub fn patch(head: &Feature, input: &Feature) -> GeoResult<Feature> {
        check_same_id(head, input)?;
        let mut out = content_of(head);
        for (key, value) in &input.properties.fields {
            apply_patch_entry(&mut out.properties.fields, key, value);
        }
        if let Some(geometry) = &input.geometry {
            out.geometry = Some(geometry.clone());
        }
        Ok(out)
    }
}

fn apply_patch_entry(target: &mut BTreeMap<String, Value>, key: &str, patch: &Value) {
    if patch.is_null() {
        target.remove(key);
        return;
    }
    let slot = target.entry(key.to_string()).or_insert(Value::Null);
    merge_patch_value(slot, patch);
}

/// JSON merge-patch of `patch` into `target`
pub fn merge_patch_value(target: &mut Value, patch: &Value) {
    if let Value::Object(patch_obj) = patch {
        if !target.is_object() {
            *target = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(target_obj) = target {
            for (key, value) in patch_obj {
                if value.is_null() {
                    target_obj.remove(key);
                } else {
                    let slot = target_obj.entry(key.clone()).or_insert(Value::Null);
                    merge_patch_value(slot, value);
                }
            }
        }
    } else {
        *target = patch.clone();
    }
}

// ============================================================================
// Three-way merge
// ============================================================================

/// Result of a three-way merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Merged content (namespace not yet stamped)
    pub feature: Feature,
    /// Diverging keys where head's value was kept
    pub retained: Vec<String>,
    /// Diverging keys where the input's value won
    pub overridden: Vec<String>,
}

/// How one key settles in a three-way merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyMerge {
    /// The client did not change it; head stays
    KeepHead,
    /// Take the input value
    TakeInput,
    /// Both sides changed it differently
    Diverged,
}

/// Decide one key from its base, head and input values (`None` = absent)
fn merge_key(base: Option<&Value>, head: Option<&Value>, input: Option<&Value>) -> KeyMerge {
    let base = match base {
        // Nothing to diverge from
        None => return KeyMerge::TakeInput,
        Some(b) => b,
    };
    let client_changed = input != Some(base);
    let head_changed = head != Some(base);
    if !client_changed {
        KeyMerge::KeepHead
    } else if !head_changed || head == input {
        KeyMerge::TakeInput
    } else {
        KeyMerge::Diverged
    }
}

/// Three-way merge of base, head and input
pub struct Merger;

impl Merger {
    /// Content of a MERGE result
    ///
    /// Only keys present in the input are considered. Without a base every
    /// input key wins. A key changed by both head and input to different
    /// values is settled by `resolution`:
    ///
    /// - `ERROR`: `MergeConflictError` naming the key
    /// - `RETAIN`: head's value is kept for that key
    /// - `MERGE`: the input's value wins
    pub fn merge(
        base: Option<&Feature>,
        head: &Feature,
        input: &Feature,
        resolution: ConflictResolution,
    ) -> GeoResult<MergeOutcome> {
        check_same_id(head, input)?;
        let mut out = content_of(head);
        let mut retained = Vec::new();
        let mut overridden = Vec::new();

        let mut settle = |key: &str, decision: KeyMerge| -> GeoResult<bool> {
            match decision {
                KeyMerge::KeepHead => Ok(false),
                KeyMerge::TakeInput => Ok(true),
                KeyMerge::Diverged => match resolution {
                    ConflictResolution::Error => Err(GeoError::merge_conflict(input.id.as_str(), key)),
                    ConflictResolution::Retain => {
                        retained.push(key.to_string());
                        Ok(false)
                    }
                    ConflictResolution::Merge => {
                        overridden.push(key.to_string());
                        Ok(true)
                    }
                },
            }
        };

        for (key, value) in &input.properties.fields {
            let input_value = (!value.is_null()).then_some(value);
            let decision = match base {
                None => KeyMerge::TakeInput,
                Some(b) => merge_key(
                    b.properties.fields.get(key),
                    head.properties.fields.get(key),
                    input_value,
                ),
            };
            if settle(key, decision)? {
                match input_value {
                    Some(v) => {
                        out.properties.fields.insert(key.clone(), v.clone());
                    }
                    None => {
                        out.properties.fields.remove(key);
                    }
                }
            }
        }

        if let Some(geometry) = &input.geometry {
            let decision = match base {
                None => KeyMerge::TakeInput,
                Some(b) => merge_key(b.geometry.as_ref(), head.geometry.as_ref(), Some(geometry)),
            };
            if settle(GEOMETRY_KEY, decision)? {
                out.geometry = Some(geometry.clone());
            }
        }

        Ok(MergeOutcome {
            feature: out,
            retained,
            overridden,
        })
    }
}

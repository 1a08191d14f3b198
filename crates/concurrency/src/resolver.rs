//! Version-reference resolution
//!
//! Turns a textual ref (`HEAD`, `12`, `stable`, `3..HEAD`, `*`) into a
//! concrete [`Ref`] against a head version and the space's tag table.
//!
//! # Laziness
//!
//! Nothing is cached. The head version is an argument of every call, and
//! tags are looked up in the [`TagStore`] every time: an expression such as
//! `1..HEAD` yields a different range once a new version is committed.

use geoversion_core::{
    GeoError, GeoResult, Ref, RefExpr, RefPoint, SpaceId, TagStore, Version, VersionRange,
};
use tracing::debug;

/// Context a ref is resolved in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUsage {
    /// Reads: every form is allowed
    Query,
    /// Base of a copy or merge: "all versions" is refused
    Base,
}

/// Resolves ref expressions against a tag table
pub struct RefResolver<'a> {
    tags: &'a dyn TagStore,
}

impl<'a> RefResolver<'a> {
    /// Resolver reading tags from `tags`
    pub fn new(tags: &'a dyn TagStore) -> Self {
        RefResolver { tags }
    }

    /// Parse and resolve in one step
    pub fn resolve_str(
        &self,
        space: &SpaceId,
        text: &str,
        head: Version,
        usage: RefUsage,
    ) -> GeoResult<Ref> {
        let expr: RefExpr = text.parse()?;
        self.resolve(space, &expr, head, usage)
    }

    /// Resolve a parsed expression
    ///
    /// # Errors
    ///
    /// - `RefResolution` for an unknown tag, or `*` under [`RefUsage::Base`]
    /// - `Validation` for a range whose start resolves after its end
    pub fn resolve(
        &self,
        space: &SpaceId,
        expr: &RefExpr,
        head: Version,
        usage: RefUsage,
    ) -> GeoResult<Ref> {
        let resolved = match expr {
            RefExpr::Point(point) => Ref::Version(self.resolve_point(space, point, head)?),
            RefExpr::Range(start, end) => {
                let start_v = self.resolve_point(space, start, head)?;
                let end_v = self.resolve_point(space, end, head)?;
                let range = VersionRange::new(start_v, end_v).ok_or_else(|| {
                    GeoError::validation(format!(
                        "ref '{}' resolves to an inverted range {}..{}",
                        expr, start_v, end_v
                    ))
                })?;
                Ref::Range(range)
            }
            RefExpr::All => match usage {
                RefUsage::Query => Ref::All,
                RefUsage::Base => {
                    return Err(GeoError::ref_resolution(
                        "'*' (all versions) cannot be used as a base reference",
                    ))
                }
            },
        };
        debug!(
            target: "geoversion::refs",
            space = %space,
            expr = %expr,
            head,
            ?resolved,
            "Ref resolved"
        );
        Ok(resolved)
    }

    fn resolve_point(&self, space: &SpaceId, point: &RefPoint, head: Version) -> GeoResult<Version> {
        match point {
            RefPoint::Head => Ok(head),
            RefPoint::Version(v) => Ok(*v),
            RefPoint::Tag(name) => self.tags.resolve_tag(space, name)?.ok_or_else(|| {
                GeoError::ref_resolution(format!("unknown tag '{}' in space '{}'", name, space))
            }),
        }
    }
}

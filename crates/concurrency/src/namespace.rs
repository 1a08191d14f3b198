//! Namespace stamping
//!
//! The namespace block (`version`, `createdAt`, `updatedAt`, `author`,
//! `tags`, `deleted`) belongs to the engine. Clients may only contribute
//! tags and a declared base version; everything else they send is dropped.
//!
//! Rules applied to every result about to be committed:
//!
//! - `version`: stored head version + 1, or 1 for a new feature id
//! - `updatedAt`: commit time
//! - `createdAt`: the live head's value when updating, otherwise commit time
//! - `author`: the authenticated caller
//! - `tags`: union of base, live head and input tags

use geoversion_core::{next_version, Clock, Feature, Namespace, Timestamp, Version};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Who is writing, and what time it is
#[derive(Clone)]
pub struct WriteContext {
    author: String,
    clock: Arc<dyn Clock>,
}

impl WriteContext {
    /// Context for `author`, reading time from `clock`
    pub fn new(author: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        WriteContext {
            author: author.into(),
            clock,
        }
    }

    /// Authenticated caller
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Current commit time
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

impl fmt::Debug for WriteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteContext")
            .field("author", &self.author)
            .finish_non_exhaustive()
    }
}

/// Stamps engine-owned metadata onto results
pub struct NamespaceManager;

impl NamespaceManager {
    /// Build the namespace of a live result
    ///
    /// `head` is the stored head, tombstone or not: it fixes the next version
    /// number. Only a live head contributes `createdAt` and tags.
    pub fn stamp(
        ctx: &WriteContext,
        now: Timestamp,
        mut content: Feature,
        base: Option<&Feature>,
        head: Option<&Feature>,
        input: &Feature,
    ) -> Feature {
        let live_head = head.filter(|h| !h.is_tombstone());
        content.properties.namespace = Namespace {
            version: Some(Self::next_version_after(head)),
            created_at: Some(
                live_head
                    .and_then(|h| h.namespace().created_at)
                    .unwrap_or(now),
            ),
            updated_at: Some(now),
            author: Some(ctx.author().to_string()),
            tags: Self::union_tags(base, live_head, input),
            deleted: false,
        };
        content
    }

    /// Build the tombstone that deletes `head`
    ///
    /// The tombstone keeps the head's geometry and properties so the deleted
    /// state stays readable through history.
    pub fn tombstone(ctx: &WriteContext, now: Timestamp, head: &Feature, input: &Feature) -> Feature {
        let mut dead = Feature {
            id: head.id.clone(),
            geometry: head.geometry.clone(),
            properties: head.properties.clone(),
        };
        dead.properties.namespace = Namespace {
            version: Some(Self::next_version_after(Some(head))),
            created_at: Some(head.namespace().created_at.unwrap_or(now)),
            updated_at: Some(now),
            author: Some(ctx.author().to_string()),
            tags: Self::union_tags(None, Some(head), input),
            deleted: true,
        };
        dead
    }

    /// Version the next commit after `head` gets
    #[inline]
    pub fn next_version_after(head: Option<&Feature>) -> Version {
        next_version(head.and_then(Feature::version))
    }

    /// `tags(base) ∪ tags(head) ∪ tags(input)`
    pub fn union_tags(
        base: Option<&Feature>,
        head: Option<&Feature>,
        input: &Feature,
    ) -> BTreeSet<String> {
        base.into_iter()
            .chain(head)
            .chain(std::iter::once(input))
            .flat_map(|f| f.namespace().tags.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoversion_core::ManualClock;

    fn ctx() -> WriteContext {
        WriteContext::new("alice", Arc::new(ManualClock::new(Timestamp::from_millis(1_000))))
    }

    fn stored(version: Version, created: u64, tags: &[&str]) -> Feature {
        let mut f = Feature::new("F");
        f.properties.namespace.version = Some(version);
        f.properties.namespace.created_at = Some(Timestamp::from_millis(created));
        for t in tags {
            f.properties.namespace.tags.insert(t.to_string());
        }
        f
    }

    #[test]
    fn test_create_stamps_fresh_namespace() {
        let ctx = ctx();
        let now = ctx.now();
        let mut input = Feature::new("F").with_tag("x");
        input.properties.namespace.created_at = Some(Timestamp::from_millis(5));
        input.properties.namespace.version = Some(42);
        input.properties.namespace.author = Some("mallory".into());

        let out = NamespaceManager::stamp(&ctx, now, input.clone(), None, None, &input);
        let ns = out.namespace();
        assert_eq!(ns.version, Some(1));
        assert_eq!(ns.created_at, Some(now));
        assert_eq!(ns.updated_at, Some(now));
        assert_eq!(ns.author.as_deref(), Some("alice"));
        assert!(ns.tags.contains("x"));
        assert!(!ns.deleted);
    }

    #[test]
    fn test_update_preserves_created_at_and_unions_tags() {
        let ctx = ctx();
        let now = ctx.now();
        let base = stored(1, 10, &["b"]);
        let head = stored(2, 10, &["h"]);
        let input = Feature::new("F").with_tag("i");

        let out = NamespaceManager::stamp(&ctx, now, Feature::new("F"), Some(&base), Some(&head), &input);
        let ns = out.namespace();
        assert_eq!(ns.version, Some(3));
        assert_eq!(ns.created_at, Some(Timestamp::from_millis(10)));
        let tags: Vec<_> = ns.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["b", "h", "i"]);
    }

    #[test]
    fn test_recreate_after_tombstone_continues_numbering() {
        let ctx = ctx();
        let now = ctx.now();
        let mut dead = stored(4, 10, &["old"]);
        dead.properties.namespace.deleted = true;
        let input = Feature::new("F");

        let out = NamespaceManager::stamp(&ctx, now, input.clone(), None, Some(&dead), &input);
        assert_eq!(out.version(), Some(5));
        assert_eq!(out.namespace().created_at, Some(now));
        assert!(out.namespace().tags.is_empty());
    }

    #[test]
    fn test_tombstone_keeps_head_content() {
        let ctx = ctx();
        let now = ctx.now();
        let head = stored(2, 10, &["h"]).with_property("name", "x");
        let dead = NamespaceManager::tombstone(&ctx, now, &head, &Feature::new("F"));
        assert!(dead.is_tombstone());
        assert_eq!(dead.version(), Some(3));
        assert_eq!(dead.namespace().created_at, Some(Timestamp::from_millis(10)));
        assert!(dead.property("name").is_some());
        assert!(dead.namespace().tags.contains("h"));
    }
}

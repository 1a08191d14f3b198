//! Entry planning
//!
//! Planning is the pure part of a write: given immutable snapshots of the
//! input, the base and the head, it classifies the entry, checks for drift,
//! builds the result content and stamps the namespace. Nothing is read from
//! or written to storage here, so plans can be computed in parallel and
//! recomputed freely when a commit finds its head advanced.

use geoversion_core::{
    Feature, GeoError, GeoResult, HeadState, Policies, Timestamp, Version,
};
use tracing::debug;

use crate::classifier::{Action, EntryClassifier};
use crate::conflict::{BaseDeclaration, ConflictDetector, Drift};
use crate::merge::{Merger, Patcher, Replacer};
use crate::namespace::{NamespaceManager, WriteContext};

/// One unit of work inside a batch
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Client-submitted feature
    pub input: Feature,
    /// Policies for this entry only; the batch policies apply when `None`
    pub policies: Option<Policies>,
}

impl Entry {
    /// Entry governed by the batch policies
    pub fn new(input: Feature) -> Self {
        Entry {
            input,
            policies: None,
        }
    }

    /// Entry with its own policies
    pub fn with_policies(input: Feature, policies: Policies) -> Self {
        Entry {
            input,
            policies: Some(policies),
        }
    }

    /// Target feature id
    #[inline]
    pub fn feature_id(&self) -> &str {
        &self.input.id
    }

    /// Base version the client declared, if any
    pub fn declared_base(&self) -> Option<Version> {
        self.input.version()
    }

    /// Effective policies given the batch defaults
    pub fn effective_policies(&self, batch: &Policies) -> Policies {
        self.policies.unwrap_or(*batch)
    }
}

/// What a planned entry will do
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// Commit this fully stamped result
    Commit(Feature),
    /// Succeed without writing; carries head's live state, if any
    NoOp(Option<Feature>),
}

/// Fully computed, not yet committed, entry result
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPlan {
    /// Target feature id
    pub feature_id: String,
    /// Action after classification and drift resolution
    pub action: Action,
    /// Drift that was detected and settled, if any
    pub drift: Option<Drift>,
    /// Head version the plan was computed against
    pub expected_head: Option<Version>,
    /// Result to commit, or head state for a no-op
    pub outcome: PlanOutcome,
    /// Keys where a divergent head value was kept
    pub retained_keys: Vec<String>,
}

impl EntryPlan {
    /// The stamped result, if this plan writes
    pub fn result(&self) -> Option<&Feature> {
        match &self.outcome {
            PlanOutcome::Commit(f) => Some(f),
            PlanOutcome::NoOp(_) => None,
        }
    }
}

/// Immutable inputs of one planning step
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// Client input
    pub input: &'a Feature,
    /// Feature at the declared base version
    pub base: Option<&'a Feature>,
    /// Stored (or tentative) head, tombstone or not
    pub head: Option<&'a Feature>,
    /// Where the base version came from
    pub base_declaration: BaseDeclaration,
}

/// Plans entries for one request
#[derive(Debug, Clone)]
pub struct EntryPlanner {
    ctx: WriteContext,
    conflict_detection: bool,
}

impl EntryPlanner {
    /// Planner for a request
    pub fn new(ctx: WriteContext, conflict_detection: bool) -> Self {
        EntryPlanner {
            ctx,
            conflict_detection,
        }
    }

    /// Write context of the request
    pub fn context(&self) -> &WriteContext {
        &self.ctx
    }

    /// Classify, check drift, build and stamp the result of one entry
    pub fn plan(
        &self,
        snapshot: Snapshot<'_>,
        policies: &Policies,
        now: Timestamp,
    ) -> GeoResult<EntryPlan> {
        let Snapshot {
            input,
            base,
            head,
            base_declaration,
        } = snapshot;
        let feature_id = input.id.as_str();
        let head_state = HeadState::of(head);
        let head_version = head.and_then(Feature::version);

        let classified = EntryClassifier::classify(feature_id, head_state, policies)?;
        let drift = ConflictDetector::detect(self.conflict_detection, base_declaration, head_version);
        let action = ConflictDetector::resolve(
            feature_id,
            classified,
            drift,
            policies.conflict_resolution,
        )?
        .action();

        debug!(
            target: "geoversion::batch",
            feature_id,
            head = %head_state,
            ?head_version,
            base = ?base_declaration.version(),
            %classified,
            %action,
            drift = drift.is_some(),
            "Entry classified"
        );

        let live_head = || {
            head.filter(|h| !h.is_tombstone()).ok_or_else(|| {
                GeoError::internal(format!(
                    "{} of feature '{}' planned without a live head",
                    action, feature_id
                ))
            })
        };

        let mut retained_keys = Vec::new();
        let outcome = match action {
            Action::Retain => PlanOutcome::NoOp(head.filter(|h| !h.is_tombstone()).cloned()),
            Action::Create | Action::Replace => {
                PlanOutcome::Commit(self.stamp(now, Replacer::replace(input), base, head, input))
            }
            Action::Patch => {
                let content = Patcher::patch(live_head()?, input)?;
                PlanOutcome::Commit(self.stamp(now, content, base, head, input))
            }
            Action::Merge => {
                let merged = Merger::merge(base, live_head()?, input, policies.conflict_resolution)?;
                retained_keys = merged.retained;
                PlanOutcome::Commit(self.stamp(now, merged.feature, base, head, input))
            }
            Action::Delete => {
                PlanOutcome::Commit(NamespaceManager::tombstone(&self.ctx, now, live_head()?, input))
            }
        };

        Ok(EntryPlan {
            feature_id: feature_id.to_string(),
            action,
            drift,
            expected_head: head_version,
            outcome,
            retained_keys,
        })
    }

    fn stamp(
        &self,
        now: Timestamp,
        content: Feature,
        base: Option<&Feature>,
        head: Option<&Feature>,
        input: &Feature,
    ) -> Feature {
        NamespaceManager::stamp(&self.ctx, now, content, base, head, input)
    }
}

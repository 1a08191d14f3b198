//! Batch coordinator
//!
//! Drives the entries of one write request through planning and commit.
//!
//! ## Transactional batches
//!
//! Every entry is planned first, with no commits. Entries targeting the same
//! feature id are planned in request order against a tentative head that
//! includes the results of the entries before them. If any entry fails, the
//! batch is rejected as a whole with [`GeoError::BatchAborted`] and nothing
//! is written. Otherwise all results are handed to
//! [`FeatureStorage::commit_all`], which writes all of them or none.
//!
//! ## Legacy batches
//!
//! Each entry is planned and committed on its own and reports its own
//! result. Entries for the same feature id run one after another in request
//! order; distinct feature ids run concurrently when `parallel` is set.
//!
//! ## Retries
//!
//! - `HeadAdvanced` from the store re-runs planning against the new head,
//!   at most `max_commit_retries` times, then fails with `ConflictError`.
//! - `StorageUnavailable` repeats the same call with unchanged inputs, at most
//!   `max_storage_retries` times, with exponential backoff.
//! - Nothing else is retried.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use geoversion_concurrency::{
    Action, BaseDeclaration, Drift, Entry, EntryPlan, EntryPlanner, PlanOutcome, Snapshot,
    WriteContext,
};
use geoversion_core::{
    BatchCommitOutcome, Clock, CommitOutcome, CommitRequest, Feature, FeatureStorage, GeoError,
    GeoResult, Policies, SpaceId, SystemClock, Version,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;

// ============================================================================
// Request / response
// ============================================================================

/// One write request against a space
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// Target space
    pub space: SpaceId,
    /// Entries in request order
    pub entries: Vec<Entry>,
    /// All-or-nothing when `true`, per-entry results when `false`
    pub transactional: bool,
    /// Check declared bases against head versions
    pub conflict_detection: bool,
    /// Policies for entries that carry none of their own
    pub policies: Policies,
    /// Authenticated caller
    pub author: String,
}

impl BatchRequest {
    /// Transactional request with default policies and no conflict detection
    pub fn new(space: impl Into<SpaceId>, author: impl Into<String>) -> Self {
        BatchRequest {
            space: space.into(),
            entries: Vec::new(),
            transactional: true,
            conflict_detection: false,
            policies: Policies::default(),
            author: author.into(),
        }
    }

    /// Set transactional mode
    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    /// Enable or disable conflict detection
    pub fn conflict_detection(mut self, enabled: bool) -> Self {
        self.conflict_detection = enabled;
        self
    }

    /// Set the batch policies
    pub fn policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    /// Append an entry governed by the batch policies
    pub fn feature(mut self, input: Feature) -> Self {
        self.entries.push(Entry::new(input));
        self
    }

    /// Append an entry
    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }
}

/// Outcome of one successful entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntryResult {
    /// Position of the entry in the request
    pub index: usize,
    /// Target feature id
    pub feature_id: String,
    /// Action carried out
    pub action: Action,
    /// Version written, `None` for a no-op
    pub version: Option<Version>,
    /// Committed content, or the head's live state for a no-op
    pub feature: Option<Feature>,
    /// Keys where a divergent head value was kept
    pub retained_keys: Vec<String>,
    /// Drift that was detected and settled
    pub drift: Option<Drift>,
}

impl EntryResult {
    fn from_plan(index: usize, plan: EntryPlan, version: Option<Version>) -> Self {
        let feature = match plan.outcome {
            PlanOutcome::Commit(mut f) => {
                f.properties.namespace.version = version;
                Some(f)
            }
            PlanOutcome::NoOp(state) => state,
        };
        EntryResult {
            index,
            feature_id: plan.feature_id,
            action: plan.action,
            version,
            feature,
            retained_keys: plan.retained_keys,
            drift: plan.drift,
        }
    }

    /// Whether this entry wrote a version
    pub fn is_committed(&self) -> bool {
        self.version.is_some()
    }
}

/// Per-entry outcomes of a request, in request order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    /// Identifier used in log lines of this request
    pub batch_id: Uuid,
    /// One result per entry
    pub results: Vec<GeoResult<EntryResult>>,
}

impl BatchResponse {
    /// Entries that wrote a version
    pub fn committed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.as_ref().map_or(false, EntryResult::is_committed))
            .count()
    }

    /// Entries that failed
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }

    /// Successful results, failures dropped
    pub fn successes(&self) -> impl Iterator<Item = &EntryResult> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Snapshot of coordinator counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchMetrics {
    /// Requests executed
    pub total_batches: u64,
    /// Transactional requests rejected as a whole
    pub aborted_batches: u64,
    /// Entries that wrote a version
    pub entries_committed: u64,
    /// Entries that reported an error
    pub entries_failed: u64,
    /// Re-plans after `HeadAdvanced`
    pub commit_retries: u64,
    /// Repeated storage calls after `StorageUnavailable`
    pub storage_retries: u64,
}

impl BatchMetrics {
    /// Share of executed batches that were not aborted
    pub fn success_rate(&self) -> f64 {
        if self.total_batches == 0 {
            return 0.0;
        }
        (self.total_batches - self.aborted_batches) as f64 / self.total_batches as f64
    }
}

// ============================================================================
// Coordinator
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn after(limit: Option<Duration>) -> Self {
        Deadline(limit.map(|d| Instant::now() + d))
    }

    fn check(&self, feature_id: &str) -> GeoResult<()> {
        match self.0 {
            Some(at) if Instant::now() >= at => Err(GeoError::DeadlineExceeded {
                feature_id: feature_id.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

type GroupResult = Result<Vec<(usize, EntryPlan)>, (usize, GeoError)>;

/// Coordinates write requests against a storage collaborator
///
/// # Memory Ordering
///
/// The counters are observational only and use Relaxed ordering.
pub struct BatchCoordinator {
    storage: Arc<dyn FeatureStorage>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    total_batches: AtomicU64,
    aborted_batches: AtomicU64,
    entries_committed: AtomicU64,
    entries_failed: AtomicU64,
    commit_retries: AtomicU64,
    storage_retries: AtomicU64,
}

impl BatchCoordinator {
    /// Coordinator reading wall-clock time
    pub fn new(storage: Arc<dyn FeatureStorage>, config: EngineConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    /// Coordinator with an explicit clock
    pub fn with_clock(
        storage: Arc<dyn FeatureStorage>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        BatchCoordinator {
            storage,
            clock,
            config,
            total_batches: AtomicU64::new(0),
            aborted_batches: AtomicU64::new(0),
            entries_committed: AtomicU64::new(0),
            entries_failed: AtomicU64::new(0),
            commit_retries: AtomicU64::new(0),
            storage_retries: AtomicU64::new(0),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current counters
    pub fn metrics(&self) -> BatchMetrics {
        BatchMetrics {
            total_batches: self.total_batches.load(Ordering::Relaxed),
            aborted_batches: self.aborted_batches.load(Ordering::Relaxed),
            entries_committed: self.entries_committed.load(Ordering::Relaxed),
            entries_failed: self.entries_failed.load(Ordering::Relaxed),
            commit_retries: self.commit_retries.load(Ordering::Relaxed),
            storage_retries: self.storage_retries.load(Ordering::Relaxed),
        }
    }

    /// Execute a request
    ///
    /// # Errors
    ///
    /// - `Validation` when the request has no author
    /// - `BatchAborted` when a transactional batch is rejected; the cause is
    ///   the failure of the lowest-index failing entry
    ///
    /// Legacy batches report entry failures inside the response.
    pub fn execute(&self, request: &BatchRequest) -> GeoResult<BatchResponse> {
        if request.author.trim().is_empty() {
            return Err(GeoError::validation("batch author must not be empty"));
        }
        let batch_id = Uuid::new_v4();
        self.total_batches.fetch_add(1, Ordering::Relaxed);
        let planner = EntryPlanner::new(
            WriteContext::new(request.author.clone(), Arc::clone(&self.clock)),
            request.conflict_detection,
        );
        debug!(
            target: "geoversion::batch",
            %batch_id,
            space = %request.space,
            entries = request.entries.len(),
            transactional = request.transactional,
            conflict_detection = request.conflict_detection,
            "Batch started"
        );

        let results = if request.transactional {
            match self.execute_transactional(batch_id, request, &planner) {
                Ok(results) => results.into_iter().map(Ok).collect(),
                Err(e) => {
                    self.aborted_batches.fetch_add(1, Ordering::Relaxed);
                    self.entries_failed
                        .fetch_add(request.entries.len() as u64, Ordering::Relaxed);
                    warn!(
                        target: "geoversion::batch",
                        %batch_id,
                        space = %request.space,
                        error = %e,
                        "Batch aborted"
                    );
                    return Err(e);
                }
            }
        } else {
            self.execute_legacy(request, &planner)
        };

        let response = BatchResponse { batch_id, results };
        let committed = response.committed_count();
        let failed = response.failed_count();
        self.entries_committed
            .fetch_add(committed as u64, Ordering::Relaxed);
        self.entries_failed.fetch_add(failed as u64, Ordering::Relaxed);
        info!(
            target: "geoversion::batch",
            %batch_id,
            space = %request.space,
            committed,
            failed,
            "Batch completed"
        );
        Ok(response)
    }

    // ========================================================================
    // Transactional mode
    // ========================================================================

    fn execute_transactional(
        &self,
        batch_id: Uuid,
        request: &BatchRequest,
        planner: &EntryPlanner,
    ) -> GeoResult<Vec<EntryResult>> {
        let groups = group_by_feature(&request.entries);
        let deadline = Deadline::after(self.config.request_deadline());
        let abort = |index: usize, cause: GeoError| GeoError::BatchAborted {
            index,
            feature_id: request.entries[index].feature_id().to_string(),
            cause: Box::new(cause),
        };

        let mut attempt = 0;
        loop {
            let outcomes = self.run_groups(&groups, |group| {
                self.plan_group(request, planner, group)
            });
            let mut plans = Vec::with_capacity(request.entries.len());
            let mut failure: Option<(usize, GeoError)> = None;
            for outcome in outcomes {
                match outcome {
                    Ok(group_plans) => plans.extend(group_plans),
                    Err((index, e)) => {
                        if failure.as_ref().map_or(true, |(first, _)| index < *first) {
                            failure = Some((index, e));
                        }
                    }
                }
            }
            if let Some((index, cause)) = failure {
                return Err(abort(index, cause));
            }
            plans.sort_by_key(|(index, _)| *index);

            let writers: Vec<usize> = plans
                .iter()
                .enumerate()
                .filter(|(_, (_, plan))| plan.result().is_some())
                .map(|(pos, _)| pos)
                .collect();
            let requests: Vec<CommitRequest> = writers
                .iter()
                .filter_map(|&pos| {
                    let plan = &plans[pos].1;
                    plan.result()
                        .map(|f| CommitRequest::new(plan.expected_head, f.clone()))
                })
                .collect();
            let Some(&first_writer) = writers.first() else {
                return Ok(plans
                    .into_iter()
                    .map(|(index, plan)| EntryResult::from_plan(index, plan, None))
                    .collect());
            };

            let first_index = plans[first_writer].0;
            deadline
                .check(request.entries[first_index].feature_id())
                .map_err(|e| abort(first_index, e))?;

            let outcome = self
                .with_storage_retry("commit_all", &request.space, || {
                    self.storage.commit_all(&request.space, requests.clone())
                })
                .map_err(|e| abort(first_index, e))?;

            match outcome {
                BatchCommitOutcome::Committed(versions) => {
                    let mut versions_by_pos: HashMap<usize, Version> =
                        writers.into_iter().zip(versions).collect();
                    info!(
                        target: "geoversion::commit",
                        %batch_id,
                        space = %request.space,
                        features = requests.len(),
                        "Batch committed"
                    );
                    return Ok(plans
                        .into_iter()
                        .enumerate()
                        .map(|(pos, (index, plan))| {
                            EntryResult::from_plan(index, plan, versions_by_pos.remove(&pos))
                        })
                        .collect());
                }
                BatchCommitOutcome::HeadAdvanced { index, current } => {
                    let pos = writers.get(index).copied().unwrap_or(first_writer);
                    let (entry_index, plan) = &plans[pos];
                    if attempt >= self.config.max_commit_retries {
                        return Err(abort(
                            *entry_index,
                            GeoError::conflict(
                                plan.feature_id.clone(),
                                plan.expected_head.unwrap_or(0),
                                current.unwrap_or(0),
                            ),
                        ));
                    }
                    attempt += 1;
                    self.commit_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        target: "geoversion::commit",
                        %batch_id,
                        feature_id = %plan.feature_id,
                        expected = ?plan.expected_head,
                        ?current,
                        attempt,
                        "Head advanced during batch commit, re-planning"
                    );
                }
            }
        }
    }

    /// Plan every entry of one feature id against a chained tentative head
    fn plan_group(
        &self,
        request: &BatchRequest,
        planner: &EntryPlanner,
        group: &[usize],
    ) -> GroupResult {
        let Some(&first) = group.first() else {
            return Ok(Vec::new());
        };
        let feature_id = request.entries[first].feature_id();
        validate_feature_id(feature_id).map_err(|e| (first, e))?;
        let mut head = self
            .read(&request.space, feature_id, None)
            .map_err(|e| (first, e))?;

        let mut plans = Vec::with_capacity(group.len());
        for &index in group {
            let entry = &request.entries[index];
            let declaration = match entry.declared_base() {
                Some(v) => BaseDeclaration::Explicit(v),
                None => BaseDeclaration::Undeclared,
            };
            let base = self
                .load_base(&request.space, feature_id, declaration, head.as_ref())
                .map_err(|e| (index, e))?;
            let plan = planner
                .plan(
                    Snapshot {
                        input: &entry.input,
                        base: base.as_ref(),
                        head: head.as_ref(),
                        base_declaration: declaration,
                    },
                    &entry.effective_policies(&request.policies),
                    planner.context().now(),
                )
                .map_err(|e| (index, e))?;
            if let PlanOutcome::Commit(result) = &plan.outcome {
                head = Some(result.clone());
            }
            plans.push((index, plan));
        }
        Ok(plans)
    }

    // ========================================================================
    // Legacy mode
    // ========================================================================

    fn execute_legacy(
        &self,
        request: &BatchRequest,
        planner: &EntryPlanner,
    ) -> Vec<GeoResult<EntryResult>> {
        let groups = group_by_feature(&request.entries);
        let deadline = Deadline::after(self.config.request_deadline());
        let mut results: Vec<(usize, GeoResult<EntryResult>)> = self
            .run_groups(&groups, |group| {
                group
                    .iter()
                    .map(|&index| (index, self.apply_entry(request, planner, index, &deadline)))
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .flatten()
            .collect();
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// Plan and commit one entry, re-planning when its head moves
    ///
    /// Without a declared base and with conflict detection on, the head
    /// version seen at the first read becomes the entry's base and stays
    /// fixed across re-plans: a concurrent write then surfaces as drift.
    fn apply_entry(
        &self,
        request: &BatchRequest,
        planner: &EntryPlanner,
        index: usize,
        deadline: &Deadline,
    ) -> GeoResult<EntryResult> {
        let entry = &request.entries[index];
        let feature_id = entry.feature_id();
        validate_feature_id(feature_id)?;
        let space = &request.space;
        let policies = entry.effective_policies(&request.policies);
        let mut frozen: Option<BaseDeclaration> = None;
        let mut attempt = 0;

        loop {
            let head = self.read(space, feature_id, None)?;
            let declaration = *frozen.get_or_insert_with(|| match entry.declared_base() {
                Some(v) => BaseDeclaration::Explicit(v),
                None if request.conflict_detection => head
                    .as_ref()
                    .and_then(Feature::version)
                    .map_or(BaseDeclaration::Undeclared, BaseDeclaration::Implicit),
                None => BaseDeclaration::Undeclared,
            });
            let base = self.load_base(space, feature_id, declaration, head.as_ref())?;
            let plan = planner.plan(
                Snapshot {
                    input: &entry.input,
                    base: base.as_ref(),
                    head: head.as_ref(),
                    base_declaration: declaration,
                },
                &policies,
                planner.context().now(),
            )?;
            let commit = match plan.result() {
                Some(result) => CommitRequest::new(plan.expected_head, result.clone()),
                None => return Ok(EntryResult::from_plan(index, plan, None)),
            };

            deadline.check(feature_id)?;
            let outcome = self.with_storage_retry("commit", space, || {
                self.storage.commit(space, commit.clone())
            })?;
            match outcome {
                CommitOutcome::Committed(version) => {
                    debug!(
                        target: "geoversion::commit",
                        space = %space,
                        feature_id,
                        version,
                        "Entry committed"
                    );
                    return Ok(EntryResult::from_plan(index, plan, Some(version)));
                }
                CommitOutcome::HeadAdvanced { current } => {
                    if attempt >= self.config.max_commit_retries {
                        return Err(GeoError::conflict(
                            feature_id,
                            declaration
                                .version()
                                .or(plan.expected_head)
                                .unwrap_or(0),
                            current.unwrap_or(0),
                        ));
                    }
                    attempt += 1;
                    self.commit_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        target: "geoversion::commit",
                        space = %space,
                        feature_id,
                        expected = ?plan.expected_head,
                        ?current,
                        attempt,
                        "Head advanced during commit, re-planning"
                    );
                }
            }
        }
    }

    // ========================================================================
    // Storage access
    // ========================================================================

    fn read(
        &self,
        space: &SpaceId,
        feature_id: &str,
        at: Option<Version>,
    ) -> GeoResult<Option<Feature>> {
        self.with_storage_retry("get", space, || self.storage.get(space, feature_id, at))
    }

    /// Feature at the declared base version, taken from the tentative head
    /// when it is that version
    fn load_base(
        &self,
        space: &SpaceId,
        feature_id: &str,
        declaration: BaseDeclaration,
        head: Option<&Feature>,
    ) -> GeoResult<Option<Feature>> {
        let Some(version) = declaration.version() else {
            return Ok(None);
        };
        let base = match head.filter(|h| h.version() == Some(version)) {
            Some(h) => Some(h.clone()),
            None => self.read(space, feature_id, Some(version))?,
        };
        Ok(base.filter(|b| !b.is_tombstone()))
    }

    /// Repeat `call` while it fails with a retryable error, with backoff
    fn with_storage_retry<T>(
        &self,
        operation: &'static str,
        space: &SpaceId,
        mut call: impl FnMut() -> GeoResult<T>,
    ) -> GeoResult<T> {
        let mut attempt = 0;
        loop {
            match call() {
                Err(e) if e.is_retryable() && attempt < self.config.max_storage_retries => {
                    let delay = self.config.storage_retry_delay(attempt);
                    attempt += 1;
                    self.storage_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        target: "geoversion::storage",
                        operation,
                        space = %space,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Storage unavailable, retrying"
                    );
                    std::thread::sleep(delay);
                }
                other => return other,
            }
        }
    }

    fn run_groups<T, F>(&self, groups: &[Vec<usize>], work: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&[usize]) -> T + Sync + Send,
    {
        if self.config.parallel && groups.len() > 1 {
            groups.par_iter().map(|g| work(g.as_slice())).collect()
        } else {
            groups.iter().map(|g| work(g.as_slice())).collect()
        }
    }
}

/// Entry indices grouped by feature id, groups in order of first appearance
fn group_by_feature(entries: &[Entry]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let slot = *slots.entry(entry.feature_id()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }
    groups
}

fn validate_feature_id(feature_id: &str) -> GeoResult<()> {
    if feature_id.is_empty() {
        return Err(GeoError::validation("feature id must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoversion_core::{
        ConflictResolution, IfExists, IfNotExists, ManualClock, Timestamp,
    };
    use geoversion_storage::{InMemoryStore, SpaceConfig};

    fn setup(parallel: bool) -> (Arc<InMemoryStore>, BatchCoordinator) {
        let store = Arc::new(InMemoryStore::new());
        store.create_space("s", SpaceConfig::default()).unwrap();
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000)));
        let config = EngineConfig::new().with_parallel(parallel);
        let coordinator = BatchCoordinator::with_clock(store.clone(), config, clock);
        (store, coordinator)
    }

    #[test]
    fn test_group_by_feature_preserves_order() {
        let entries: Vec<Entry> = ["A", "B", "A", "C", "B"]
            .iter()
            .map(|id| Entry::new(Feature::new(*id)))
            .collect();
        assert_eq!(
            group_by_feature(&entries),
            vec![vec![0, 2], vec![1, 4], vec![3]]
        );
    }

    #[test]
    fn test_same_feature_entries_chain_in_one_batch() {
        let (store, coordinator) = setup(true);
        let request = BatchRequest::new("s", "alice")
            .feature(Feature::new("F").with_property("a", 1))
            .feature(Feature::new("F").with_property("b", 2))
            .feature(Feature::new("G"));
        let response = coordinator.execute(&request).unwrap();

        let versions: Vec<_> = response
            .successes()
            .map(|r| (r.feature_id.clone(), r.version))
            .collect();
        assert_eq!(
            versions,
            vec![
                ("F".to_string(), Some(1)),
                ("F".to_string(), Some(2)),
                ("G".to_string(), Some(1)),
            ]
        );
        let head = store.get(&SpaceId::new("s"), "F", None).unwrap().unwrap();
        assert_eq!(head.property("a"), Some(&serde_json::json!(1)));
        assert_eq!(head.property("b"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_retain_entries_do_not_write() {
        let (store, coordinator) = setup(false);
        let keep = Policies::new(IfNotExists::Retain, IfExists::Retain, ConflictResolution::Error);
        let request = BatchRequest::new("s", "alice")
            .policies(keep)
            .feature(Feature::new("F"));
        let response = coordinator.execute(&request).unwrap();
        let result = response.results[0].as_ref().unwrap();
        assert_eq!(result.action, Action::Retain);
        assert!(!result.is_committed());
        assert_eq!(store.space_head(&SpaceId::new("s")).unwrap(), 0);
    }

    #[test]
    fn test_transactional_abort_names_lowest_failing_entry() {
        let (_store, coordinator) = setup(true);
        let strict = Policies::new(IfNotExists::Error, IfExists::Replace, ConflictResolution::Error);
        let request = BatchRequest::new("s", "alice")
            .feature(Feature::new("A"))
            .entry(Entry::with_policies(Feature::new("B"), strict))
            .entry(Entry::with_policies(Feature::new("C"), strict));
        match coordinator.execute(&request).unwrap_err() {
            GeoError::BatchAborted {
                index,
                feature_id,
                cause,
            } => {
                assert_eq!(index, 1);
                assert_eq!(feature_id, "B");
                assert_eq!(cause.error_code(), "ClassificationError");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(coordinator.metrics().aborted_batches, 1);
    }

    #[test]
    fn test_empty_author_rejected() {
        let (_store, coordinator) = setup(false);
        let err = coordinator
            .execute(&BatchRequest::new("s", "  ").feature(Feature::new("F")))
            .unwrap_err();
        assert_eq!(err.error_code(), "ValidationError");
    }

    #[test]
    fn test_empty_feature_id_is_an_entry_error_in_legacy_mode() {
        let (_store, coordinator) = setup(false);
        let request = BatchRequest::new("s", "alice")
            .transactional(false)
            .feature(Feature::new(""))
            .feature(Feature::new("ok"));
        let response = coordinator.execute(&request).unwrap();
        assert!(response.results[0].is_err());
        assert_eq!(response.results[1].as_ref().unwrap().version, Some(1));
    }

    #[test]
    fn test_metrics_count_entries() {
        let (_store, coordinator) = setup(false);
        let request = BatchRequest::new("s", "alice")
            .transactional(false)
            .feature(Feature::new("A"))
            .feature(Feature::new("B"));
        coordinator.execute(&request).unwrap();
        let metrics = coordinator.metrics();
        assert_eq!(metrics.total_batches, 1);
        assert_eq!(metrics.entries_committed, 2);
        assert_eq!(metrics.entries_failed, 0);
        assert_eq!(metrics.success_rate(), 1.0);
    }

    #[test]
    fn test_deadline_check() {
        assert!(Deadline::after(None).check("F").is_ok());
        let passed = Deadline(Some(Instant::now()));
        assert_eq!(
            passed.check("F").unwrap_err(),
            GeoError::DeadlineExceeded {
                feature_id: "F".to_string()
            }
        );
    }
}

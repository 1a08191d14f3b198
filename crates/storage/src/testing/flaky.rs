//! Fault-injecting storage wrapper
//!
//! Wraps any [`FeatureStorage`] and, on demand:
//!
//! - fails the next N reads or commits with `StorageUnavailable`
//! - lands queued "concurrent" writes directly on the inner store right
//!   before the next commit, so the commit sees its head advanced
//!
//! Everything else is passed through unchanged. Call counters let tests
//! assert how often the engine retried.

use geoversion_core::{
    BatchCommitOutcome, CommitOutcome, CommitRequest, Feature, FeatureStorage, GeoError,
    GeoResult, SpaceId, SpaceStatistics, Version, VersionRange,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Storage wrapper injecting transient failures and interleaved writes
#[derive(Debug)]
pub struct FlakyStorage<S> {
    inner: Arc<S>,
    failing_reads: AtomicUsize,
    failing_commits: AtomicUsize,
    interleaved: Mutex<Vec<(SpaceId, Feature)>>,
    read_calls: AtomicUsize,
    commit_calls: AtomicUsize,
}

impl<S: FeatureStorage> FlakyStorage<S> {
    /// Wrap a store; no faults are armed
    pub fn new(inner: Arc<S>) -> Self {
        FlakyStorage {
            inner,
            failing_reads: AtomicUsize::new(0),
            failing_commits: AtomicUsize::new(0),
            interleaved: Mutex::new(Vec::new()),
            read_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Fail the next `n` read calls
    pub fn fail_next_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` commit calls (`commit` or `commit_all`)
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Queue a write that lands on the inner store just before the next commit
    pub fn interleave_write(&self, space: SpaceId, feature: Feature) {
        self.interleaved.lock().push((space, feature));
    }

    /// Number of read calls seen, failed ones included
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Number of commit calls seen, failed ones included
    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    fn take_fault(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn before_read(&self) -> GeoResult<()> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_fault(&self.failing_reads) {
            return Err(GeoError::storage_unavailable("injected read failure"));
        }
        Ok(())
    }

    fn before_commit(&self) -> GeoResult<()> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_fault(&self.failing_commits) {
            return Err(GeoError::storage_unavailable("injected commit failure"));
        }
        let pending: Vec<(SpaceId, Feature)> = std::mem::take(&mut *self.interleaved.lock());
        for (space, feature) in pending {
            let head = self.inner.head_version(&space, &feature.id)?;
            self.inner.commit(&space, CommitRequest::new(head, feature))?;
        }
        Ok(())
    }
}

impl<S: FeatureStorage> FeatureStorage for FlakyStorage<S> {
    fn get(
        &self,
        space: &SpaceId,
        feature_id: &str,
        at: Option<Version>,
    ) -> GeoResult<Option<Feature>> {
        self.before_read()?;
        self.inner.get(space, feature_id, at)
    }

    fn get_at_revision(
        &self,
        space: &SpaceId,
        feature_id: &str,
        revision: Version,
    ) -> GeoResult<Option<Feature>> {
        self.before_read()?;
        self.inner.get_at_revision(space, feature_id, revision)
    }

    fn history(
        &self,
        space: &SpaceId,
        feature_id: &str,
        revisions: VersionRange,
    ) -> GeoResult<Vec<Feature>> {
        self.before_read()?;
        self.inner.history(space, feature_id, revisions)
    }

    fn head_version(&self, space: &SpaceId, feature_id: &str) -> GeoResult<Option<Version>> {
        self.before_read()?;
        self.inner.head_version(space, feature_id)
    }

    fn space_head(&self, space: &SpaceId) -> GeoResult<Version> {
        self.before_read()?;
        self.inner.space_head(space)
    }

    fn commit(&self, space: &SpaceId, request: CommitRequest) -> GeoResult<CommitOutcome> {
        self.before_commit()?;
        self.inner.commit(space, request)
    }

    fn commit_all(
        &self,
        space: &SpaceId,
        requests: Vec<CommitRequest>,
    ) -> GeoResult<BatchCommitOutcome> {
        self.before_commit()?;
        self.inner.commit_all(space, requests)
    }

    fn statistics(&self, space: &SpaceId) -> GeoResult<SpaceStatistics> {
        self.before_read()?;
        self.inner.statistics(space)
    }
}

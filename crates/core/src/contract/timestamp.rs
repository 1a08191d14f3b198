//! Commit-time instants and the clock that produces them
//!
//! Namespace timestamps (`createdAt`, `updatedAt`) are milliseconds since the
//! Unix epoch, the resolution features carry on the wire.
//!
//! The engine never reads the system clock directly: it asks a [`Clock`].
//! Production code uses [`SystemClock`]; tests pin time with [`ManualClock`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Millisecond-precision instant
///
/// ## Invariants
///
/// - Always non-negative
/// - Totally ordered
/// - Zero is the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch if the system clock is before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_millis() as u64)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Milliseconds since Unix epoch
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// RFC 3339 rendering, used in log fields
    pub fn to_rfc3339(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(self.0 as i64) {
            Some(dt) => dt.to_rfc3339(),
            None => self.0.to_string(),
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Timestamp::from_millis(millis)
    }
}

/// Source of commit time
pub trait Clock: Send + Sync {
    /// The current instant
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: Timestamp) {
        self.millis.store(to.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_rfc3339() {
        assert_eq!(Timestamp::EPOCH.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_timestamp_serializes_as_number() {
        let ts = Timestamp::from_millis(1_234_567);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1234567");
        let restored: Timestamp = serde_json::from_str("1234567").unwrap();
        assert_eq!(ts, restored);
    }

    #[test]
    fn test_manual_clock_moves_only_on_request() {
        let clock = ManualClock::new(Timestamp::from_millis(10));
        assert_eq!(clock.now(), Timestamp::from_millis(10));
        assert_eq!(clock.now(), Timestamp::from_millis(10));
        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.now(), Timestamp::from_millis(15));
        clock.set(Timestamp::from_millis(1));
        assert_eq!(clock.now(), Timestamp::from_millis(1));
    }
}

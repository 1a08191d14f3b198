//! Shared helpers for engine integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use geoversion_core::{ManualClock, SpaceId, Timestamp};
use geoversion_engine::{Engine, EngineConfig};

/// Start of every test clock
pub const T0: Timestamp = Timestamp::from_millis(1_700_000_000_000);

/// Route engine logs to the test writer; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Engine on a manual clock with one space "s" that keeps every version
pub fn engine() -> (Engine, SpaceId, Arc<ManualClock>) {
    init_tracing();
    let clock = Arc::new(ManualClock::new(T0));
    let engine = Engine::with_clock(EngineConfig::default(), clock.clone()).unwrap();
    let space = engine.create_space("s", Some(10_000)).unwrap();
    (engine, space, clock)
}

/// Move a test clock forward by `ms`
pub fn tick(clock: &ManualClock, ms: u64) {
    clock.advance(Duration::from_millis(ms));
}

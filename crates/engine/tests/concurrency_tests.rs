//! Multi-threaded writers
//!
//! Many threads write the same and different features at once. Whatever the
//! interleaving, every feature's versions must form the gap-free sequence
//! 1..=n and no write may be lost.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::init_tracing;
use geoversion_core::{Feature, SpaceId};
use geoversion_engine::{BatchCoordinator, BatchRequest, Engine, EngineConfig, HistoryQuery, HistoryReader};
use proptest::prelude::*;
use static_assertions::assert_impl_all;

assert_impl_all!(Engine: Send, Sync);
assert_impl_all!(BatchCoordinator: Send, Sync);
assert_impl_all!(HistoryReader: Send, Sync);

fn contended_engine() -> (Arc<Engine>, SpaceId) {
    init_tracing();
    let config = EngineConfig::new().with_max_commit_retries(10_000);
    let engine = Engine::new(config).unwrap();
    let space = engine.create_space("s", Some(100_000)).unwrap();
    (Arc::new(engine), space)
}

fn versions(engine: &Engine, space: &SpaceId, id: &str) -> Vec<u64> {
    engine
        .read(space, id, "*", &HistoryQuery::new().limit(100_000))
        .unwrap()
        .iter()
        .filter_map(Feature::version)
        .collect()
}

#[test]
fn test_concurrent_patches_to_one_feature_lose_nothing() {
    const THREADS: usize = 8;
    const WRITES: usize = 25;
    let (engine, space) = contended_engine();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let space = space.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..WRITES {
                    let response = engine
                        .write(
                            &BatchRequest::new(space.clone(), format!("writer-{t}"))
                                .transactional(t % 2 == 0)
                                .feature(Feature::new("F").with_property(format!("t{t}"), i as u64)),
                        )
                        .unwrap();
                    assert!(response.results[0].is_ok());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let expected: Vec<u64> = (1..=(THREADS * WRITES) as u64).collect();
    assert_eq!(versions(&engine, &space, "F"), expected);

    let head = engine.head(&space, "F").unwrap().unwrap();
    for t in 0..THREADS {
        assert_eq!(
            head.property(&format!("t{t}")),
            Some(&serde_json::json!((WRITES - 1) as u64))
        );
    }
}

#[test]
fn test_concurrent_batches_over_shared_and_private_features() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 20;
    let (engine, space) = contended_engine();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let space = space.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    engine
                        .write(
                            &BatchRequest::new(space.clone(), "w")
                                .feature(Feature::new("shared"))
                                .feature(Feature::new(format!("own-{t}")))
                                .feature(Feature::new("shared")),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let shared: Vec<u64> = (1..=(THREADS * ROUNDS * 2) as u64).collect();
    assert_eq!(versions(&engine, &space, "shared"), shared);
    for t in 0..THREADS {
        let own: Vec<u64> = (1..=ROUNDS as u64).collect();
        assert_eq!(versions(&engine, &space, &format!("own-{t}")), own);
    }
    let stats = engine.statistics(&space).unwrap();
    assert_eq!(stats.feature_count, THREADS + 1);
    assert_eq!(stats.max_version, (THREADS * ROUNDS * 2) as u64);
}

// ============================================================================
// Monotonicity under arbitrary request sequences
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Upsert(usize),
    Delete(usize),
    Batch(Vec<usize>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3).prop_map(Op::Upsert),
        (0usize..3).prop_map(Op::Delete),
        proptest::collection::vec(0usize..3, 1..5).prop_map(Op::Batch),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn versions_are_gap_free_per_feature(ops in proptest::collection::vec(op(), 1..30)) {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let space = engine.create_space("s", Some(1_000)).unwrap();
        let delete = geoversion_core::Policies::new(
            geoversion_core::IfNotExists::Retain,
            geoversion_core::IfExists::Delete,
            geoversion_core::ConflictResolution::Error,
        );

        for op in ops {
            let request = match op {
                Op::Upsert(f) => BatchRequest::new(space.clone(), "p").feature(Feature::new(format!("f{f}"))),
                Op::Delete(f) => BatchRequest::new(space.clone(), "p")
                    .policies(delete)
                    .feature(Feature::new(format!("f{f}"))),
                Op::Batch(ids) => ids.into_iter().fold(
                    BatchRequest::new(space.clone(), "p").transactional(false),
                    |req, f| req.feature(Feature::new(format!("f{f}")).with_property("n", f as u64)),
                ),
            };
            engine.write(&request).unwrap();
        }

        for f in 0..3 {
            let seen = versions(&engine, &space, &format!("f{f}"));
            let expected: Vec<u64> = (1..=seen.len() as u64).collect();
            prop_assert_eq!(seen, expected);
        }
    }
}

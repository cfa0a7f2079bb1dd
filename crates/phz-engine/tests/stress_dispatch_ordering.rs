//! Stress test: ordered dispatch under contention.
//!
//! Many threads submit the results of a shuffled catalog to one
//! dispatcher. The handler must observe exactly the declared order, each
//! source once, with every buffered result flushed by the time the last
//! submission returns.
//!
//! **Workload:** 4000 sources, 16 submitting threads, submission order a
//! seeded shuffle, sources split round-robin over the threads.

use std::sync::Arc;
use std::thread;

use phz_core::{PhzError, SourceId};
use phz_engine::{OrderedDispatcher, RunConfig, RunContext};
use phz_model::{source, SourceResults};
use phz_test_utils::Recorder;
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SOURCES: u64 = 4000;
const THREADS: usize = 16;

fn bundle(id: SourceId) -> SourceResults {
    let mut results = SourceResults::new();
    results
        .set::<source::BestRegion>(format!("r{}", id.0))
        .unwrap();
    results
}

/// Submit `order` shuffled with `seed` from `threads` threads; return the
/// ids seen by the handler and the dispatcher's final flush count.
fn run(order: Vec<SourceId>, threads: usize, seed: u64) -> (Vec<SourceId>, usize) {
    let ctx = RunContext::new(RunConfig::default()).unwrap();
    let log = Recorder::new();
    let sink = log.clone();
    let handler = move |id: SourceId, results: &SourceResults| -> Result<(), PhzError> {
        assert_eq!(*results.get::<source::BestRegion>()?, format!("r{}", id.0));
        sink.push(id);
        Ok(())
    };
    let dispatcher = Arc::new(OrderedDispatcher::new(&ctx, order.clone(), handler).unwrap());

    let mut shuffled = order;
    shuffled.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let mine: Vec<SourceId> = shuffled.iter().skip(t).step_by(threads).copied().collect();
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for id in mine {
                    let results = bundle(id);
                    dispatcher.handle_source_output(id, &results).unwrap();
                    if id.0 % 7 == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    (log.snapshot(), dispatcher.flushed())
}

#[test]
fn handler_sees_declared_order_under_contention() {
    let order: Vec<SourceId> = (0..SOURCES).map(|i| SourceId(i * 3 + 1)).collect();
    let (seen, flushed) = run(order.clone(), THREADS, 17);
    assert_eq!(flushed, SOURCES as usize);
    assert_eq!(seen, order);
}

#[test]
fn reversed_submission_flushes_at_the_end() {
    let order: Vec<SourceId> = (0..500).map(SourceId).collect();
    let ctx = RunContext::new(RunConfig::default()).unwrap();
    let log = Recorder::new();
    let sink = log.clone();
    let handler = move |id: SourceId, _: &SourceResults| -> Result<(), PhzError> {
        sink.push(id);
        Ok(())
    };
    let dispatcher = OrderedDispatcher::new(&ctx, order.clone(), handler).unwrap();
    for id in order.iter().rev().take(499) {
        dispatcher.handle_source_output(*id, &bundle(*id)).unwrap();
    }
    assert!(log.is_empty());
    assert_eq!(dispatcher.pending(), 500);
    dispatcher.handle_source_output(SourceId(0), &bundle(SourceId(0))).unwrap();
    assert_eq!(log.snapshot(), order);
    assert_eq!(dispatcher.pending(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_interleaving_preserves_order(
        count in 1u64..200,
        threads in 1usize..8,
        seed in any::<u64>(),
    ) {
        let order: Vec<SourceId> = (0..count).rev().map(SourceId).collect();
        let (seen, flushed) = run(order.clone(), threads, seed);
        prop_assert_eq!(flushed, count as usize);
        prop_assert_eq!(seen, order);
    }
}

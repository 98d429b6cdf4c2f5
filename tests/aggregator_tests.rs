//! Concurrency tests for the coordinator's fairness window.

use std::sync::{Arc, Barrier};
use std::thread;

use adaptive_block_cache::conf::{InMemoryConfigStore, PropertyKey};
use adaptive_block_cache::master::{FairnessReport, FrequencyAggregator};
use adaptive_block_cache::metrics::Metrics;
use adaptive_block_cache::AccessFrequencyMap;

const THREADS: u64 = 8;
const MERGES_PER_THREAD: u64 = 50;
const WINDOW: u64 = 100;

fn aggregator(metrics: Metrics) -> Arc<FrequencyAggregator> {
    let store = Arc::new(
        InMemoryConfigStore::new()
            .with(PropertyKey::FairnessWindowSize, WINDOW)
            .with(PropertyKey::FairnessThreshold, 0.5)
            .with(PropertyKey::DynamicUpdateEnabled, true)
            .with(PropertyKey::DynamicSort, "LRU"),
    );
    Arc::new(FrequencyAggregator::new(store, metrics).unwrap())
}

/// Every thread merges `MERGES_PER_THREAD` single-block snapshots of `count`
/// accesses to its own block. Returns every report produced.
fn merge_concurrently(agg: &Arc<FrequencyAggregator>, count: u64) -> Vec<FairnessReport> {
    let barrier = Arc::new(Barrier::new(THREADS as usize));
    let handles: Vec<_> = (0..THREADS)
        .map(|block_id| {
            let agg = agg.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut reports = Vec::new();
                for _ in 0..MERGES_PER_THREAD {
                    let snapshot = AccessFrequencyMap::from([(block_id, count)]);
                    reports.extend(agg.merge(&snapshot));
                }
                reports
            })
        })
        .collect();

    handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect()
}

#[test]
fn test_concurrent_merges_close_exact_windows() {
    let metrics = Metrics::new().unwrap();
    let agg = aggregator(metrics.clone());

    let reports = merge_concurrently(&agg, 10);

    // 4,000 accesses in steps of 10 close a window at exactly 100 each time.
    assert_eq!(reports.len(), 40);
    assert_eq!(metrics.fairness_evaluations.get(), 40);
    assert!(reports.iter().all(|r| r.total_accesses == WINDOW));
    assert!(reports.iter().all(|r| r.blocks >= 1 && r.blocks <= THREADS as usize));
    assert_eq!(agg.window_total(), 0);
}

#[test]
fn test_concurrent_merges_account_for_every_access() {
    let metrics = Metrics::new().unwrap();
    let agg = aggregator(metrics.clone());

    let reports = merge_concurrently(&agg, 7);

    // Each window closes on the 15th merge of 7 (105 accesses); 400 merges
    // close 26 windows and leave 10 merges pending.
    let grand_total = THREADS * MERGES_PER_THREAD * 7;
    assert_eq!(reports.len(), 26);
    assert_eq!(metrics.fairness_evaluations.get(), 26);
    assert!(reports.iter().all(|r| r.total_accesses >= WINDOW));
    assert!(reports.iter().all(|r| r.total_accesses == 105));

    let closed: u64 = reports.iter().map(|r| r.total_accesses).sum();
    assert_eq!(closed + agg.window_total(), grand_total);
    assert_eq!(agg.window_total(), 70);
}

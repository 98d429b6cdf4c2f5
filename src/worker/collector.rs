//! Worker-side access-frequency collection.
//!
//! Every block read bumps a per-block counter. The heartbeat drains the
//! counters as one snapshot and ships them to the coordinator.
//!
//! The number of tracked blocks is bounded. When a new block would exceed the
//! bound, the entry inserted earliest is dropped, regardless of how hot it is.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::metrics::Metrics;
use crate::{AccessFrequencyMap, BlockId};

/// One generation of counters, replaced wholesale on drain.
#[derive(Default)]
struct FrequencyTable {
    counts: DashMap<BlockId, AtomicU64>,
    /// Insertion order of the keys in `counts`. Guards every insert and removal.
    order: Mutex<VecDeque<BlockId>>,
}

impl FrequencyTable {
    /// Add `n` to `block_id`, inserting it if absent. Returns the evicted block, if any.
    fn add(&self, block_id: BlockId, n: u64, max_blocks: usize) -> Option<BlockId> {
        let mut order = self.order.lock();

        // Another thread may have inserted while we waited for the lock.
        if let Some(count) = self.counts.get(&block_id) {
            count.fetch_add(n, Ordering::Relaxed);
            return None;
        }

        let mut evicted = None;
        if order.len() >= max_blocks {
            if let Some(victim) = order.pop_front() {
                self.counts.remove(&victim);
                evicted = Some(victim);
            }
        }
        self.counts.insert(block_id, AtomicU64::new(n));
        order.push_back(block_id);
        evicted
    }
}

/// Bounded, concurrently-updatable access counter for one worker.
pub struct BlockFrequencyCollector {
    /// Increments hold the read side; drain takes the write side to swap in a
    /// fresh table, so no increment straddles the swap.
    table: RwLock<FrequencyTable>,
    max_blocks: usize,
    metrics: Metrics,
}

impl BlockFrequencyCollector {
    /// Create a collector tracking at most `max_blocks` distinct blocks.
    pub fn new(max_blocks: NonZeroUsize, metrics: Metrics) -> Self {
        Self {
            table: RwLock::new(FrequencyTable::default()),
            max_blocks: max_blocks.get(),
            metrics,
        }
    }

    /// Count one access to `block_id`.
    pub fn record_access(&self, block_id: BlockId) {
        self.add(block_id, 1);
    }

    fn add(&self, block_id: BlockId, n: u64) {
        let table = self.table.read();
        if let Some(count) = table.counts.get(&block_id) {
            count.fetch_add(n, Ordering::Relaxed);
            return;
        }
        if let Some(victim) = table.add(block_id, n, self.max_blocks) {
            self.metrics.collector_evictions.inc();
            debug!(block_id, evicted = victim, "Frequency collector full, dropped oldest entry");
        }
    }

    /// Take every counter collected so far and start again from empty.
    pub fn drain(&self) -> AccessFrequencyMap {
        let old = std::mem::take(&mut *self.table.write());
        let snapshot: AccessFrequencyMap = old
            .counts
            .into_iter()
            .map(|(block_id, count)| (block_id, count.into_inner()))
            .collect();

        if !snapshot.is_empty() {
            debug!(blocks = snapshot.len(), "Drained access frequencies");
        }
        snapshot
    }

    /// Put a snapshot back, e.g. after the heartbeat carrying it failed.
    pub fn restore(&self, snapshot: AccessFrequencyMap) {
        for (block_id, count) in snapshot {
            if count > 0 {
                self.add(block_id, count);
            }
        }
    }

    /// Current count for `block_id`.
    pub fn frequency(&self, block_id: BlockId) -> u64 {
        self.table
            .read()
            .counts
            .get(&block_id)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Number of distinct blocks currently tracked.
    pub fn len(&self) -> usize {
        self.table.read().counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector(max: usize) -> BlockFrequencyCollector {
        BlockFrequencyCollector::new(NonZeroUsize::new(max).unwrap(), Metrics::new().unwrap())
    }

    #[test]
    fn test_repeat_access_increments() {
        let c = collector(10);
        c.record_access(7);
        c.record_access(7);
        c.record_access(8);
        assert_eq!(c.frequency(7), 2);
        assert_eq!(c.frequency(8), 1);
        assert_eq!(c.frequency(9), 0);
    }

    #[test]
    fn test_bound_evicts_in_insertion_order() {
        let c = collector(3);
        for id in [1, 2, 3] {
            c.record_access(id);
        }
        // Block 1 is the hottest but was inserted first.
        for _ in 0..10 {
            c.record_access(1);
        }
        c.record_access(4);

        assert_eq!(c.len(), 3);
        assert_eq!(c.frequency(1), 0);
        assert_eq!(c.frequency(4), 1);
        assert_eq!(c.metrics.collector_evictions.get(), 1);
    }

    #[test]
    fn test_second_drain_is_empty() {
        let c = collector(10);
        c.record_access(1);
        c.record_access(1);

        let first = c.drain();
        assert_eq!(first.get(&1), Some(&2));
        assert!(c.drain().is_empty());
        assert!(c.is_empty());
    }

    #[test]
    fn test_restore_adds_back() {
        let c = collector(10);
        c.record_access(1);
        let snapshot = c.drain();
        c.record_access(1);
        c.restore(snapshot);
        assert_eq!(c.frequency(1), 2);
    }
}

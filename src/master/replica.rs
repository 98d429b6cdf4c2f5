//! Pending replica-count changes, delivered to workers on their next heartbeat.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::{BlockId, WorkerId};

/// Accumulates replica-count deltas per worker until they are collected.
#[derive(Debug, Default)]
pub struct ReplicaTracker {
    pending: Mutex<HashMap<WorkerId, HashMap<BlockId, i64>>>,
}

impl ReplicaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note that `block_id` on `worker_id` gained (or lost, if negative) `delta` replicas.
    pub fn record(&self, worker_id: WorkerId, block_id: BlockId, delta: i64) {
        let mut pending = self.pending.lock();
        let blocks = pending.entry(worker_id).or_default();
        let entry = blocks.entry(block_id).or_insert(0);
        *entry = entry.saturating_add(delta);
        if *entry == 0 {
            blocks.remove(&block_id);
        }
        debug!(worker_id, block_id, delta, "Recorded replica change");
    }

    /// Take every pending change for `worker_id`.
    pub fn drain(&self, worker_id: WorkerId) -> HashMap<BlockId, i64> {
        self.pending.lock().remove(&worker_id).unwrap_or_default()
    }

    /// Number of blocks with a pending change for `worker_id`.
    pub fn pending(&self, worker_id: WorkerId) -> usize {
        self.pending.lock().get(&worker_id).map_or(0, HashMap::len)
    }
}

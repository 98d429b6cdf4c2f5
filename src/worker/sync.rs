//! Worker side of the heartbeat.
//!
//! Each beat drains the frequency collector, sends the snapshot to the
//! coordinator, and applies the answer: composite ratio through the
//! reconfiguration hook, policy label through the block set, replica deltas
//! block by block.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::collector::BlockFrequencyCollector;
use super::evictor::SortedBlockSet;
use crate::conf::{ConfigStore, PropertyKey, ReconfigurableRegistry, Source};
use crate::heartbeat::{HeartbeatError, HeartbeatRequest, HeartbeatResponse, HeartbeatTransport};
use crate::metrics::Metrics;
use crate::WorkerId;

/// Drives one worker's heartbeats.
pub struct WorkerSync {
    worker_id: WorkerId,
    collector: Arc<BlockFrequencyCollector>,
    blocks: Arc<SortedBlockSet>,
    store: Arc<dyn ConfigStore>,
    registry: Arc<ReconfigurableRegistry>,
    transport: Arc<dyn HeartbeatTransport>,
    metrics: Metrics,
}

impl WorkerSync {
    pub fn new(
        worker_id: WorkerId,
        collector: Arc<BlockFrequencyCollector>,
        blocks: Arc<SortedBlockSet>,
        store: Arc<dyn ConfigStore>,
        registry: Arc<ReconfigurableRegistry>,
        transport: Arc<dyn HeartbeatTransport>,
        metrics: Metrics,
    ) -> Self {
        Self {
            worker_id,
            collector,
            blocks,
            store,
            registry,
            transport,
            metrics,
        }
    }

    /// Send one heartbeat and apply the response.
    ///
    /// On failure the drained counts are put back for the next attempt.
    pub async fn heartbeat(&self) -> Result<HeartbeatResponse, HeartbeatError> {
        let frequencies = self.collector.drain();
        let request = HeartbeatRequest {
            worker_id: self.worker_id,
            frequencies: frequencies.clone(),
        };

        match self.transport.heartbeat(request).await {
            Ok(response) => {
                self.apply(&response);
                Ok(response)
            }
            Err(e) => {
                self.metrics.heartbeat_failures.inc();
                warn!(worker_id = self.worker_id, "Heartbeat failed: {e}");
                self.collector.restore(frequencies);
                Err(e)
            }
        }
    }

    fn apply(&self, response: &HeartbeatResponse) {
        if let Some(ratio) = response.composite_ratio() {
            self.apply_composite_ratio(ratio);
        }

        match response.policy() {
            Some(Ok(label)) => {
                self.store
                    .set(PropertyKey::DynamicSort, label.as_str().into(), Source::ClusterDefault);
                self.blocks.switch_policy(label);
            }
            Some(Err(e)) => warn!("Ignoring policy from coordinator: {e}"),
            None => {}
        }

        for (&block_id, &delta) in response.replica_info() {
            self.blocks.on_replica_change(block_id, delta);
        }

        if let Some(command) = response.command() {
            debug!(command = %command.command_type, blocks = command.data.len(), "Coordinator command received");
        }
    }

    fn apply_composite_ratio(&self, ratio: f64) {
        let current = self.store.get_double(PropertyKey::CompositeRatio).ok();
        if current == Some(ratio) {
            return;
        }
        self.store
            .set(PropertyKey::CompositeRatio, ratio.into(), Source::ClusterDefault);
        let updated = self.registry.update(self.store.as_ref());
        self.metrics.annotator_reconfigurations.inc_by(updated as u64);
        info!(ratio, listeners = updated, "Applied composite ratio from coordinator");
    }

    /// Heartbeat every `interval` until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(worker_id = self.worker_id, interval_ms = interval.as_millis() as u64, "Heartbeat loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are logged and counted inside; the next tick retries.
                    let _ = self.heartbeat().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(worker_id = self.worker_id, "Heartbeat loop stopped");
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }
}

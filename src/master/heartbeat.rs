//! Coordinator side of the worker heartbeat.
//!
//! Each heartbeat folds the worker's access counts into the fairness window
//! and answers with what the worker needs to stay in step: pending replica
//! changes, the composite ratio and the active policy label.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::aggregator::{FairnessReport, FrequencyAggregator};
use super::replica::ReplicaTracker;
use crate::conf::{ConfigError, ConfigStore, PropertyKey};
use crate::heartbeat::{Command, HeartbeatRequest, HeartbeatResponse};
use crate::metrics::Metrics;
use crate::WorkerId;

/// Handles worker heartbeats on the coordinator.
pub struct MasterHeartbeatHandler {
    aggregator: FrequencyAggregator,
    replicas: ReplicaTracker,
    commands: Mutex<HashMap<WorkerId, VecDeque<Command>>>,
    store: Arc<dyn ConfigStore>,
    last_report: Mutex<Option<FairnessReport>>,
}

impl MasterHeartbeatHandler {
    pub fn new(store: Arc<dyn ConfigStore>, metrics: Metrics) -> Result<Self, ConfigError> {
        Ok(Self {
            aggregator: FrequencyAggregator::new(store.clone(), metrics)?,
            replicas: ReplicaTracker::new(),
            commands: Mutex::new(HashMap::new()),
            store,
            last_report: Mutex::new(None),
        })
    }

    /// Fold in one worker's report and build its answer. Never fails: a
    /// missing ratio or policy entry is simply left out of the response.
    pub fn handle(&self, request: HeartbeatRequest) -> HeartbeatResponse {
        let HeartbeatRequest {
            worker_id,
            frequencies,
        } = request;
        debug!(worker_id, blocks = frequencies.len(), "Worker heartbeat");

        if let Some(report) = self.aggregator.merge(&frequencies) {
            *self.last_report.lock() = Some(report);
        }

        let mut response =
            HeartbeatResponse::new().with_replica_info(self.replicas.drain(worker_id));
        if let Some(command) = self.next_command(worker_id) {
            response = response.with_command(command);
        }
        if let Ok(ratio) = self.store.get_double(PropertyKey::CompositeRatio) {
            response = response.with_composite_ratio(ratio);
        }
        if let Ok(policy) = self.store.get_string(PropertyKey::DynamicSort) {
            response = response.with_dynamic_sort(policy);
        }
        response
    }

    /// Queue a command for `worker_id`'s next heartbeat.
    pub fn enqueue_command(&self, worker_id: WorkerId, command: Command) {
        self.commands
            .lock()
            .entry(worker_id)
            .or_default()
            .push_back(command);
    }

    fn next_command(&self, worker_id: WorkerId) -> Option<Command> {
        self.commands.lock().get_mut(&worker_id)?.pop_front()
    }

    pub fn aggregator(&self) -> &FrequencyAggregator {
        &self.aggregator
    }

    pub fn replicas(&self) -> &ReplicaTracker {
        &self.replicas
    }

    /// The most recent completed fairness window.
    pub fn last_report(&self) -> Option<FairnessReport> {
        self.last_report.lock().clone()
    }
}

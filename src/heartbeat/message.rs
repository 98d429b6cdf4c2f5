//! Heartbeat payloads exchanged between worker and coordinator.
//!
//! Only the fields the adaptive loop reads and writes are modelled. The wire
//! encoding belongs to the transport.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::policy::{PolicyLabel, UnknownPolicy};
use crate::{AccessFrequencyMap, BlockId, WorkerId};

/// A coordinator command. Opaque to the eviction loop and passed through as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command_type: String,
    pub data: Vec<BlockId>,
}

impl Command {
    pub fn new(command_type: impl Into<String>, data: Vec<BlockId>) -> Self {
        Self {
            command_type: command_type.into(),
            data,
        }
    }
}

/// Worker → coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub worker_id: WorkerId,
    /// Access counts drained since the previous heartbeat.
    pub frequencies: AccessFrequencyMap,
}

/// Coordinator → worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    command: Option<Command>,
    replica_info: HashMap<BlockId, i64>,
    composite_ratio: Option<f64>,
    dynamic_sort: Option<String>,
}

impl HeartbeatResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    /// Replica-count deltas per block for the receiving worker.
    pub fn with_replica_info(mut self, replica_info: HashMap<BlockId, i64>) -> Self {
        self.replica_info = replica_info;
        self
    }

    pub fn with_composite_ratio(mut self, ratio: f64) -> Self {
        self.composite_ratio = Some(ratio);
        self
    }

    pub fn with_dynamic_sort(mut self, policy: impl Into<String>) -> Self {
        self.dynamic_sort = Some(policy.into());
        self
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn replica_info(&self) -> &HashMap<BlockId, i64> {
        &self.replica_info
    }

    /// The composite ratio currently in effect on the coordinator.
    pub fn composite_ratio(&self) -> Option<f64> {
        self.composite_ratio
    }

    /// The raw policy label currently in effect on the coordinator.
    pub fn dynamic_sort(&self) -> Option<&str> {
        self.dynamic_sort.as_deref()
    }

    /// The policy label, parsed. `None` if the coordinator sent none.
    pub fn policy(&self) -> Option<Result<PolicyLabel, UnknownPolicy>> {
        self.dynamic_sort().map(str::parse::<PolicyLabel>)
    }
}

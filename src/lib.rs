//! adaptive-block-cache: the adaptive block-replacement loop of a distributed cache.
//!
//! Workers count block accesses and score blocks for eviction. Periodically
//! each worker reports its counts to the coordinator, which measures how
//! evenly accesses are spread (Jain's fairness index) and flips the active
//! eviction policy when the distribution changes character. Workers pick up
//! the new policy and the composite blend ratio from the heartbeat response
//! without restarting.
//!
//! Workers: [`worker::BlockWorker`]. Coordinator: [`master::MasterHeartbeatHandler`].

pub mod conf;
pub mod config;
pub mod heartbeat;
pub mod master;
pub mod metrics;
pub mod policy;
pub mod telemetry;
pub mod worker;

use std::collections::HashMap;

/// Externally assigned block identifier.
pub type BlockId = u64;

/// Worker identifier, as known to the coordinator.
pub type WorkerId = u64;

/// Per-block access counts.
pub type AccessFrequencyMap = HashMap<BlockId, u64>;

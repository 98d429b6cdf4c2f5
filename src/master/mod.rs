//! Coordinator-side components of the adaptive eviction loop.
//!
//! - [`aggregator`]: folds worker access counts into a fairness window
//! - [`fairness`]: Jain's index and the policy decision rule
//! - [`policy_switch`]: writes decisions into dynamic configuration
//! - [`replica`]: replica-count changes awaiting delivery to workers
//! - [`heartbeat`]: answers worker heartbeats

pub mod aggregator;
pub mod fairness;
pub mod heartbeat;
pub mod policy_switch;
pub mod replica;

pub use aggregator::{FairnessReport, FrequencyAggregator};
pub use fairness::{jain_index, FairnessEvaluator, PolicyDecision};
pub use heartbeat::MasterHeartbeatHandler;
pub use policy_switch::{PolicySwitch, SwitchOutcome};
pub use replica::ReplicaTracker;

//! Prometheus observability hooks for the adaptive eviction loop.
//!
//! A [`Metrics`] handle owns its own registry and is cloned into each
//! component. Rejected policy switches and failed heartbeats are counted here
//! so an inert feedback loop is visible from outside.

use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};

/// Counters and gauges shared by the worker and coordinator components.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub fairness_evaluations: IntCounter,
    pub fairness_index: Gauge,
    pub policy_switches: IntCounter,
    pub policy_switches_rejected: IntCounter,
    pub collector_evictions: IntCounter,
    pub heartbeat_failures: IntCounter,
    pub annotator_reconfigurations: IntCounter,
}

impl Metrics {
    /// Create a handle backed by a fresh registry.
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Register all metrics into `registry`.
    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let fairness_evaluations = IntCounter::new(
            "fairness_evaluations_total",
            "Fairness windows evaluated by the coordinator",
        )?;
        let fairness_index = Gauge::new("fairness_index", "Jain fairness index of the last window")?;
        let policy_switches = IntCounter::new(
            "policy_switches_total",
            "Policy label changes written to dynamic configuration",
        )?;
        let policy_switches_rejected = IntCounter::new(
            "policy_switches_rejected_total",
            "Policy label changes discarded because dynamic updates were not permitted",
        )?;
        let collector_evictions = IntCounter::new(
            "collector_evictions_total",
            "Entries dropped from the access-frequency collector to honour its bound",
        )?;
        let heartbeat_failures = IntCounter::new(
            "heartbeat_failures_total",
            "Worker heartbeats that failed to reach the coordinator",
        )?;
        let annotator_reconfigurations = IntCounter::new(
            "annotator_reconfigurations_total",
            "Runtime reconfigurations applied to block annotators",
        )?;

        registry.register(Box::new(fairness_evaluations.clone()))?;
        registry.register(Box::new(fairness_index.clone()))?;
        registry.register(Box::new(policy_switches.clone()))?;
        registry.register(Box::new(policy_switches_rejected.clone()))?;
        registry.register(Box::new(collector_evictions.clone()))?;
        registry.register(Box::new(heartbeat_failures.clone()))?;
        registry.register(Box::new(annotator_reconfigurations.clone()))?;

        Ok(Self {
            registry,
            fairness_evaluations,
            fairness_index,
            policy_switches,
            policy_switches_rejected,
            collector_evictions,
            heartbeat_failures,
            annotator_reconfigurations,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn gather_text(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("fairness_evaluations", &self.fairness_evaluations.get())
            .field("policy_switches", &self.policy_switches.get())
            .field("policy_switches_rejected", &self.policy_switches_rejected.get())
            .finish_non_exhaustive()
    }
}

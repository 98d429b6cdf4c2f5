//! Static configuration for adaptive-block-cache.
//!
//! Configuration is loaded from a JSON file or constructed programmatically,
//! validated, and then used to seed a [`ConfigStore`]. Every tuning knob of
//! the feedback loop (window size, thresholds, decay parameters) lives here.
//!
//! The `annotator` section is required in a file and its scoring parameters
//! have no file defaults: a wrong decay or ratio silently corrupts eviction
//! order, so a missing one fails the load. The other sections may be omitted.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::conf::{ConfigError, ConfigStore, PropertyKey, Source};
use crate::policy::PolicyLabel;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Worker-side access-frequency collection.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Coordinator-side fairness evaluation.
    #[serde(default)]
    pub fairness: FairnessConfig,

    /// Eviction scoring.
    pub annotator: AnnotatorConfig,

    /// Heartbeat scheduling.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Global switch for runtime configuration updates.
    #[serde(default = "default_dynamic_update_enabled")]
    pub dynamic_update_enabled: bool,
}

fn default_dynamic_update_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collector: CollectorConfig::default(),
            fairness: FairnessConfig::default(),
            annotator: AnnotatorConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            dynamic_update_enabled: default_dynamic_update_enabled(),
        }
    }
}

/// Access-frequency collector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Maximum distinct blocks tracked between two heartbeats.
    pub max_tracked_blocks: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_tracked_blocks: 100,
        }
    }
}

/// Fairness window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessConfig {
    /// Total accesses accumulated before an evaluation fires.
    pub window_size: u64,

    /// Jain index above which the replica-aware policy is preferred.
    pub threshold: f64,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            threshold: 0.5,
        }
    }
}

/// Composite annotator tuning. Only `policy` may be omitted from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Blend between LRFU decay (0.0) and replica-weighted recency (1.0).
    pub composite_ratio: f64,

    /// Closer to 0 behaves like LFU, closer to 1 like LRU.
    pub lrfu_step_factor: f64,

    /// Base of the decay; at least 2.
    pub lrfu_attenuation_factor: f64,

    /// Weight of the logical clock in the replica-weighted term.
    pub replica_lru_ratio: f64,

    /// Weight of the replica count in the replica-weighted term.
    pub replica_replica_ratio: f64,

    /// Policy the workers start with.
    #[serde(default = "default_policy")]
    pub policy: PolicyLabel,
}

fn default_policy() -> PolicyLabel {
    PolicyLabel::Lru
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            composite_ratio: 0.5,
            lrfu_step_factor: 0.25,
            lrfu_attenuation_factor: 2.0,
            replica_lru_ratio: 1.0,
            replica_replica_ratio: 1.0,
            policy: default_policy(),
        }
    }
}

/// Heartbeat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Interval between worker heartbeats.
    pub interval_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing file, a missing scoring parameter or an out-of-range value is
    /// an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        tracing::info!(path = %path.display(), policy = %config.annotator.policy, "Configuration loaded");
        Ok(config)
    }

    /// Range-check every tuning parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.annotator;
        check_unit(PropertyKey::CompositeRatio, a.composite_ratio)?;
        check_unit(PropertyKey::LrfuStepFactor, a.lrfu_step_factor)?;
        check_unit(PropertyKey::FairnessThreshold, self.fairness.threshold)?;
        check_attenuation(a.lrfu_attenuation_factor)?;
        check_finite(PropertyKey::ReplicaLruRatio, a.replica_lru_ratio)?;
        check_finite(PropertyKey::ReplicaReplicaRatio, a.replica_replica_ratio)?;
        check_positive(PropertyKey::FairnessWindowSize, self.fairness.window_size)?;
        check_positive(PropertyKey::CollectorMaxBlocks, self.collector.max_tracked_blocks)?;
        Ok(())
    }

    /// Write every entry into `store`, tagged as coming from the site file.
    pub fn seed_store(&self, store: &dyn ConfigStore) {
        let a = &self.annotator;
        let entries: [(PropertyKey, crate::conf::ConfigValue); 10] = [
            (PropertyKey::FairnessWindowSize, self.fairness.window_size.into()),
            (PropertyKey::FairnessThreshold, self.fairness.threshold.into()),
            (PropertyKey::CompositeRatio, a.composite_ratio.into()),
            (PropertyKey::LrfuStepFactor, a.lrfu_step_factor.into()),
            (PropertyKey::LrfuAttenuationFactor, a.lrfu_attenuation_factor.into()),
            (PropertyKey::ReplicaLruRatio, a.replica_lru_ratio.into()),
            (PropertyKey::ReplicaReplicaRatio, a.replica_replica_ratio.into()),
            (PropertyKey::DynamicUpdateEnabled, self.dynamic_update_enabled.into()),
            (PropertyKey::DynamicSort, a.policy.as_str().into()),
            (PropertyKey::CollectorMaxBlocks, self.collector.max_tracked_blocks.into()),
        ];
        for (key, value) in entries {
            store.set(key, value, Source::SiteProperty);
        }
    }
}

pub(crate) fn check_unit(key: PropertyKey, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(key, value, "[0, 1]"))
    }
}

pub(crate) fn check_attenuation(value: f64) -> Result<(), ConfigError> {
    if value >= 2.0 && value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(PropertyKey::LrfuAttenuationFactor, value, "[2, inf)"))
    }
}

pub(crate) fn check_finite(key: PropertyKey, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(key, value, "finite values"))
    }
}

fn check_positive(key: PropertyKey, value: u64) -> Result<(), ConfigError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(out_of_range(key, value, "[1, inf)"))
    }
}

fn out_of_range(key: PropertyKey, value: impl ToString, range: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        key,
        value: value.to_string(),
        range,
    }
}

//! Property keys understood by the dynamic configuration store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A configuration entry relevant to the adaptive eviction loop.
///
/// Each key has a stable dotted name and a flag saying whether it may be
/// changed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKey {
    /// Number of accesses the coordinator accumulates before evaluating fairness.
    FairnessWindowSize,
    /// Jain index above which the coordinator prefers the replica-aware policy.
    FairnessThreshold,
    /// Blend between LRFU decay (0.0) and replica-weighted recency (1.0).
    CompositeRatio,
    /// LRFU step factor, in [0, 1].
    LrfuStepFactor,
    /// LRFU attenuation factor, at least 2.
    LrfuAttenuationFactor,
    /// Weight of the logical clock in the replica-weighted term.
    ReplicaLruRatio,
    /// Weight of the replica count in the replica-weighted term.
    ReplicaReplicaRatio,
    /// Global switch for runtime configuration updates.
    DynamicUpdateEnabled,
    /// Label of the active eviction policy.
    DynamicSort,
    /// Maximum distinct blocks tracked by a worker's frequency collector.
    CollectorMaxBlocks,
}

impl PropertyKey {
    /// Every known key.
    pub const ALL: [PropertyKey; 10] = [
        PropertyKey::FairnessWindowSize,
        PropertyKey::FairnessThreshold,
        PropertyKey::CompositeRatio,
        PropertyKey::LrfuStepFactor,
        PropertyKey::LrfuAttenuationFactor,
        PropertyKey::ReplicaLruRatio,
        PropertyKey::ReplicaReplicaRatio,
        PropertyKey::DynamicUpdateEnabled,
        PropertyKey::DynamicSort,
        PropertyKey::CollectorMaxBlocks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PropertyKey::FairnessWindowSize => "master.block.meta.fairness.window.size",
            PropertyKey::FairnessThreshold => "master.block.meta.fairness.threshold",
            PropertyKey::CompositeRatio => "worker.block.annotator.composite.ratio",
            PropertyKey::LrfuStepFactor => "worker.block.annotator.lrfu.step.factor",
            PropertyKey::LrfuAttenuationFactor => "worker.block.annotator.lrfu.attenuation.factor",
            PropertyKey::ReplicaLruRatio => "worker.block.annotator.replica.lru.ratio",
            PropertyKey::ReplicaReplicaRatio => "worker.block.annotator.replica.replica.ratio",
            PropertyKey::DynamicUpdateEnabled => "conf.dynamic.update.enabled",
            PropertyKey::DynamicSort => "worker.block.annotator.dynamic.sort",
            PropertyKey::CollectorMaxBlocks => "worker.block.frequency.collector.max.blocks",
        }
    }

    /// Whether this entry may be rewritten while the cluster is running.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            PropertyKey::FairnessThreshold | PropertyKey::CompositeRatio | PropertyKey::DynamicSort
        )
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = PropertyKey::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), PropertyKey::ALL.len());
    }

    #[test]
    fn test_tuning_parameters_are_static() {
        assert!(!PropertyKey::LrfuStepFactor.is_dynamic());
        assert!(!PropertyKey::LrfuAttenuationFactor.is_dynamic());
        assert!(PropertyKey::CompositeRatio.is_dynamic());
        assert!(PropertyKey::DynamicSort.is_dynamic());
    }
}

//! Coordinator-side aggregation of worker access frequencies.
//!
//! Worker snapshots are folded into a running window. Once the window has
//! seen `window_size` accesses, its per-block totals are scored for fairness,
//! the decision is handed to the [`PolicySwitch`], and the window restarts.
//!
//! Merge, evaluation and reset form one critical section: no merge can see a
//! half-reset window, and an evaluation never races a merge.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::fairness::{FairnessEvaluator, PolicyDecision};
use super::policy_switch::{PolicySwitch, SwitchOutcome};
use crate::conf::{ConfigError, ConfigStore, PropertyKey};
use crate::config::check_unit;
use crate::metrics::Metrics;
use crate::policy::PolicyLabel;
use crate::{AccessFrequencyMap, BlockId};

/// Running totals of the current window.
#[derive(Debug, Default)]
struct FrequencyWindow {
    totals: HashMap<BlockId, u64>,
    total: u64,
}

impl FrequencyWindow {
    fn fold(&mut self, snapshot: &AccessFrequencyMap) {
        for (&block_id, &count) in snapshot {
            if count == 0 {
                continue;
            }
            let entry = self.totals.entry(block_id).or_insert(0);
            *entry = entry.saturating_add(count);
            self.total = self.total.saturating_add(count);
        }
    }

    fn reset(&mut self) {
        self.totals.clear();
        self.total = 0;
    }
}

/// Result of a window that reached its threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct FairnessReport {
    /// Jain fairness index of the window.
    pub index: f64,
    /// Distinct blocks in the window.
    pub blocks: usize,
    /// Accesses in the window.
    pub total_accesses: u64,
    /// Policy recorded as active when the window was evaluated.
    pub previous: Option<PolicyLabel>,
    pub decision: PolicyDecision,
    pub outcome: SwitchOutcome,
}

/// Folds worker snapshots into a fairness window and drives policy switches.
pub struct FrequencyAggregator {
    window: Mutex<FrequencyWindow>,
    window_size: u64,
    startup_threshold: f64,
    store: Arc<dyn ConfigStore>,
    switch: PolicySwitch,
    metrics: Metrics,
}

impl FrequencyAggregator {
    /// Build from configuration. Window size and fairness threshold are required.
    pub fn new(store: Arc<dyn ConfigStore>, metrics: Metrics) -> Result<Self, ConfigError> {
        let window_size = store.get_u64(PropertyKey::FairnessWindowSize)?;
        let startup_threshold = store.get_double(PropertyKey::FairnessThreshold)?;
        check_unit(PropertyKey::FairnessThreshold, startup_threshold)?;

        info!(window_size, threshold = startup_threshold, "Fairness aggregator ready");
        Ok(Self {
            window: Mutex::new(FrequencyWindow::default()),
            window_size,
            startup_threshold,
            switch: PolicySwitch::new(store.clone(), metrics.clone()),
            store,
            metrics,
        })
    }

    /// The threshold is dynamic; fall back to the startup value if the store
    /// no longer holds a usable one.
    fn threshold(&self) -> f64 {
        match self.store.get_double(PropertyKey::FairnessThreshold) {
            Ok(t) if (0.0..=1.0).contains(&t) => t,
            Ok(t) => {
                warn!(threshold = t, "Fairness threshold out of range, using startup value");
                self.startup_threshold
            }
            Err(e) => {
                warn!("{e}, using startup value");
                self.startup_threshold
            }
        }
    }

    /// Fold one worker snapshot into the window.
    ///
    /// Returns a report if this merge completed a window.
    pub fn merge(&self, snapshot: &AccessFrequencyMap) -> Option<FairnessReport> {
        let evaluated = {
            let mut window = self.window.lock();
            window.fold(snapshot);
            debug!(
                window_total = window.total,
                window_blocks = window.totals.len(),
                "Merged access frequencies"
            );

            if window.total < self.window_size {
                return None;
            }

            let previous = self.switch.current_policy();
            let evaluator = FairnessEvaluator::new(self.threshold());
            match evaluator.evaluate(window.totals.values().copied(), previous) {
                Some((index, decision)) => {
                    let blocks = window.totals.len();
                    let total_accesses = window.total;
                    window.reset();
                    (index, decision, blocks, total_accesses, previous)
                }
                None => {
                    debug!("Fairness window empty, skipping evaluation");
                    return None;
                }
            }
        };

        let (index, decision, blocks, total_accesses, previous) = evaluated;
        self.metrics.fairness_evaluations.inc();
        self.metrics.fairness_index.set(index);

        let outcome = self.switch.apply(decision);
        match outcome {
            SwitchOutcome::Unchanged => info!(
                fairness_index = index,
                blocks,
                total_accesses,
                policy = ?previous,
                "Fairness evaluated, policy unchanged"
            ),
            _ => info!(
                fairness_index = index,
                blocks,
                total_accesses,
                from = ?previous,
                ?outcome,
                "Fairness evaluated, policy switch requested"
            ),
        }

        Some(FairnessReport {
            index,
            blocks,
            total_accesses,
            previous,
            decision,
            outcome,
        })
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Accesses accumulated in the current window.
    pub fn window_total(&self) -> u64 {
        self.window.lock().total
    }

    /// Running total of `block_id` in the current window.
    pub fn window_frequency(&self, block_id: BlockId) -> u64 {
        self.window.lock().totals.get(&block_id).copied().unwrap_or(0)
    }

    pub fn policy_switch(&self) -> &PolicySwitch {
        &self.switch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::InMemoryConfigStore;

    fn aggregator(window: u64) -> (FrequencyAggregator, Arc<InMemoryConfigStore>) {
        let store = Arc::new(
            InMemoryConfigStore::new()
                .with(PropertyKey::FairnessWindowSize, window)
                .with(PropertyKey::FairnessThreshold, 0.5)
                .with(PropertyKey::DynamicUpdateEnabled, true)
                .with(PropertyKey::DynamicSort, "REPLICA"),
        );
        let agg = FrequencyAggregator::new(store.clone(), Metrics::new().unwrap()).unwrap();
        (agg, store)
    }

    fn snapshot(entries: &[(BlockId, u64)]) -> AccessFrequencyMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_below_threshold_accumulates() {
        let (agg, _) = aggregator(100);
        assert!(agg.merge(&snapshot(&[(1, 30), (2, 20)])).is_none());
        assert!(agg.merge(&snapshot(&[(1, 10)])).is_none());
        assert_eq!(agg.window_total(), 60);
        assert_eq!(agg.window_frequency(1), 40);
    }

    #[test]
    fn test_threshold_triggers_evaluation_and_reset() {
        let (agg, store) = aggregator(100);
        agg.merge(&snapshot(&[(1, 10), (2, 10)]));
        let report = agg.merge(&snapshot(&[(3, 10), (4, 70)])).unwrap();

        assert!((report.index - 10_000.0 / 20_800.0).abs() < 1e-9);
        assert_eq!(report.blocks, 4);
        assert_eq!(report.total_accesses, 100);
        assert_eq!(report.decision, PolicyDecision::SwitchTo(PolicyLabel::Lru));
        assert_eq!(report.outcome, SwitchOutcome::Applied(PolicyLabel::Lru));
        assert_eq!(store.get_string(PropertyKey::DynamicSort).unwrap(), "LRU");
        assert_eq!(agg.window_total(), 0);
        assert_eq!(agg.window_frequency(4), 0);
    }

    #[test]
    fn test_overshoot_counts_whole_snapshot() {
        let (agg, _) = aggregator(10);
        let report = agg.merge(&snapshot(&[(1, 8), (2, 8)])).unwrap();
        assert_eq!(report.total_accesses, 16);
        assert_eq!(report.index, 1.0);
    }

    #[test]
    fn test_missing_window_size_is_fatal() {
        let store = Arc::new(InMemoryConfigStore::new().with(PropertyKey::FairnessThreshold, 0.5));
        let err = FrequencyAggregator::new(store, Metrics::new().unwrap()).err();
        assert_eq!(err, Some(ConfigError::Missing(PropertyKey::FairnessWindowSize)));
    }

    #[test]
    fn test_empty_snapshot_is_noop() {
        let (agg, _) = aggregator(1);
        assert!(agg.merge(&AccessFrequencyMap::new()).is_none());
        assert_eq!(agg.metrics.fairness_evaluations.get(), 0);
    }
}

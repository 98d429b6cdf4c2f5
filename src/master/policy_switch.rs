//! Applies fairness decisions to the shared dynamic configuration.
//!
//! Switching policy is best-effort. When runtime updates are disabled, or the
//! policy key is not dynamic, the decision is logged and dropped.

use std::sync::Arc;

use tracing::{info, warn};

use super::fairness::PolicyDecision;
use crate::conf::{ConfigStore, PropertyKey, Source};
use crate::metrics::Metrics;
use crate::policy::PolicyLabel;

/// What happened to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The active-policy entry now holds this label.
    Applied(PolicyLabel),
    /// Dynamic updates are not permitted; configuration untouched.
    Rejected(PolicyLabel),
    /// Nothing to do.
    Unchanged,
}

/// Writes the active-policy label into a [`ConfigStore`].
pub struct PolicySwitch {
    store: Arc<dyn ConfigStore>,
    metrics: Metrics,
}

impl PolicySwitch {
    pub fn new(store: Arc<dyn ConfigStore>, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    /// The label currently recorded as active, if it parses.
    pub fn current_policy(&self) -> Option<PolicyLabel> {
        match self.store.get_string(PropertyKey::DynamicSort) {
            Ok(s) => match s.parse() {
                Ok(label) => Some(label),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            },
            Err(_) => None,
        }
    }

    fn updates_permitted(&self) -> bool {
        // An unset flag means updates were never enabled.
        let enabled = self
            .store
            .get_boolean(PropertyKey::DynamicUpdateEnabled)
            .unwrap_or(false);
        enabled && self.store.is_dynamic(PropertyKey::DynamicSort)
    }

    pub fn apply(&self, decision: PolicyDecision) -> SwitchOutcome {
        let label = match decision {
            PolicyDecision::NoChange => return SwitchOutcome::Unchanged,
            PolicyDecision::SwitchTo(label) => label,
        };

        if !self.updates_permitted() {
            self.metrics.policy_switches_rejected.inc();
            info!(policy = %label, "Dynamic update not permitted, keeping current policy");
            return SwitchOutcome::Rejected(label);
        }

        self.store
            .set(PropertyKey::DynamicSort, label.as_str().into(), Source::Runtime);
        self.metrics.policy_switches.inc();
        info!(policy = %label, "Active eviction policy updated");
        SwitchOutcome::Applied(label)
    }
}

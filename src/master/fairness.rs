//! Jain's fairness index and the policy decision derived from it.
//!
//! ```text
//! index = (Σ xᵢ)² / (n · Σ xᵢ²)
//! ```
//!
//! The index is 1 when every block saw the same number of accesses and falls
//! towards 1/n as accesses concentrate on one block. An even distribution
//! gains little from recency, so the replica-aware policy is preferred above
//! the threshold and plain LRU at or below it.

use serde::{Deserialize, Serialize};

use crate::policy::PolicyLabel;

/// Outcome of one fairness evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyDecision {
    /// Write this label as the active policy.
    SwitchTo(PolicyLabel),
    /// Keep the current policy.
    NoChange,
}

/// Compute Jain's fairness index over per-block access totals.
///
/// Returns `None` when there is nothing to measure: no blocks, or every
/// total is zero.
pub fn jain_index<I>(totals: I) -> Option<f64>
where
    I: IntoIterator<Item = u64>,
{
    let mut n: u64 = 0;
    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    for x in totals {
        let x = x as f64;
        n += 1;
        sum += x;
        sum_sq += x * x;
    }
    if n == 0 || sum_sq <= 0.0 {
        return None;
    }
    Some((sum * sum) / (n as f64 * sum_sq))
}

/// Pure decision function over a fairness index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FairnessEvaluator {
    threshold: f64,
}

impl FairnessEvaluator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decide which policy the index calls for, given the current one.
    pub fn decide(&self, index: f64, current: Option<PolicyLabel>) -> PolicyDecision {
        if index > self.threshold && current != Some(PolicyLabel::Replica) {
            PolicyDecision::SwitchTo(PolicyLabel::Replica)
        } else if index <= self.threshold && current != Some(PolicyLabel::Lru) {
            PolicyDecision::SwitchTo(PolicyLabel::Lru)
        } else {
            PolicyDecision::NoChange
        }
    }

    /// Compute the index over `totals` and decide. `None` if the window is empty.
    pub fn evaluate<I>(&self, totals: I, current: Option<PolicyLabel>) -> Option<(f64, PolicyDecision)>
    where
        I: IntoIterator<Item = u64>,
    {
        let index = jain_index(totals)?;
        Some((index, self.decide(index, current)))
    }
}

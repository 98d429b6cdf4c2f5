//! Runtime selection of the active annotator.
//!
//! One instance of every annotator is built up front, all ticking the same
//! logical clock. Switching policy swaps which one is consulted; nothing is
//! rebuilt and the worker keeps running.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::{BlockAnnotator, CompositeAnnotator, CompositeParams, LogicalClock, LruAnnotator};
use crate::conf::{ConfigError, ConfigStore};
use crate::policy::PolicyLabel;

/// Holds every annotator variant and the label of the active one.
pub struct DynamicAnnotator {
    clock: LogicalClock,
    lru: Arc<LruAnnotator>,
    composite: Arc<CompositeAnnotator>,
    active: RwLock<PolicyLabel>,
}

impl DynamicAnnotator {
    pub fn new(params: CompositeParams, initial: PolicyLabel) -> Result<Self, ConfigError> {
        let clock = LogicalClock::new();
        Ok(Self {
            lru: Arc::new(LruAnnotator::with_clock(clock.clone())),
            composite: Arc::new(CompositeAnnotator::with_clock(params, clock.clone())?),
            clock,
            active: RwLock::new(initial),
        })
    }

    /// Build from the configuration store. Every composite parameter is required.
    pub fn from_store(store: &dyn ConfigStore, initial: PolicyLabel) -> Result<Self, ConfigError> {
        Self::new(CompositeParams::from_store(store)?, initial)
    }

    /// The annotator for the current policy.
    pub fn active(&self) -> Arc<dyn BlockAnnotator> {
        self.annotator_for(*self.active.read())
    }

    pub fn annotator_for(&self, label: PolicyLabel) -> Arc<dyn BlockAnnotator> {
        match label {
            PolicyLabel::Lru => self.lru.clone() as Arc<dyn BlockAnnotator>,
            PolicyLabel::Replica => self.composite.clone(),
        }
    }

    pub fn policy(&self) -> PolicyLabel {
        *self.active.read()
    }

    /// Make `label` the active policy. Returns whether anything changed.
    pub fn switch_to(&self, label: PolicyLabel) -> bool {
        let mut active = self.active.write();
        if *active == label {
            return false;
        }
        let from = *active;
        info!(from = %from, to = %label, "Switching block annotator");
        *active = label;
        true
    }

    /// The composite annotator, for registering it with the reconfiguration hook.
    pub fn composite(&self) -> Arc<CompositeAnnotator> {
        self.composite.clone()
    }

    pub fn logical_clock(&self) -> &LogicalClock {
        &self.clock
    }
}

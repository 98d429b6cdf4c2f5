//! Eviction policy labels.
//!
//! A policy label names which block annotator a worker should run. The
//! coordinator flips it based on fairness analysis; workers pick it up from
//! the heartbeat response.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The eviction-scoring strategy currently preferred by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyLabel {
    /// Plain recency ordering.
    Lru,
    /// Replica-aware composite scoring (LRFU decay blended with replica-weighted recency).
    Replica,
}

impl PolicyLabel {
    /// All known labels.
    pub const ALL: [PolicyLabel; 2] = [PolicyLabel::Lru, PolicyLabel::Replica];

    /// The configuration-string form of this label.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyLabel::Lru => "LRU",
            PolicyLabel::Replica => "REPLICA",
        }
    }
}

impl fmt::Display for PolicyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a policy string does not name a known label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown eviction policy label: {0:?}")]
pub struct UnknownPolicy(pub String);

impl FromStr for PolicyLabel {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LRU" => Ok(PolicyLabel::Lru),
            "REPLICA" => Ok(PolicyLabel::Replica),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

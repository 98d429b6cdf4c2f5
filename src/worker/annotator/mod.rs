//! Block annotators: per-block eviction-priority scoring.
//!
//! An annotator turns access and replica events into a [`SortedField`] per
//! block. Fields are totally ordered; the lowest field is the strongest
//! eviction candidate.
//!
//! - [`lru`]: plain recency ordering
//! - [`composite`]: LRFU decay blended with replica-weighted recency
//! - [`dynamic`]: selects the active annotator by policy label at runtime

pub mod composite;
pub mod dynamic;
pub mod lru;

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::policy::PolicyLabel;
use crate::BlockId;

pub use composite::{CompositeAnnotator, CompositeParams, CompositeSortedField};
pub use dynamic::DynamicAnnotator;
pub use lru::{LruAnnotator, LruSortedField};

/// Logical clock shared by every block scored through the same handle.
#[derive(Debug, Clone, Default)]
pub struct LogicalClock(Arc<AtomicU64>);

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick and return the new value.
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current value, without advancing.
    pub fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Eviction-priority record of one block.
#[derive(Debug, Clone, Copy)]
pub enum SortedField {
    Lru(LruSortedField),
    Composite(CompositeSortedField),
}

impl SortedField {
    /// Logical clock value at the last update.
    pub fn clock(&self) -> u64 {
        match self {
            SortedField::Lru(f) => f.clock(),
            SortedField::Composite(f) => f.clock(),
        }
    }

    /// Value the total order is defined over.
    pub fn sort_value(&self) -> f64 {
        match self {
            SortedField::Lru(f) => f.clock() as f64,
            SortedField::Composite(f) => f.crf(),
        }
    }

    /// Policy this field was produced under.
    pub fn policy(&self) -> PolicyLabel {
        match self {
            SortedField::Lru(_) => PolicyLabel::Lru,
            SortedField::Composite(_) => PolicyLabel::Replica,
        }
    }
}

// Lower value = evict first. Equal values compare equal whatever the clock.
impl PartialEq for SortedField {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for SortedField {}

impl PartialOrd for SortedField {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortedField {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.sort_value()
            .partial_cmp(&other.sort_value())
            .unwrap_or(CmpOrdering::Equal)
    }
}

/// Capability shared by every eviction-scoring strategy.
///
/// Per-block fields are owned by the caller, which must serialise updates to
/// the same block. The annotator itself only synchronises its clock and its
/// runtime-tunable parameters.
pub trait BlockAnnotator: Send + Sync {
    /// The policy label this annotator implements.
    fn policy(&self) -> PolicyLabel;

    /// Re-score one block after an access. Takes one clock tick.
    fn update_sorted_field(&self, block_id: BlockId, old: Option<&SortedField>) -> SortedField;

    /// Re-score one block after an access that also changed its replica count
    /// by `delta`. Takes one clock tick.
    fn update_sorted_field_replica(
        &self,
        block_id: BlockId,
        old: Option<&SortedField>,
        delta: i64,
    ) -> SortedField;

    /// Re-score a batch of blocks against a single clock reading. Takes no tick.
    fn update_sorted_fields(
        &self,
        blocks: &[(BlockId, Option<SortedField>)],
    ) -> Vec<(BlockId, SortedField)>;

    /// Convert a field produced under another policy into this annotator's
    /// form, preserving its clock.
    fn adopt(&self, field: &SortedField) -> SortedField;

    /// The clock this annotator ticks.
    fn logical_clock(&self) -> &LogicalClock;
}

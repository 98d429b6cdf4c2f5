//! Least-recently-used annotator.

use tracing::debug;

use super::{BlockAnnotator, LogicalClock, SortedField};
use crate::policy::PolicyLabel;
use crate::BlockId;

/// LRU field: just the clock of the last access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LruSortedField {
    clock: u64,
}

impl LruSortedField {
    pub fn new(clock: u64) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }
}

/// Orders blocks by the logical time of their last access.
#[derive(Debug, Default)]
pub struct LruAnnotator {
    clock: LogicalClock,
}

impl LruAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an annotator ticking an existing clock.
    pub fn with_clock(clock: LogicalClock) -> Self {
        Self { clock }
    }

    fn field_at(&self, block_id: BlockId, clock: u64) -> SortedField {
        debug!(block_id, clock, "LRU update");
        SortedField::Lru(LruSortedField::new(clock))
    }
}

impl BlockAnnotator for LruAnnotator {
    fn policy(&self) -> PolicyLabel {
        PolicyLabel::Lru
    }

    fn update_sorted_field(&self, block_id: BlockId, _old: Option<&SortedField>) -> SortedField {
        self.field_at(block_id, self.clock.tick())
    }

    fn update_sorted_field_replica(
        &self,
        block_id: BlockId,
        _old: Option<&SortedField>,
        _delta: i64,
    ) -> SortedField {
        self.field_at(block_id, self.clock.tick())
    }

    fn update_sorted_fields(
        &self,
        blocks: &[(BlockId, Option<SortedField>)],
    ) -> Vec<(BlockId, SortedField)> {
        let clock = self.clock.now();
        blocks
            .iter()
            .map(|(block_id, _)| (*block_id, self.field_at(*block_id, clock)))
            .collect()
    }

    fn adopt(&self, field: &SortedField) -> SortedField {
        SortedField::Lru(LruSortedField::new(field.clock()))
    }

    fn logical_clock(&self) -> &LogicalClock {
        &self.clock
    }
}

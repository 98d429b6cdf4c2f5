//! Eviction ordering over the blocks a worker holds.
//!
//! [`SortedBlockSet`] owns the per-block [`SortedField`] records and is the
//! single place that serialises updates to them. It feeds access and replica
//! events to the active annotator and answers "which blocks go first".

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::policy::PolicyLabel;
use crate::worker::annotator::{DynamicAnnotator, SortedField};
use crate::BlockId;

/// An eviction candidate with its current field.
#[derive(Debug, Clone, Copy)]
pub struct EvictionCandidate {
    pub block_id: BlockId,
    pub field: SortedField,
}

// Lower field = evicted first; ties go to the lower block id.
impl PartialEq for EvictionCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for EvictionCandidate {}

impl PartialOrd for EvictionCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EvictionCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.field
            .cmp(&other.field)
            .then_with(|| self.block_id.cmp(&other.block_id))
    }
}

/// Block → field index, scored by a [`DynamicAnnotator`].
pub struct SortedBlockSet {
    annotator: Arc<DynamicAnnotator>,
    fields: Mutex<HashMap<BlockId, SortedField>>,
}

impl SortedBlockSet {
    pub fn new(annotator: Arc<DynamicAnnotator>) -> Self {
        Self {
            annotator,
            fields: Mutex::new(HashMap::new()),
        }
    }

    /// Record an access to `block_id`, inserting it if new.
    pub fn on_access(&self, block_id: BlockId) -> SortedField {
        let mut fields = self.fields.lock();
        let field = self
            .annotator
            .active()
            .update_sorted_field(block_id, fields.get(&block_id));
        fields.insert(block_id, field);
        field
    }

    /// Record an access that changed the block's replica count by `delta`.
    ///
    /// Only blocks already tracked are re-scored. A change for a block this
    /// worker does not hold is dropped and `None` returned.
    pub fn on_replica_change(&self, block_id: BlockId, delta: i64) -> Option<SortedField> {
        let mut fields = self.fields.lock();
        let Some(old) = fields.get_mut(&block_id) else {
            debug!(block_id, delta, "Replica change for untracked block ignored");
            return None;
        };
        let field = self
            .annotator
            .active()
            .update_sorted_field_replica(block_id, Some(&*old), delta);
        *old = field;
        Some(field)
    }

    /// Re-score every tracked block against one clock reading.
    pub fn rescore_all(&self) {
        let mut fields = self.fields.lock();
        let batch: Vec<(BlockId, Option<SortedField>)> =
            fields.iter().map(|(id, f)| (*id, Some(*f))).collect();
        let rescored = self.annotator.active().update_sorted_fields(&batch);
        debug!(blocks = rescored.len(), "Re-scored all blocks");
        fields.extend(rescored);
    }

    /// Switch to `label`, converting every field to the new policy's form.
    ///
    /// Returns whether the policy changed.
    pub fn switch_policy(&self, label: PolicyLabel) -> bool {
        let mut fields = self.fields.lock();
        if !self.annotator.switch_to(label) {
            return false;
        }
        let active = self.annotator.active();
        for field in fields.values_mut() {
            *field = active.adopt(field);
        }
        info!(policy = %label, blocks = fields.len(), "Eviction policy switched");
        true
    }

    /// Forget `block_id`, e.g. after it was evicted or deleted.
    pub fn remove(&self, block_id: BlockId) -> Option<SortedField> {
        self.fields.lock().remove(&block_id)
    }

    pub fn field(&self, block_id: BlockId) -> Option<SortedField> {
        self.fields.lock().get(&block_id).copied()
    }

    /// Select up to `count` blocks to evict, strongest candidate first.
    ///
    /// Blocks in `protected_block_ids` are never selected.
    pub fn select_victims(
        &self,
        count: usize,
        protected_block_ids: &[BlockId],
    ) -> Vec<EvictionCandidate> {
        let mut heap: BinaryHeap<Reverse<EvictionCandidate>> = self
            .fields
            .lock()
            .iter()
            .filter(|(id, _)| !protected_block_ids.contains(*id))
            .map(|(id, field)| {
                Reverse(EvictionCandidate {
                    block_id: *id,
                    field: *field,
                })
            })
            .collect();

        let mut victims = Vec::with_capacity(count.min(heap.len()));
        while victims.len() < count {
            match heap.pop() {
                Some(Reverse(candidate)) => victims.push(candidate),
                None => break,
            }
        }
        victims
    }

    /// Every tracked block, strongest eviction candidate first.
    pub fn evictable_blocks(&self) -> Vec<BlockId> {
        let mut candidates: Vec<EvictionCandidate> = self
            .fields
            .lock()
            .iter()
            .map(|(id, field)| EvictionCandidate {
                block_id: *id,
                field: *field,
            })
            .collect();
        candidates.sort();
        candidates.into_iter().map(|c| c.block_id).collect()
    }

    pub fn policy(&self) -> PolicyLabel {
        self.annotator.policy()
    }

    pub fn annotator(&self) -> &Arc<DynamicAnnotator> {
        &self.annotator
    }

    pub fn len(&self) -> usize {
        self.fields.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Composite annotator: LRFU decay blended with replica-weighted recency.
//!
//! For a block last scored at clock `c0` with score `crf0`, an update at clock
//! `c` with cumulative replica count `r` computes:
//!
//! ```text
//! decay   = attenuation ^ -((c - c0) * step)
//! lrfu    = crf0 * decay + 1.0
//! replica = c * lru_ratio - r * replica_ratio
//! crf     = lrfu * (1 - ratio) + replica * ratio
//! ```
//!
//! A block seen for the first time scores 1.0. An update at the clock the
//! field was last scored at keeps its score. Lower scores are evicted first:
//! a block with more replicas elsewhere is the safer victim.
//!
//! `ratio` is the only runtime-tunable input. It lives in an atomic cell so a
//! concurrent reconfiguration is observed either wholly or not at all.

use crossbeam_utils::atomic::AtomicCell;
use tracing::{debug, info};

use super::{BlockAnnotator, LogicalClock, SortedField};
use crate::conf::{ConfigError, ConfigStore, PropertyKey, Reconfigurable};
use crate::config::{check_attenuation, check_finite, check_unit};
use crate::policy::PolicyLabel;
use crate::BlockId;

/// Composite field: clock of the last update, score and cumulative replica count.
#[derive(Debug, Clone, Copy)]
pub struct CompositeSortedField {
    clock: u64,
    crf: f64,
    replica_num: i64,
}

impl CompositeSortedField {
    pub(crate) fn new(clock: u64, crf: f64, replica_num: i64) -> Self {
        Self {
            clock,
            crf,
            replica_num,
        }
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn crf(&self) -> f64 {
        self.crf
    }

    pub fn replica_num(&self) -> i64 {
        self.replica_num
    }
}

// Two fields with the same score are interchangeable for eviction.
impl PartialEq for CompositeSortedField {
    fn eq(&self, other: &Self) -> bool {
        self.crf.partial_cmp(&other.crf) == Some(std::cmp::Ordering::Equal)
    }
}

impl PartialOrd for CompositeSortedField {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.crf.partial_cmp(&other.crf)
    }
}

/// Tuning parameters of the composite annotator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub composite_ratio: f64,
    pub step_factor: f64,
    pub attenuation_factor: f64,
    pub lru_ratio: f64,
    pub replica_ratio: f64,
}

impl CompositeParams {
    /// Read every parameter from `store`. All of them are required.
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        let params = Self {
            composite_ratio: store.get_double(PropertyKey::CompositeRatio)?,
            step_factor: store.get_double(PropertyKey::LrfuStepFactor)?,
            attenuation_factor: store.get_double(PropertyKey::LrfuAttenuationFactor)?,
            lru_ratio: store.get_double(PropertyKey::ReplicaLruRatio)?,
            replica_ratio: store.get_double(PropertyKey::ReplicaReplicaRatio)?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit(PropertyKey::CompositeRatio, self.composite_ratio)?;
        check_unit(PropertyKey::LrfuStepFactor, self.step_factor)?;
        check_attenuation(self.attenuation_factor)?;
        check_finite(PropertyKey::ReplicaLruRatio, self.lru_ratio)?;
        check_finite(PropertyKey::ReplicaReplicaRatio, self.replica_ratio)?;
        Ok(())
    }
}

/// Scores blocks by a runtime-tunable blend of LRFU and replica-aware LRU.
#[derive(Debug)]
pub struct CompositeAnnotator {
    clock: LogicalClock,
    composite_ratio: AtomicCell<f64>,
    step_factor: f64,
    attenuation_factor: f64,
    lru_ratio: f64,
    replica_ratio: f64,
}

impl CompositeAnnotator {
    /// Build from validated parameters with a private clock.
    pub fn new(params: CompositeParams) -> Result<Self, ConfigError> {
        Self::with_clock(params, LogicalClock::new())
    }

    /// Build from validated parameters, ticking an existing clock.
    pub fn with_clock(params: CompositeParams, clock: LogicalClock) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            clock,
            composite_ratio: AtomicCell::new(params.composite_ratio),
            step_factor: params.step_factor,
            attenuation_factor: params.attenuation_factor,
            lru_ratio: params.lru_ratio,
            replica_ratio: params.replica_ratio,
        })
    }

    /// Build from the configuration store. Fails if any parameter is missing.
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        Self::new(CompositeParams::from_store(store)?)
    }

    pub fn composite_ratio(&self) -> f64 {
        self.composite_ratio.load()
    }

    /// Replace the blend ratio.
    pub fn set_composite_ratio(&self, ratio: f64) -> Result<(), ConfigError> {
        check_unit(PropertyKey::CompositeRatio, ratio)?;
        let previous = self.composite_ratio.swap(ratio);
        if previous != ratio {
            info!(previous, ratio, "Composite ratio updated");
        }
        Ok(())
    }

    fn access_weight(&self, elapsed: u64) -> f64 {
        (1.0 / self.attenuation_factor).powf(elapsed as f64 * self.step_factor)
    }

    fn new_sorted_field(
        &self,
        block_id: BlockId,
        old: Option<&SortedField>,
        clock: u64,
        delta: i64,
    ) -> CompositeSortedField {
        let old = old.map(|f| self.adopt_field(f));
        let replica_num = old.map_or(0, |f| f.replica_num).saturating_add(delta);

        let crf = match old {
            None => 1.0,
            Some(old) if old.clock == clock => old.crf,
            Some(old) => {
                let lrfu = old.crf * self.access_weight(clock.saturating_sub(old.clock)) + 1.0;
                let replica = clock as f64 * self.lru_ratio - replica_num as f64 * self.replica_ratio;
                let ratio = self.composite_ratio.load();
                lrfu * (1.0 - ratio) + replica * ratio
            }
        };

        debug!(block_id, clock, crf, replica_num, "Composite update");
        CompositeSortedField::new(clock, crf, replica_num)
    }

    fn adopt_field(&self, field: &SortedField) -> CompositeSortedField {
        match field {
            SortedField::Composite(f) => *f,
            other => CompositeSortedField::new(other.clock(), 1.0, 0),
        }
    }
}

impl BlockAnnotator for CompositeAnnotator {
    fn policy(&self) -> PolicyLabel {
        PolicyLabel::Replica
    }

    fn update_sorted_field(&self, block_id: BlockId, old: Option<&SortedField>) -> SortedField {
        let clock = self.clock.tick();
        SortedField::Composite(self.new_sorted_field(block_id, old, clock, 0))
    }

    fn update_sorted_field_replica(
        &self,
        block_id: BlockId,
        old: Option<&SortedField>,
        delta: i64,
    ) -> SortedField {
        let clock = self.clock.tick();
        SortedField::Composite(self.new_sorted_field(block_id, old, clock, delta))
    }

    fn update_sorted_fields(
        &self,
        blocks: &[(BlockId, Option<SortedField>)],
    ) -> Vec<(BlockId, SortedField)> {
        let clock = self.clock.now();
        blocks
            .iter()
            .map(|(block_id, old)| {
                let field = self.new_sorted_field(*block_id, old.as_ref(), clock, 0);
                (*block_id, SortedField::Composite(field))
            })
            .collect()
    }

    fn adopt(&self, field: &SortedField) -> SortedField {
        SortedField::Composite(self.adopt_field(field))
    }

    fn logical_clock(&self) -> &LogicalClock {
        &self.clock
    }
}

impl Reconfigurable for CompositeAnnotator {
    fn reconfigure(&self, store: &dyn ConfigStore) -> Result<(), ConfigError> {
        self.set_composite_ratio(store.get_double(PropertyKey::CompositeRatio)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::InMemoryConfigStore;
    use crate::worker::annotator::LruSortedField;

    fn params(ratio: f64) -> CompositeParams {
        CompositeParams {
            composite_ratio: ratio,
            step_factor: 0.5,
            attenuation_factor: 2.0,
            lru_ratio: 1.0,
            replica_ratio: 1.0,
        }
    }

    fn composite(field: SortedField) -> CompositeSortedField {
        match field {
            SortedField::Composite(f) => f,
            other => panic!("expected composite field, got {other:?}"),
        }
    }

    #[test]
    fn test_first_update_seeds_one() {
        let annotator = CompositeAnnotator::new(params(0.7)).unwrap();
        for _ in 0..5 {
            annotator.logical_clock().tick();
        }
        let field = composite(annotator.update_sorted_field_replica(1, None, 4));
        assert_eq!(field.crf(), 1.0);
        assert_eq!(field.clock(), 6);
        assert_eq!(field.replica_num(), 4);
    }

    #[test]
    fn test_pure_lrfu_decay() {
        let annotator = CompositeAnnotator::new(params(0.0)).unwrap();
        let first = annotator.update_sorted_field(1, None);
        // Two ticks elapse: weight = 2^-(2 * 0.5) = 0.5.
        annotator.logical_clock().tick();
        let second = composite(annotator.update_sorted_field(1, Some(&first)));
        assert_eq!(second.clock(), 3);
        assert!((second.crf() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_pure_replica_term() {
        let annotator = CompositeAnnotator::new(params(1.0)).unwrap();
        let first = annotator.update_sorted_field_replica(1, None, 2);
        let second = composite(annotator.update_sorted_field(1, Some(&first)));
        // clock 2 * 1.0 - 2 replicas * 1.0
        assert_eq!(second.crf(), 0.0);
        assert_eq!(second.replica_num(), 2);
    }

    #[test]
    fn test_same_clock_keeps_score() {
        let annotator = CompositeAnnotator::new(params(0.5)).unwrap();
        let first = annotator.update_sorted_field(1, None);
        let second = annotator.update_sorted_field(1, Some(&first));
        let fields = annotator.update_sorted_fields(&[(1, Some(second))]);
        let rescored = composite(fields[0].1);
        assert_eq!(rescored.crf(), composite(second).crf());
        assert_eq!(rescored.clock(), second.clock());
    }

    #[test]
    fn test_equal_scores_compare_equal() {
        let a = CompositeSortedField::new(1, 2.5, 0);
        let b = CompositeSortedField::new(9, 2.5, 3);
        assert_eq!(a, b);
        assert_eq!(SortedField::Composite(a), SortedField::Composite(b));
    }

    #[test]
    fn test_reconfigure_reads_store() {
        let annotator = CompositeAnnotator::new(params(0.2)).unwrap();
        let store = InMemoryConfigStore::new().with(PropertyKey::CompositeRatio, 0.9);
        annotator.reconfigure(&store).unwrap();
        assert_eq!(annotator.composite_ratio(), 0.9);
    }

    #[test]
    fn test_reconfigure_rejects_out_of_range() {
        let annotator = CompositeAnnotator::new(params(0.2)).unwrap();
        let store = InMemoryConfigStore::new().with(PropertyKey::CompositeRatio, 1.5);
        assert!(annotator.reconfigure(&store).is_err());
        assert_eq!(annotator.composite_ratio(), 0.2);
    }

    #[test]
    fn test_from_store_requires_every_parameter() {
        let store = InMemoryConfigStore::new()
            .with(PropertyKey::CompositeRatio, 0.5)
            .with(PropertyKey::LrfuStepFactor, 0.5)
            .with(PropertyKey::LrfuAttenuationFactor, 2.0)
            .with(PropertyKey::ReplicaLruRatio, 1.0);
        assert_eq!(
            CompositeAnnotator::from_store(&store).unwrap_err(),
            ConfigError::Missing(PropertyKey::ReplicaReplicaRatio)
        );
    }

    #[test]
    fn test_adopts_lru_field_clock() {
        let annotator = CompositeAnnotator::new(params(0.0)).unwrap();
        let lru = SortedField::Lru(LruSortedField::new(7));
        let adopted = composite(annotator.adopt(&lru));
        assert_eq!(adopted.clock(), 7);
        assert_eq!(adopted.crf(), 1.0);
    }
}

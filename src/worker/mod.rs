//! Worker-side components of the adaptive eviction loop.
//!
//! - [`collector`]: bounded per-block access counting, drained each heartbeat
//! - [`annotator`]: eviction-priority scoring strategies
//! - [`evictor`]: the block → field index and victim selection
//! - [`sync`]: heartbeat exchange with the coordinator

pub mod annotator;
pub mod collector;
pub mod evictor;
pub mod sync;

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::info;

use crate::conf::{ConfigError, ConfigStore, PropertyKey, ReconfigurableRegistry};
use crate::heartbeat::HeartbeatTransport;
use crate::metrics::Metrics;
use crate::policy::PolicyLabel;
use crate::{BlockId, WorkerId};

use annotator::DynamicAnnotator;
use collector::BlockFrequencyCollector;
use evictor::SortedBlockSet;
use sync::WorkerSync;

/// One worker's share of the loop: counting, scoring and reconfiguration.
pub struct BlockWorker {
    worker_id: WorkerId,
    collector: Arc<BlockFrequencyCollector>,
    blocks: Arc<SortedBlockSet>,
    store: Arc<dyn ConfigStore>,
    registry: Arc<ReconfigurableRegistry>,
    metrics: Metrics,
}

impl BlockWorker {
    /// Build from configuration.
    ///
    /// Fails if the collector bound, the initial policy or any composite
    /// tuning parameter is missing or invalid.
    pub fn new(
        worker_id: WorkerId,
        store: Arc<dyn ConfigStore>,
        metrics: Metrics,
    ) -> Result<Self, ConfigError> {
        let max_blocks = store.get_u64(PropertyKey::CollectorMaxBlocks)?;
        let policy_name = store.get_string(PropertyKey::DynamicSort)?;
        let policy: PolicyLabel = policy_name.parse().map_err(|_| ConfigError::OutOfRange {
            key: PropertyKey::DynamicSort,
            value: policy_name.clone(),
            range: "LRU | REPLICA",
        })?;

        let annotator = Arc::new(DynamicAnnotator::from_store(store.as_ref(), policy)?);
        let registry = Arc::new(ReconfigurableRegistry::new());
        registry.register(annotator.composite());

        let max_blocks = NonZeroUsize::new(usize::try_from(max_blocks).unwrap_or(usize::MAX))
            .ok_or_else(|| ConfigError::OutOfRange {
                key: PropertyKey::CollectorMaxBlocks,
                value: max_blocks.to_string(),
                range: "[1, inf)",
            })?;
        info!(worker_id, max_blocks = max_blocks.get(), policy = %policy, "Block worker ready");
        Ok(Self {
            worker_id,
            collector: Arc::new(BlockFrequencyCollector::new(max_blocks, metrics.clone())),
            blocks: Arc::new(SortedBlockSet::new(annotator)),
            store,
            registry,
            metrics,
        })
    }

    /// Record a read of `block_id`: count it and re-score it.
    pub fn access(&self, block_id: BlockId) {
        self.collector.record_access(block_id);
        self.blocks.on_access(block_id);
    }

    /// Forget `block_id` after it left the cache.
    pub fn remove(&self, block_id: BlockId) {
        self.blocks.remove(block_id);
    }

    /// Heartbeat driver for this worker over `transport`.
    pub fn sync(&self, transport: Arc<dyn HeartbeatTransport>) -> WorkerSync {
        WorkerSync::new(
            self.worker_id,
            self.collector.clone(),
            self.blocks.clone(),
            self.store.clone(),
            self.registry.clone(),
            transport,
            self.metrics.clone(),
        )
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn collector(&self) -> &Arc<BlockFrequencyCollector> {
        &self.collector
    }

    pub fn blocks(&self) -> &Arc<SortedBlockSet> {
        &self.blocks
    }

    pub fn registry(&self) -> &Arc<ReconfigurableRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }
}

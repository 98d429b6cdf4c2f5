//! Benchmarks for block scoring and access collection.

use std::num::NonZeroUsize;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use adaptive_block_cache::metrics::Metrics;
use adaptive_block_cache::policy::PolicyLabel;
use adaptive_block_cache::worker::annotator::{
    BlockAnnotator, CompositeAnnotator, CompositeParams, DynamicAnnotator,
};
use adaptive_block_cache::worker::collector::BlockFrequencyCollector;
use adaptive_block_cache::worker::evictor::SortedBlockSet;

fn params() -> CompositeParams {
    CompositeParams {
        composite_ratio: 0.5,
        step_factor: 0.25,
        attenuation_factor: 2.0,
        lru_ratio: 1.0,
        replica_ratio: 1.0,
    }
}

fn bench_composite_scoring(c: &mut Criterion) {
    let annotator = CompositeAnnotator::new(params()).unwrap();
    let mut field = annotator.update_sorted_field(0, None);

    c.bench_function("composite_update_sorted_field", |b| {
        b.iter(|| {
            field = annotator.update_sorted_field(black_box(0), Some(&field));
        })
    });

    // 1,000 blocks re-scored against one clock reading.
    let batch: Vec<_> = (0..1_000u64)
        .map(|id| (id, Some(annotator.update_sorted_field(id, None))))
        .collect();
    c.bench_function("composite_update_sorted_fields_1k", |b| {
        b.iter(|| black_box(annotator.update_sorted_fields(black_box(&batch))))
    });
}

fn bench_victim_selection(c: &mut Criterion) {
    let annotator = Arc::new(DynamicAnnotator::new(params(), PolicyLabel::Replica).unwrap());
    let blocks = SortedBlockSet::new(annotator);
    for id in 0..10_000u64 {
        blocks.on_access(id % 7_919);
        blocks.on_access(id);
    }

    c.bench_function("select_100_victims_from_10k", |b| {
        b.iter(|| black_box(blocks.select_victims(100, &[])))
    });
}

fn bench_collector(c: &mut Criterion) {
    let collector = BlockFrequencyCollector::new(NonZeroUsize::new(10_000).unwrap(), Metrics::new().unwrap());
    let mut next = 0u64;

    c.bench_function("collector_record_access", |b| {
        b.iter(|| {
            next = (next + 1) % 20_000;
            collector.record_access(black_box(next));
        })
    });
}

criterion_group!(
    benches,
    bench_composite_scoring,
    bench_victim_selection,
    bench_collector
);
criterion_main!(benches);

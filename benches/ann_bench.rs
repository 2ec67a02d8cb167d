//! Vector-shard insert/build/search cost at increasing per-user corpus
//! sizes, adapted from the teacher's `benches/ann_bench.rs`.

use citegraph_index::ann::{AnnConfig, AnnIndex};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::distr::StandardUniform;
use rand::Rng;

const DIMENSION: usize = 384;

fn random_vector(dim: usize) -> Vec<f32> {
    rand::rng().sample_iter(StandardUniform).take(dim).collect()
}

fn bench_ann_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("ann_insert");

    for size in [100, 500, 1000, 5000] {
        let vectors: Vec<(String, Vec<f32>)> = (0..size)
            .map(|i| (format!("chunk-{i}"), random_vector(DIMENSION)))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("insert_{size}"), |b| {
            b.iter(|| {
                let mut index = AnnIndex::new(DIMENSION, AnnConfig::default());
                for (id, vector) in &vectors {
                    let _ = index.insert(black_box(id.clone()), black_box(vector.clone()));
                }
            });
        });
    }
    group.finish();
}

fn bench_ann_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("ann_search");

    for size in [100, 1000, 5000] {
        let mut index = AnnIndex::new(DIMENSION, AnnConfig::default());
        for i in 0..size {
            let _ = index.insert(format!("chunk-{i}"), random_vector(DIMENSION));
        }
        index.build();
        let query = random_vector(DIMENSION);

        group.throughput(Throughput::Elements(1));
        group.bench_function(format!("search_k30_over_{size}"), |b| {
            b.iter(|| black_box(index.search(&query, 30).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ann_insert, bench_ann_search);
criterion_main!(benches);

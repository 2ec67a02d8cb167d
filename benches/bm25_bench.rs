//! BM25 refit cost at increasing per-user corpus sizes — the operation
//! gated by `LEXICAL_FIT_TIMEOUT` in `citegraph_pipeline::bounded_lexical_search`.

use citegraph_core::types::{ChunkId, PaperId, UserId};
use citegraph_index::LexicalIndex;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn sample_text(i: usize) -> String {
    format!(
        "Transformer architectures replace recurrent networks for sequence \
         modeling number {i} because self-attention parallelizes across the \
         whole sequence and scales with available compute budget here."
    )
}

fn bench_bm25_refit(c: &mut Criterion) {
    let mut group = c.benchmark_group("bm25_refit");

    for size in [100, 1000, 10_000] {
        let owner = UserId(uuid::Uuid::new_v4());
        let index = LexicalIndex::new();
        let paper_id = PaperId::new();
        for i in 0..size {
            index.upsert_chunk(owner, ChunkId::new(), paper_id, i as u32, &sample_text(i));
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("refit_{size}"), |b| {
            b.iter(|| black_box(index.refit(owner, 10_000).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bm25_refit);
criterion_main!(benches);

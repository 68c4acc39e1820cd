use criterion::{Criterion, black_box, criterion_group, criterion_main};

use framegraph_core::path::{PathId, fnv1a_64};

// ---------------------------------------------------------------------------
// Path hashing
// ---------------------------------------------------------------------------

fn bench_hash_short_path(c: &mut Criterion) {
    c.bench_function("path_id_short", |b| {
        b.iter(|| PathId::new(black_box("GBuffer/Depth")));
    });
}

fn bench_hash_long_path(c: &mut Criterion) {
    let path = "Renderer/RayTracer/IndirectDiffuse/Denoiser/TemporalCache/B";
    c.bench_function("path_id_long", |b| {
        b.iter(|| PathId::new(black_box(path)));
    });
}

fn bench_join_segments(c: &mut Criterion) {
    let parent = PathId::new("Renderer/PostProcessor/TAA");
    c.bench_function("path_id_join", |b| {
        b.iter(|| black_box(parent).join(black_box("OutputA")));
    });
}

fn bench_raw_bytes(c: &mut Criterion) {
    let bytes = vec![0x5au8; 256];
    c.bench_function("fnv1a_256_bytes", |b| {
        b.iter(|| fnv1a_64(black_box(&bytes)));
    });
}

criterion_group!(
    benches,
    bench_hash_short_path,
    bench_hash_long_path,
    bench_join_segments,
    bench_raw_bytes
);
criterion_main!(benches);

//! Benchmarks for buffering and flushing sprite batches

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use spritebatch::mock::MockBatchBackend;
use spritebatch::{BatchConfig, BatchRenderer, BlendMode, Quad, Texture, TextureHandle};

fn sprites(count: usize, textures: &[TextureHandle]) -> Vec<Quad> {
    (0..count)
        .map(|i| {
            let quad = Quad::new(
                textures[i % textures.len()].clone(),
                (i % 64) as f32 * 16.0,
                (i / 64) as f32 * 16.0,
                16.0,
                16.0,
            );
            if i % 50 == 0 {
                quad.with_blend_mode(BlendMode::Add)
            } else {
                quad
            }
        })
        .collect()
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");

    for texture_count in [1, 8, 32] {
        let textures: Vec<TextureHandle> = (0..texture_count).map(|_| Texture::new(64, 64)).collect();
        let quads = sprites(2048, &textures);

        let backend = Arc::new(MockBatchBackend::new());
        let mut batcher =
            BatchRenderer::sprite(backend.clone(), BatchConfig::default()).expect("batch renderer");

        group.throughput(Throughput::Elements(quads.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("textures", texture_count),
            &quads,
            |b, quads| {
                b.iter(|| {
                    batcher.on_prerender();
                    for quad in quads {
                        batcher.render(black_box(quad));
                    }
                    batcher.flush();
                    backend.clear_calls();
                });
            },
        );
    }

    group.finish();
}

fn bench_render_only(c: &mut Criterion) {
    let textures: Vec<TextureHandle> = (0..8).map(|_| Texture::new(64, 64)).collect();
    let quads = sprites(1024, &textures);
    let backend = Arc::new(MockBatchBackend::new());
    let mut batcher =
        BatchRenderer::sprite(backend.clone(), BatchConfig::default()).expect("batch renderer");

    c.bench_function("render_1024", |b| {
        b.iter(|| {
            for quad in &quads {
                batcher.render(black_box(quad));
            }
            batcher.flush();
            backend.clear_calls();
        });
    });
}

criterion_group!(benches, bench_flush, bench_render_only);
criterion_main!(benches);

use std::sync::Arc;

use bevy::math::Vec2;
use criterion::{black_box, criterion_group, Criterion};
use lbuffer::physics::light::buffer::{LBuffer, LBufferBuilder};
use lbuffer::physics::light::cache::{LBufferCache, LBufferCacheEntry};
use lbuffer::physics::light::types::ObjectId;
use lbuffer::physics::util::fastmath::FastMath;

fn get_buffer() -> LBuffer {
    LBufferBuilder::new()
        .bucket_count(256)
        .build(Arc::new(FastMath::init()))
        .unwrap()
}

/// A ring of short walls around the light, one object per wall
fn draw_wall(buffer: &mut LBuffer, entry: &mut LBufferCacheEntry, id: u64) {
    let angle = id as f32 * 0.1;
    let (sin, cos) = angle.sin_cos();
    let center = Vec2::new(cos, sin) * 20.0;
    let tangent = Vec2::new(-sin, cos) * 2.0;
    buffer.draw_line_recorded(center - tangent, center + tangent, entry);
}

fn bench_draw_cached_hits(c: &mut Criterion) {
    let mut buffer = get_buffer();
    let mut cache = LBufferCache::<ObjectId>::default();
    for id in 0..60 {
        cache.draw_cached(ObjectId(id), Vec2::ZERO, Vec2::ONE, &mut buffer, |buffer, entry| {
            draw_wall(buffer, entry, id)
        });
    }
    c.bench_function("draw_cached_hits", |b| {
        b.iter(|| {
            buffer.clear(1000.0);
            for id in 0..60 {
                cache.draw_cached(
                    black_box(ObjectId(id)),
                    Vec2::ZERO,
                    Vec2::ONE,
                    &mut buffer,
                    |buffer, entry| draw_wall(buffer, entry, id),
                );
            }
        })
    });
}

fn bench_draw_uncached(c: &mut Criterion) {
    let mut buffer = get_buffer();
    let mut scratch = LBufferCacheEntry::default();
    c.bench_function("draw_uncached", |b| {
        b.iter(|| {
            buffer.clear(1000.0);
            for id in 0..60 {
                scratch.reset(Vec2::ZERO, Vec2::ONE);
                draw_wall(&mut buffer, &mut scratch, black_box(id));
            }
        })
    });
}

fn bench_update(c: &mut Criterion) {
    c.bench_function("cache_update", |b| {
        b.iter(|| {
            let mut cache = LBufferCache::<ObjectId>::new(1);
            for id in 0..1000 {
                let _ = cache.check_cache(ObjectId(id), Vec2::ZERO, Vec2::ONE);
            }
            cache.update();
            cache.update();
            black_box(cache.len())
        })
    });
}

criterion_group!(
    benches,
    bench_draw_cached_hits,
    bench_draw_uncached,
    bench_update
);

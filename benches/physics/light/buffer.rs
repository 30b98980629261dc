use std::sync::Arc;

use bevy::math::Vec2;
use criterion::{black_box, criterion_group, Criterion};
use lbuffer::physics::light::buffer::{LBuffer, LBufferBuilder};
use lbuffer::physics::light::types::Projection;
use lbuffer::physics::util::fastmath::FastMath;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A buffer the size a 2d game light would typically use
fn get_buffer(projection: Projection, fast_trig: bool) -> LBuffer {
    LBufferBuilder::new()
        .bucket_count(256)
        .projection(projection)
        .fast_trig(fast_trig)
        .build(Arc::new(FastMath::init()))
        .unwrap()
}

fn get_segments(count: usize) -> Vec<(Vec2, Vec2)> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| {
            (
                Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(0.1..50.0)),
                Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(0.1..50.0)),
            )
        })
        .collect()
}

fn bench_draw_line_polar(c: &mut Criterion) {
    let mut buffer = get_buffer(Projection::Polar, false);
    let segments = get_segments(100);
    c.bench_function("draw_line_polar", |b| {
        b.iter(|| {
            buffer.clear(1000.0);
            for (begin, end) in &segments {
                buffer.draw_line(black_box(*begin), black_box(*end));
            }
        })
    });
}

fn bench_draw_line_polar_fast_trig(c: &mut Criterion) {
    let mut buffer = get_buffer(Projection::Polar, true);
    let segments = get_segments(100);
    c.bench_function("draw_line_polar_fast_trig", |b| {
        b.iter(|| {
            buffer.clear(1000.0);
            for (begin, end) in &segments {
                buffer.draw_line(black_box(*begin), black_box(*end));
            }
        })
    });
}

fn bench_draw_span(c: &mut Criterion) {
    let mut buffer = get_buffer(Projection::Linear, false);
    let segments: Vec<(Vec2, Vec2)> = get_segments(100)
        .into_iter()
        .map(|(begin, end)| {
            (
                Vec2::new((begin.x + 50.0) / 100.0, begin.y),
                Vec2::new((end.x + 50.0) / 100.0, end.y),
            )
        })
        .collect();
    c.bench_function("draw_span", |b| {
        b.iter(|| {
            buffer.clear(1000.0);
            for (begin, end) in &segments {
                buffer.draw_span(black_box(*begin), black_box(*end));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_draw_line_polar,
    bench_draw_line_polar_fast_trig,
    bench_draw_span
);

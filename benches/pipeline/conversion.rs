//! Benchmarks for turning frames into traced points.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use osci_dsp::{
    geometry::{Ellipse, Frame, Shape, Vector2},
    render::convert_frame,
    source::{FrameSource, Transform, WireframeSource},
};

pub fn bench_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/conversion");
    let transform = Transform {
        scale: 0.8,
        rotation: 0.3,
        translation: Vector2::new(0.1, -0.1),
    };

    // 48kHz at 60, 30 and 10 frames per second
    for samples in [800, 1600, 4800] {
        let circles = Frame::new(
            (0..16)
                .map(|i| {
                    Box::new(Ellipse::circle(Vector2::ZERO, 0.05 * (i + 1) as f32)) as Box<dyn Shape>
                })
                .collect(),
        );
        group.bench_with_input(BenchmarkId::new("circles", samples), &samples, |b, &samples| {
            b.iter(|| black_box(convert_frame(black_box(&circles), &transform, samples)))
        });

        let mut cube = WireframeSource::cube();
        group.bench_with_input(BenchmarkId::new("cube", samples), &samples, |b, &samples| {
            b.iter(|| {
                let frame = cube.next_frame().unwrap_or_default();
                black_box(convert_frame(&frame, &transform, samples))
            })
        });
    }

    group.finish();
}

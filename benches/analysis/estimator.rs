//! Benchmarks for the FFT peak estimator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use osci_dsp::analysis::{window_len, PeakEstimator};

pub fn bench_estimator(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis/estimator");

    for seconds in [0.01, 0.05, 0.1] {
        let len = window_len(48_000, seconds);
        let window: Vec<f32> = (0..len)
            .map(|i| (std::f32::consts::TAU * 440.0 * i as f32 / 48_000.0).sin())
            .collect();
        let mut estimator = PeakEstimator::new(len, 48_000.0);

        group.bench_with_input(BenchmarkId::new("peak", len), &len, |b, _| {
            b.iter(|| black_box(estimator.estimate(black_box(&window))))
        });
    }

    group.finish();
}

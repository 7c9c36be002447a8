//! Benchmarks for the realtime path and the analysis thread.
//!
//! Run with: cargo bench
//!
//! The render path has to finish a device block well inside its deadline.
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - pipeline/*   Effect chain, frame conversion, renderer blocks
//!   - analysis/*   Peak frequency estimation per window

use criterion::{criterion_group, criterion_main};

mod analysis;
mod pipeline;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    pipeline::bench_effects,
    pipeline::bench_conversion,
    pipeline::bench_renderer,
    analysis::bench_estimator,
);
criterion_main!(benches);

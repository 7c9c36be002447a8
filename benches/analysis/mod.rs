//! Benchmarks for frequency analysis.

mod estimator;

pub use estimator::bench_estimator;

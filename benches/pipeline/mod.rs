//! Benchmarks for the producer and renderer side.

mod conversion;
mod effects;
mod renderer;

pub use conversion::bench_conversion;
pub use effects::bench_effects;
pub use renderer::bench_renderer;

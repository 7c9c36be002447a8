//! Benchmarks for one renderer block, as the device callback runs it.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use osci_dsp::{
    effect::{EffectChain, EffectId},
    geometry::Vector2,
    render::{Renderer, TraceEvent},
};
use rtrb::RingBuffer;

use crate::BLOCK_SIZES;

pub fn bench_renderer(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/renderer");

    for &size in BLOCK_SIZES {
        let (mut trace, trace_rx) = RingBuffer::new(size * 4);
        let (_controls, control_rx) = RingBuffer::new(16);
        let (mut chain, _) = EffectChain::standard(48_000.0, 0.2);
        chain.set_enabled(EffectId::Wobble, true);
        chain.set_enabled(EffectId::Rotate, true);
        let mut renderer = Renderer::new(48_000.0, chain, trace_rx, control_rx);
        let mut output = vec![0.0f32; size * 2];

        group.bench_with_input(BenchmarkId::new("stereo_block", size), &size, |b, &size| {
            b.iter(|| {
                let _ = trace.push(TraceEvent::FrameStart);
                for i in 0..size {
                    let t = i as f32 / size as f32;
                    let _ = trace.push(TraceEvent::Point(Vector2::new(t, 1.0 - t)));
                }
                renderer.render_block(black_box(&mut output), 2);
            })
        });
    }

    group.finish();
}

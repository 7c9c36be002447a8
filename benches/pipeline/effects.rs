//! Benchmarks for the effect chain.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use osci_dsp::{
    effect::{EffectChain, EffectId},
    geometry::Vector2,
};

use crate::BLOCK_SIZES;

pub fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/effects");

    for &size in BLOCK_SIZES {
        let input: Vec<Vector2> = (0..size)
            .map(|i| {
                let t = i as f32 / size as f32 * std::f32::consts::TAU;
                Vector2::new(t.cos(), t.sin())
            })
            .collect();

        // Everything switched on
        let (mut chain, _) = EffectChain::standard(48_000.0, 0.2);
        for id in EffectId::ALL {
            chain.set_enabled(id, true);
            chain.set_value(id, 0.6);
        }
        let mut index = 0u64;
        group.bench_with_input(BenchmarkId::new("full_chain", size), &size, |b, _| {
            b.iter(|| {
                for &point in &input {
                    black_box(chain.apply(index, black_box(point)));
                    index += 1;
                }
            })
        });

        // Everything present but bypassed
        let (mut chain, _) = EffectChain::standard(48_000.0, 0.2);
        group.bench_with_input(BenchmarkId::new("bypassed", size), &size, |b, _| {
            b.iter(|| {
                for &point in &input {
                    black_box(chain.apply(0, black_box(point)));
                }
            })
        });
    }

    group.finish();
}

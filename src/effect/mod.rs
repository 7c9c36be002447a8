//! Per-sample effects applied to the traced signal.
//!
//! Every effect implements [`Effect::apply`]. Anything beyond that is an
//! optional capability, exposed through the `as_*` accessors the same way a
//! graph node opts into note events: the default says "not supported".
//!
//! - [`PhaseEffect`]: owns a phase accumulator that runs continuously across
//!   frames and is only rewound by an explicit restart.
//! - [`SettableEffect`]: takes a normalised control value in `[0, 1]`.
//! - [`FrequencyReactive`]: follows the analysed output frequency through a
//!   staged value that is committed once per frame.

pub mod bit_crush;
pub mod chain;
pub mod distort;
pub mod phase;
pub mod rotate;
pub mod vector_cancel;
pub mod wobble;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Vector2;

pub use bit_crush::BitCrushEffect;
pub use chain::{EffectChain, EffectSlot};
pub use distort::{DistortAxis, DistortEffect};
pub use phase::Phase;
pub use rotate::RotateEffect;
pub use vector_cancel::VectorCancellingEffect;
pub use wobble::WobbleEffect;

/// Core trait for sample effects.
pub trait Effect: Send {
    /// Transform one point. `sample_index` counts output samples since the
    /// renderer started.
    fn apply(&mut self, sample_index: u64, input: Vector2) -> Vector2;

    /// Called when the output device (and so the sample rate) changes.
    fn set_sample_rate(&mut self, _sample_rate: f32) {
        // Default: rate independent
    }

    fn as_phase(&mut self) -> Option<&mut dyn PhaseEffect> {
        None
    }

    fn as_settable(&mut self) -> Option<&mut dyn SettableEffect> {
        None
    }

    fn as_frequency_reactive(&mut self) -> Option<&mut dyn FrequencyReactive> {
        None
    }
}

impl Effect for Box<dyn Effect> {
    fn apply(&mut self, sample_index: u64, input: Vector2) -> Vector2 {
        (**self).apply(sample_index, input)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        (**self).set_sample_rate(sample_rate)
    }

    fn as_phase(&mut self) -> Option<&mut dyn PhaseEffect> {
        (**self).as_phase()
    }

    fn as_settable(&mut self) -> Option<&mut dyn SettableEffect> {
        (**self).as_settable()
    }

    fn as_frequency_reactive(&mut self) -> Option<&mut dyn FrequencyReactive> {
        (**self).as_frequency_reactive()
    }
}

/// Effects driven by a continuously advancing phase.
pub trait PhaseEffect {
    /// Current phase in radians, `[0, 2π)`.
    fn phase(&self) -> f32;

    fn reset_phase(&mut self);
}

/// Effects with one externally controlled amount.
pub trait SettableEffect {
    /// Set the amount; values outside `[0, 1]` are clamped.
    fn set_value(&mut self, value: f32);

    fn value(&self) -> f32;
}

/// Effects that follow the analysed output frequency.
pub trait FrequencyReactive {
    /// Promote the most recently staged frequency to the one used for
    /// generating samples. Called once per frame, never per sample.
    fn commit(&mut self);

    fn committed_frequency(&self) -> f32;
}

/// Identifies an effect slot in the chain.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectId {
    Wobble,
    Rotate,
    VectorCancelling,
    BitCrush,
    HorizontalDistort,
    VerticalDistort,
}

impl EffectId {
    /// Chain order of the standard effect set.
    pub const ALL: [EffectId; 6] = [
        EffectId::VectorCancelling,
        EffectId::BitCrush,
        EffectId::VerticalDistort,
        EffectId::HorizontalDistort,
        EffectId::Rotate,
        EffectId::Wobble,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EffectId::Wobble => "wobble",
            EffectId::Rotate => "rotate",
            EffectId::VectorCancelling => "vectorCancelling",
            EffectId::BitCrush => "bitCrush",
            EffectId::HorizontalDistort => "horizontalDistort",
            EffectId::VerticalDistort => "verticalDistort",
        }
    }
}

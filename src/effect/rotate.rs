use crate::{
    effect::{Effect, Phase, PhaseEffect, SettableEffect},
    geometry::Vector2,
};

/// Fastest spin, in revolutions per second, at either end of the control range.
pub const MAX_SPEED_HZ: f32 = 4.0;

/// Spins the image about the origin.
///
/// The control value is bipolar: 0.5 stands still, 0 spins clockwise at
/// [`MAX_SPEED_HZ`] and 1 spins counter-clockwise at the same rate.
pub struct RotateEffect {
    phase: Phase,
    sample_rate: f32,
    value: f32,
}

impl RotateEffect {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: Phase::new(),
            sample_rate,
            value: 0.5,
        }
    }

    fn speed(&self) -> f32 {
        unipolar_to_bipolar(self.value) * MAX_SPEED_HZ
    }
}

impl Effect for RotateEffect {
    fn apply(&mut self, _sample_index: u64, input: Vector2) -> Vector2 {
        let theta = self.phase.advance(self.speed(), self.sample_rate);
        input.rotate(theta)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn as_phase(&mut self) -> Option<&mut dyn PhaseEffect> {
        Some(self)
    }

    fn as_settable(&mut self) -> Option<&mut dyn SettableEffect> {
        Some(self)
    }
}

impl PhaseEffect for RotateEffect {
    fn phase(&self) -> f32 {
        self.phase.theta()
    }

    fn reset_phase(&mut self) {
        self.phase.reset();
    }
}

impl SettableEffect for RotateEffect {
    fn set_value(&mut self, value: f32) {
        self.value = value.clamp(0.0, 1.0);
    }

    fn value(&self) -> f32 {
        self.value
    }
}

/// Convert unipolar (0.0 to 1.0) to bipolar (-1.0 to +1.0).
#[inline]
fn unipolar_to_bipolar(unipolar: f32) -> f32 {
    (unipolar * 2.0) - 1.0
}

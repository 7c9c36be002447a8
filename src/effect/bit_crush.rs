use crate::{
    effect::{Effect, SettableEffect},
    geometry::Vector2,
};

const MAX_STEP: f32 = 0.25;

/// Snaps coordinates onto a grid, turning smooth curves into stair steps.
pub struct BitCrushEffect {
    value: f32,
}

impl BitCrushEffect {
    pub fn new() -> Self {
        Self { value: 0.0 }
    }

    fn step(&self) -> f32 {
        self.value * self.value * MAX_STEP
    }
}

impl Default for BitCrushEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for BitCrushEffect {
    fn apply(&mut self, _sample_index: u64, input: Vector2) -> Vector2 {
        let step = self.step();
        if step <= f32::EPSILON {
            return input;
        }
        let crush = |v: f32| (v / step).round() * step;
        Vector2::new(crush(input.x), crush(input.y))
    }

    fn as_settable(&mut self) -> Option<&mut dyn SettableEffect> {
        Some(self)
    }
}

impl SettableEffect for BitCrushEffect {
    fn set_value(&mut self, value: f32) {
        self.value = value.clamp(0.0, 1.0);
    }

    fn value(&self) -> f32 {
        self.value
    }
}

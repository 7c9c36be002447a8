use crate::{
    effect::{Effect, SettableEffect},
    geometry::Vector2,
};

const MAX_OFFSET: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortAxis {
    Horizontal,
    Vertical,
}

/// Pushes alternate samples apart along one axis, doubling the image into two
/// interleaved copies.
pub struct DistortEffect {
    axis: DistortAxis,
    value: f32,
}

impl DistortEffect {
    pub fn new(axis: DistortAxis) -> Self {
        Self { axis, value: 0.0 }
    }

    pub fn horizontal() -> Self {
        Self::new(DistortAxis::Horizontal)
    }

    pub fn vertical() -> Self {
        Self::new(DistortAxis::Vertical)
    }
}

impl Effect for DistortEffect {
    fn apply(&mut self, sample_index: u64, input: Vector2) -> Vector2 {
        let offset = self.value * MAX_OFFSET;
        let signed = if sample_index % 2 == 0 { offset } else { -offset };
        match self.axis {
            DistortAxis::Horizontal => Vector2::new(input.x + signed, input.y),
            DistortAxis::Vertical => Vector2::new(input.x, input.y + signed),
        }
    }

    fn as_settable(&mut self) -> Option<&mut dyn SettableEffect> {
        Some(self)
    }
}

impl SettableEffect for DistortEffect {
    fn set_value(&mut self, value: f32) {
        self.value = value.clamp(0.0, 1.0);
    }

    fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_alternates_sign() {
        let mut effect = DistortEffect::vertical();
        effect.set_value(1.0);
        let a = effect.apply(0, Vector2::ZERO);
        let b = effect.apply(1, Vector2::ZERO);
        assert_eq!(a, Vector2::new(0.0, MAX_OFFSET));
        assert_eq!(b, Vector2::new(0.0, -MAX_OFFSET));
    }
}

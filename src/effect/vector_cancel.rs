use crate::{
    effect::{Effect, SettableEffect},
    geometry::Vector2,
};

const SLOWEST_PERIOD: u64 = 20;

/// Inverts every Nth sample through the origin.
///
/// On the scope the inverted points trace a point-mirrored ghost of the image;
/// in the audio it cancels part of the signal. Higher values invert more often;
/// zero switches the effect off.
pub struct VectorCancellingEffect {
    value: f32,
    period: u64,
}

impl VectorCancellingEffect {
    pub fn new() -> Self {
        Self {
            value: 0.0,
            period: 0,
        }
    }

    /// Samples between inversions, or zero when disabled.
    pub fn period(&self) -> u64 {
        self.period
    }
}

impl Default for VectorCancellingEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for VectorCancellingEffect {
    fn apply(&mut self, sample_index: u64, input: Vector2) -> Vector2 {
        if self.period != 0 && sample_index % self.period == 0 {
            -input
        } else {
            input
        }
    }

    fn as_settable(&mut self) -> Option<&mut dyn SettableEffect> {
        Some(self)
    }
}

impl SettableEffect for VectorCancellingEffect {
    fn set_value(&mut self, value: f32) {
        self.value = value.clamp(0.0, 1.0);
        self.period = if self.value <= 0.0 {
            0
        } else {
            2 + ((1.0 - self.value) * (SLOWEST_PERIOD - 2) as f32).round() as u64
        };
    }

    fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_passthrough() {
        let mut effect = VectorCancellingEffect::new();
        let p = Vector2::new(0.3, 0.4);
        assert!((0..50).all(|i| effect.apply(i, p) == p));
    }

    #[test]
    fn test_full_value_inverts_every_other_sample() {
        let mut effect = VectorCancellingEffect::new();
        effect.set_value(1.0);
        assert_eq!(effect.period(), 2);

        let p = Vector2::new(0.3, 0.4);
        assert_eq!(effect.apply(0, p), -p);
        assert_eq!(effect.apply(1, p), p);
        assert_eq!(effect.apply(2, p), -p);
    }
}

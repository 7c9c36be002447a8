use crate::{effect::Phase, geometry::Vector2};

/// Live motion applied after the effect chain: scale, then rotate, then
/// translate. Rotation and translation can animate over time.
#[derive(Debug, Clone)]
pub struct Motion {
    pub scale: f32,
    /// Revolutions per second.
    pub rotation_speed: f32,
    pub translation: Vector2,
    /// Oscillation rate along `translation`, Hz. Zero holds a static offset.
    pub translation_speed: f32,
    rotation: Phase,
    translation_phase: Phase,
}

impl Motion {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            rotation_speed: 0.0,
            translation: Vector2::ZERO,
            translation_speed: 0.0,
            rotation: Phase::new(),
            translation_phase: Phase::new(),
        }
    }

    #[inline]
    pub fn apply(&mut self, point: Vector2, sample_rate: f32) -> Vector2 {
        let angle = self.rotation.advance(self.rotation_speed, sample_rate);
        let offset = if self.translation_speed == 0.0 {
            self.translation
        } else {
            let theta = self
                .translation_phase
                .advance(self.translation_speed, sample_rate);
            self.translation * theta.sin()
        };
        (point * self.scale).rotate(angle) + offset
    }

    pub fn angle(&self) -> f32 {
        self.rotation.theta()
    }

    pub fn reset(&mut self) {
        self.rotation.reset();
        self.translation_phase.reset();
    }
}

impl Default for Motion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let mut motion = Motion::new();
        let p = Vector2::new(0.4, -0.2);
        assert_eq!(motion.apply(p, 48_000.0), p);
    }

    #[test]
    fn test_static_translation_and_scale() {
        let mut motion = Motion::new();
        motion.scale = 0.5;
        motion.translation = Vector2::new(0.1, 0.2);
        let p = motion.apply(Vector2::new(1.0, 1.0), 48_000.0);
        assert!((p.x - 0.6).abs() < 1e-6);
        assert!((p.y - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_integrates_over_time() {
        let mut motion = Motion::new();
        motion.rotation_speed = 1.0;
        for _ in 0..250 {
            motion.apply(Vector2::ZERO, 1_000.0);
        }
        assert!((motion.angle() - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }
}

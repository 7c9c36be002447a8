use std::f64::consts::TAU;

/// Phase accumulator shared by the periodic effects.
///
/// Accumulates in `f64` so hours of continuous playback don't drift, and
/// wraps to `[0, 2π)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Phase {
    theta: f64,
}

impl Phase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one sample of a `frequency` Hz cycle and return the new angle.
    #[inline]
    pub fn advance(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        if sample_rate > 0.0 && frequency.is_finite() {
            let step = TAU * frequency as f64 / sample_rate as f64;
            self.theta = (self.theta + step).rem_euclid(TAU);
        }
        self.theta()
    }

    #[inline]
    pub fn theta(&self) -> f32 {
        // Values just below 2π can round up to it in f32
        let theta = self.theta as f32;
        if theta >= std::f32::consts::TAU {
            0.0
        } else {
            theta
        }
    }

    pub fn reset(&mut self) {
        self.theta = 0.0;
    }
}

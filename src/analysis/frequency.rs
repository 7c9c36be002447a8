use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Latest dominant frequency estimate for each output channel, in Hz.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrequencySnapshot {
    pub left: f32,
    pub right: f32,
}

impl FrequencySnapshot {
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Pack both channels into one word so the pair is read and written as a
    /// single atomic value.
    fn to_bits(self) -> u64 {
        ((self.left.to_bits() as u64) << 32) | self.right.to_bits() as u64
    }

    fn from_bits(bits: u64) -> Self {
        Self {
            left: f32::from_bits((bits >> 32) as u32),
            right: f32::from_bits(bits as u32),
        }
    }
}

/// Receives frequency estimates from the analyser.
///
/// Called on the analyser thread once per completed window; implementations
/// must return quickly and must not block.
pub trait FrequencyListener: Send + Sync {
    fn update_frequency(&self, left: f32, right: f32);
}

/// Lock-free latest-value slot for a [`FrequencySnapshot`].
///
/// Writers replace the whole pair, readers always see a pair that was written
/// together.
#[derive(Debug, Default)]
pub struct FrequencyCell {
    bits: AtomicU64,
}

impl FrequencyCell {
    pub fn new(initial: FrequencySnapshot) -> Self {
        Self {
            bits: AtomicU64::new(initial.to_bits()),
        }
    }

    pub fn load(&self) -> FrequencySnapshot {
        FrequencySnapshot::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn store(&self, snapshot: FrequencySnapshot) {
        self.bits.store(snapshot.to_bits(), Ordering::Release);
    }
}

impl FrequencyListener for FrequencyCell {
    fn update_frequency(&self, left: f32, right: f32) {
        self.store(FrequencySnapshot::new(left, right));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_keeps_pairs_together() {
        let cell = FrequencyCell::default();
        assert_eq!(cell.load(), FrequencySnapshot::default());

        cell.update_frequency(440.0, -3.25);
        assert_eq!(cell.load(), FrequencySnapshot::new(440.0, -3.25));
    }
}

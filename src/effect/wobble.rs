use std::sync::Arc;

use crate::{
    analysis::FrequencyCell,
    effect::{Effect, FrequencyReactive, Phase, PhaseEffect, SettableEffect},
    geometry::Vector2,
};

/*
Wobble
======

Adds a sine wave at the frequency the image is currently being drawn at.
Because the added wave runs at (almost) the same rate as the trace itself, on
the scope it shows up as the image gently wobbling rather than as a blur.

  out.x = in.x + volume × sin(θ)
  out.y = in.y + volume × sin(θ)        θ advances at the committed frequency

Frequency updates arrive from the analyser thread at any time. They land in a
staging cell and only become visible to `apply` when the renderer calls
`commit()` at the start of a frame, so every sample of one frame is computed
with the same frequency.
*/

pub const DEFAULT_VOLUME: f32 = 0.2;

pub struct WobbleEffect {
    phase: Phase,
    sample_rate: f32,
    volume: f32,
    staged: Arc<FrequencyCell>,
    frequency: f32,
}

impl WobbleEffect {
    pub fn new(sample_rate: f32, volume: f32) -> Self {
        Self::with_input(sample_rate, volume, Arc::new(FrequencyCell::default()))
    }

    /// Stage frequency updates through an existing cell.
    pub fn with_input(sample_rate: f32, volume: f32, staged: Arc<FrequencyCell>) -> Self {
        Self {
            phase: Phase::new(),
            sample_rate,
            volume: volume.clamp(0.0, 1.0),
            staged,
            frequency: 0.0,
        }
    }

    /// The staging cell; register it with the analyser to receive updates.
    pub fn frequency_input(&self) -> Arc<FrequencyCell> {
        Arc::clone(&self.staged)
    }
}

impl Effect for WobbleEffect {
    fn apply(&mut self, _sample_index: u64, input: Vector2) -> Vector2 {
        let theta = self.phase.advance(self.frequency, self.sample_rate);
        let delta = self.volume * theta.sin();
        Vector2::new(input.x + delta, input.y + delta)
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

    fn as_frequency_reactive(&mut self) -> Option<&mut dyn FrequencyReactive> {
        Some(self)
    }
}

impl PhaseEffect for WobbleEffect {
    fn phase(&self) -> f32 {
        self.phase.theta()
    }

    fn reset_phase(&mut self) {
        self.phase.reset();
    }
}

impl SettableEffect for WobbleEffect {
    fn set_value(&mut self, value: f32) {
        self.volume = value.clamp(0.0, 1.0);
    }

    fn value(&self) -> f32 {
        self.volume
    }
}

impl FrequencyReactive for WobbleEffect {
    fn commit(&mut self) {
        // Follows the left channel
        self.frequency = self.staged.load().left;
    }

    fn committed_frequency(&self) -> f32 {
        self.frequency
    }
}

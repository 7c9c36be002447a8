#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::effect::wobble;

/// Longest analysis window accepted from configuration.
pub const MAX_ANALYSIS_WINDOW_SECONDS: f32 = 1.0;

/// Startup configuration for a [`Pipeline`](crate::Pipeline).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Target redraw rate of the image, Hz.
    pub frame_rate: f32,
    /// Points queued between the producer and the renderer.
    pub trace_capacity: usize,
    /// Control messages queued for the renderer.
    pub control_capacity: usize,
    /// Requested length of one analysis window. Rounded up to a power of two
    /// of samples, at most [`MAX_ANALYSIS_WINDOW_SECONDS`].
    pub analysis_window_seconds: f32,
    /// Analysis ring size in windows.
    pub analysis_ring_windows: usize,
    /// Preferred output device; the host default when absent or missing.
    pub device_name: Option<String>,
    pub wobble_volume: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            trace_capacity: 8192,
            control_capacity: 256,
            analysis_window_seconds: 0.05,
            analysis_ring_windows: 4,
            device_name: None,
            wobble_volume: wobble::DEFAULT_VOLUME,
        }
    }
}

impl PipelineConfig {
    pub fn frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }

    pub fn control_capacity(mut self, capacity: usize) -> Self {
        self.control_capacity = capacity;
        self
    }

    pub fn analysis_window(mut self, seconds: f32) -> Self {
        self.analysis_window_seconds = seconds;
        self
    }

    pub fn device(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn wobble_volume(mut self, volume: f32) -> Self {
        self.wobble_volume = volume;
        self
    }

    /// Frame rate usable by the producer: finite and at least 1 Hz.
    pub(crate) fn effective_frame_rate(&self) -> f32 {
        if self.frame_rate.is_finite() {
            self.frame_rate.max(1.0)
        } else {
            60.0
        }
    }

    /// Analysis window length in seconds, finite and within
    /// `[0, MAX_ANALYSIS_WINDOW_SECONDS]`.
    pub(crate) fn effective_analysis_window(&self) -> f32 {
        if self.analysis_window_seconds.is_finite() {
            self.analysis_window_seconds
                .clamp(0.0, MAX_ANALYSIS_WINDOW_SECONDS)
        } else {
            Self::default().analysis_window_seconds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_window_is_bounded() {
        let config = PipelineConfig::default();
        assert_eq!(config.effective_analysis_window(), 0.05);

        let huge = config.clone().analysis_window(1.0e9);
        assert_eq!(huge.effective_analysis_window(), MAX_ANALYSIS_WINDOW_SECONDS);

        let negative = config.clone().analysis_window(-3.0);
        assert_eq!(negative.effective_analysis_window(), 0.0);

        for bad in [f32::INFINITY, f32::NAN] {
            assert_eq!(config.clone().analysis_window(bad).effective_analysis_window(), 0.05);
        }
    }

    #[test]
    fn test_frame_rate_is_bounded() {
        assert_eq!(PipelineConfig::default().frame_rate(0.0).effective_frame_rate(), 1.0);
        assert_eq!(
            PipelineConfig::default()
                .frame_rate(f32::NAN)
                .effective_frame_rate(),
            60.0
        );
    }
}

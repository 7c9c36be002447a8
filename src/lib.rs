//! Realtime oscilloscope rendering.
//!
//! Frames of parametric shapes are traced as a stereo signal: the left channel
//! drives the X deflection and the right channel drives Y. A [`FrameProducer`]
//! turns frames into points, the [`Renderer`] runs them through an effect chain
//! and out to the audio device, and a [`FrequencyAnalyser`] listens to what was
//! emitted and feeds the dominant frequency back to effects and displays.
//!
//! [`FrameProducer`]: render::FrameProducer
//! [`Renderer`]: render::Renderer
//! [`FrequencyAnalyser`]: analysis::FrequencyAnalyser

pub mod analysis; // Frequency estimation and listener fan-out
pub mod config;
pub mod control; // Parameters, MIDI CC mapping, persisted state
pub mod effect; // Per-sample effect chain
pub mod error;
pub mod geometry;
pub mod io;
pub mod pipeline;
pub mod render; // Frame production and the realtime sink
pub mod source;

pub use config::PipelineConfig;
pub use error::{OsciError, Result};
pub use pipeline::Pipeline;

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_SAMPLE_RATE: u32 = 8_000;

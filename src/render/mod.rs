//! Frame production and the realtime sink.
//!
//! ```text
//!  FrameSource ─→ FrameProducer ══trace ring══→ Renderer ─→ device
//!                  (own thread)                  │  (audio callback)
//!  control ══════════════════message ring═══════┘
//! ```
//!
//! Both rings are `rtrb` single-producer/single-consumer queues, so the audio
//! callback never takes a lock shared with the control side.

pub mod motion;
pub mod producer;
pub mod renderer;

use crate::{effect::EffectId, geometry::Vector2};

pub use motion::Motion;
pub use producer::{allocate_samples, convert_frame, samples_per_frame, trace_shape, FrameProducer};
pub use renderer::{RenderStats, Renderer};

/// One entry of the producer → renderer trace ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceEvent {
    /// A new frame begins; the renderer commits staged frequencies here.
    FrameStart,
    Point(Vector2),
    /// The producer stopped. The renderer holds its last point until the next
    /// frame arrives.
    EndOfStream,
}

/// Control messages for the renderer, applied before the next sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderMessage {
    SetQuality(f32),
    /// Revolutions per second.
    SetRotationSpeed(f32),
    /// Hz; zero means a static offset.
    SetTranslationSpeed(f32),
    SetScale(f32),
    SetTranslation(Vector2),
    SetEffectValue { id: EffectId, value: f32 },
    SetEffectEnabled { id: EffectId, enabled: bool },
    RestartEffects,
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
    StopMidiNotes,
    ResetMidi,
    SetMainMidiChannel(u8),
}

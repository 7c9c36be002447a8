//! Frame sources: where the shapes come from.
//!
//! Parsers for model, vector and image files live outside this crate; all the
//! pipeline needs is something implementing [`FrameSource`]. Two sources ship
//! here: a [`StaticFrameSource`] for fixed images and a [`WireframeSource`] for
//! rotating 3D edge meshes.

pub mod settings;
pub mod static_source;
pub mod wireframe;

use std::sync::{Arc, Mutex};

use crate::{geometry::Frame, Result};

pub use settings::{FrameSettings, ObjectParameters, ObjectSettings, Transform};
pub use static_source::StaticFrameSource;
pub use wireframe::WireframeSource;

/// Produces successive frames for the [`FrameProducer`](crate::render::FrameProducer).
///
/// `next_frame` must not block indefinitely. A source with nothing new to
/// show returns its previous frame so static scenes are still redrawn at the
/// display cadence.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame>;

    fn enable(&mut self);

    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// Replace the whole settings snapshot.
    fn set_frame_settings(&mut self, settings: FrameSettings);

    fn frame_settings(&self) -> FrameSettings;

    /// The cadence frames are pulled at. Sources that animate per frame use
    /// it to keep their motion in real time.
    fn set_frame_rate(&mut self, _frame_rate: f32) {}

    /// Display name, e.g. the file the source was parsed from.
    fn name(&self) -> &str {
        "untitled"
    }
}

/// A frame source shared between the control side and a producer thread.
///
/// The producer only holds the lock while pulling one frame, so enabling or
/// disabling from another thread is always safe.
pub type SharedFrameSource = Arc<Mutex<dyn FrameSource>>;

/// Wrap a source for use by the pipeline.
pub fn shared<S: FrameSource + 'static>(source: S) -> SharedFrameSource {
    Arc::new(Mutex::new(source))
}

use crate::{
    geometry::Frame,
    source::{FrameSettings, FrameSource},
    Result,
};

/// Serves the same frame forever.
#[derive(Debug)]
pub struct StaticFrameSource {
    name: String,
    frame: Frame,
    settings: FrameSettings,
    enabled: bool,
}

impl StaticFrameSource {
    pub fn new(name: impl Into<String>, frame: Frame) -> Self {
        Self {
            name: name.into(),
            frame,
            settings: FrameSettings::default(),
            enabled: false,
        }
    }
}

impl FrameSource for StaticFrameSource {
    fn next_frame(&mut self) -> Result<Frame> {
        Ok(self.frame.clone())
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_frame_settings(&mut self, settings: FrameSettings) {
        self.settings = settings;
    }

    fn frame_settings(&self) -> FrameSettings {
        self.settings
    }

    fn name(&self) -> &str {
        &self.name
    }
}

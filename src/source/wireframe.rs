use crate::{
    geometry::{Frame, Line, Shape, Vector3},
    source::{FrameSettings, FrameSource, ObjectSettings},
    Result,
};

const DEFAULT_FRAME_RATE: f32 = 60.0;

/// A 3D edge mesh projected through a pinhole camera.
///
/// Each call to `next_frame` advances the object's rotation by one frame's
/// worth of `rotate_speed`, so the object spins at a steady rate as long as
/// frames are pulled at the producer's cadence.
#[derive(Debug)]
pub struct WireframeSource {
    name: String,
    vertices: Vec<Vector3>,
    edges: Vec<(usize, usize)>,
    settings: FrameSettings,
    frame_rate: f32,
    enabled: bool,
}

impl WireframeSource {
    pub fn new(name: impl Into<String>, vertices: Vec<Vector3>, edges: Vec<(usize, usize)>) -> Self {
        Self {
            name: name.into(),
            vertices,
            edges,
            settings: FrameSettings::with_object(ObjectSettings::default()),
            frame_rate: DEFAULT_FRAME_RATE,
            enabled: false,
        }
    }

    /// Unit cube centred on the origin.
    pub fn cube() -> Self {
        let vertices = (0..8)
            .map(|i| {
                let corner = |bit: usize| if i & bit == 0 { -0.5 } else { 0.5 };
                Vector3::new(corner(1), corner(2), corner(4))
            })
            .collect();
        let edges = vec![
            (0, 1), (1, 3), (3, 2), (2, 0),
            (4, 5), (5, 7), (7, 6), (6, 4),
            (0, 4), (1, 5), (2, 6), (3, 7),
        ];
        Self::new("cube", vertices, edges)
    }

    /// Frames per second used to turn `rotate_speed` into a per-frame step.
    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate.max(1.0);
        self
    }

    fn object(&self) -> ObjectSettings {
        self.settings.object.unwrap_or_default()
    }

    fn project(&self, object: &ObjectSettings) -> Frame {
        let projected: Vec<_> = self
            .vertices
            .iter()
            .map(|v| {
                v.rotate(object.current_rotation)
                    .project(object.camera_position, object.focal_length)
            })
            .collect();

        let shapes = self
            .edges
            .iter()
            .filter_map(|&(a, b)| Some((*projected.get(a)?, *projected.get(b)?)))
            .map(|(a, b)| Box::new(Line::new(a, b)) as Box<dyn Shape>)
            .collect();
        Frame::new(shapes)
    }
}

impl FrameSource for WireframeSource {
    fn next_frame(&mut self) -> Result<Frame> {
        let mut object = self.object();
        let frame = self.project(&object);

        if self.enabled {
            let step = object.rotate_speed / self.frame_rate;
            object.current_rotation = object.current_rotation + object.rotation_axis * step;
            self.settings.object = Some(object);
        }

        Ok(frame)
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
        let object = settings.object.unwrap_or_else(|| self.object());
        self.settings = FrameSettings {
            transform: settings.transform,
            object: Some(object),
        };
    }

    fn frame_settings(&self) -> FrameSettings {
        self.settings
    }

    fn set_frame_rate(&mut self, frame_rate: f32) {
        self.frame_rate = frame_rate.max(1.0);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

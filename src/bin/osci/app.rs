//! Osci - builds the sources and the pipeline, then runs one of the front ends

use std::{
    f32::consts::{PI, TAU},
    thread,
    time::{Duration, Instant},
};

use color_eyre::eyre::{Result as EyreResult, WrapErr};

use osci_dsp::{
    control::ParameterTarget,
    geometry::{CubicBezier, Ellipse, Frame, Shape, Vector2},
    io::{AudioBackend, CpalBackend},
    source::{shared, SharedFrameSource, StaticFrameSource, WireframeSource},
    Pipeline, PipelineConfig,
};

use super::ui::UiApp;

/// Application builder
pub struct Osci {
    device: Option<String>,
    frame_rate: f32,
}

impl Osci {
    pub fn new(device: Option<String>, frame_rate: f32) -> Self {
        Self { device, frame_rate }
    }

    pub fn list_devices(&self) -> EyreResult<()> {
        let backend = CpalBackend::new();
        let default = backend.default_output_device()?;
        for device in backend.output_devices()? {
            let marker = if Some(&device) == default.as_ref() { "*" } else { " " };
            println!("{marker} {device}");
        }
        Ok(())
    }

    /// Play without a terminal interface, logging status once a second.
    pub fn run_headless(self, seconds: f32) -> EyreResult<()> {
        let pipeline = self.start()?;
        let deadline = Instant::now() + Duration::from_secs_f32(seconds.max(0.0));

        while Instant::now() < deadline {
            thread::sleep(Duration::from_secs(1).min(deadline.saturating_duration_since(Instant::now())));
            let frequency = pipeline.frequency();
            tracing::info!(
                left = frequency.left,
                right = frequency.right,
                frames = pipeline.stats().frames(),
                underruns = pipeline.underruns(),
                "status"
            );
        }

        pipeline.shutdown()?;
        Ok(())
    }

    pub fn run_tui(self) -> EyreResult<()> {
        let pipeline = self.start()?;
        let mut terminal = ratatui::init();
        let mut ui = UiApp::new(pipeline);
        let result = ui.run(&mut terminal);
        ratatui::restore();
        result?;
        ui.into_pipeline().shutdown()?;
        Ok(())
    }

    fn start(&self) -> EyreResult<Pipeline> {
        let mut config = PipelineConfig::default().frame_rate(self.frame_rate);
        if let Some(name) = &self.device {
            config = config.device(name.clone());
        }
        let mut pipeline = Pipeline::start(Box::new(CpalBackend::new()), config, self.sources())
            .wrap_err("failed to start the output pipeline")?;
        // Give the demo cube a slow spin
        pipeline.set_parameter(ParameterTarget::ObjectRotateSpeed, 1.0)?;
        Ok(pipeline)
    }

    fn sources(&self) -> Vec<SharedFrameSource> {
        vec![
            shared(WireframeSource::cube()),
            shared(StaticFrameSource::new(
                "circle",
                Frame::new(vec![Box::new(Ellipse::circle(Vector2::ZERO, 0.8)) as Box<dyn Shape>]),
            )),
            shared(StaticFrameSource::new("star", star(5, 0.9, 0.4))),
            shared(StaticFrameSource::new("heart", heart())),
        ]
    }
}

fn star(points: usize, outer: f32, inner: f32) -> Frame {
    let corners: Vec<Vector2> = (0..points * 2)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            let angle = PI / 2.0 + i as f32 * TAU / (points * 2) as f32;
            Vector2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    Frame::from_polygon(&corners)
}

fn heart() -> Frame {
    let top = Vector2::new(0.0, 0.4);
    let bottom = Vector2::new(0.0, -0.8);
    Frame::new(vec![
        Box::new(CubicBezier::new(
            bottom,
            Vector2::new(-1.0, -0.1),
            Vector2::new(-0.6, 1.0),
            top,
        )) as Box<dyn Shape>,
        Box::new(CubicBezier::new(
            top,
            Vector2::new(0.6, 1.0),
            Vector2::new(1.0, -0.1),
            bottom,
        )),
    ])
}

//! Audio output devices.
//!
//! The pipeline talks to an [`AudioBackend`] so device handling can be
//! replaced in tests; [`CpalBackend`] is the real one.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::{
    error::{OsciError, Result},
    render::Renderer,
    MAX_BLOCK_SIZE, MIN_SAMPLE_RATE,
};

/// An output device as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} Hz, {} ch)", self.name, self.sample_rate, self.channels)
    }
}

/// A running output stream. Dropping it stops playback and releases the
/// device.
pub trait OutputStream {
    fn device(&self) -> &AudioDevice;
}

pub trait AudioBackend {
    fn output_devices(&self) -> Result<Vec<AudioDevice>>;

    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Open `device` and start pulling blocks from `renderer`.
    fn open(
        &mut self,
        device: &AudioDevice,
        renderer: Arc<Mutex<Renderer>>,
    ) -> Result<Box<dyn OutputStream>>;

    fn find(&self, name: &str) -> Result<AudioDevice> {
        self.output_devices()?
            .into_iter()
            .find(|device| device.name == name)
            .ok_or_else(|| OsciError::DeviceNotFound(name.to_owned()))
    }
}

/// Drive a renderer from an interleaved device buffer, at most
/// [`MAX_BLOCK_SIZE`] frames per call.
pub fn fill_buffer(renderer: &Mutex<Renderer>, data: &mut [f32], channels: usize) {
    let Ok(mut renderer) = renderer.lock() else {
        data.fill(0.0);
        return;
    };
    for block in data.chunks_mut(MAX_BLOCK_SIZE * channels.max(1)) {
        renderer.render_block(block, channels);
    }
}

pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    fn describe(device: &cpal::Device) -> Option<AudioDevice> {
        let name = device.name().ok()?;
        let config = device.default_output_config().ok()?;
        Some(AudioDevice {
            name,
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }

    fn lookup(&self, name: &str) -> Result<cpal::Device> {
        self.host
            .output_devices()
            .map_err(OsciError::device)?
            .find(|device| device.name().is_ok_and(|n| n == name))
            .ok_or_else(|| OsciError::DeviceNotFound(name.to_owned()))
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn output_devices(&self) -> Result<Vec<AudioDevice>> {
        let devices = self.host.output_devices().map_err(OsciError::device)?;
        Ok(devices.filter_map(|d| Self::describe(&d)).collect())
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        Ok(self
            .host
            .default_output_device()
            .and_then(|d| Self::describe(&d)))
    }

    fn open(
        &mut self,
        device: &AudioDevice,
        renderer: Arc<Mutex<Renderer>>,
    ) -> Result<Box<dyn OutputStream>> {
        let handle = self.lookup(&device.name)?;
        let config = handle
            .default_output_config()
            .map_err(OsciError::device)?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(OsciError::Device(format!(
                "{} does not offer f32 output",
                device.name
            )));
        }

        let sample_rate = config.sample_rate().0;
        if sample_rate < MIN_SAMPLE_RATE {
            return Err(OsciError::Device(format!(
                "{} runs at {sample_rate} Hz, below {MIN_SAMPLE_RATE} Hz",
                device.name
            )));
        }
        let channels = config.channels() as usize;

        let stream = handle
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| fill_buffer(&renderer, data, channels),
                |err| error!(%err, "audio stream error"),
                None,
            )
            .map_err(OsciError::device)?;
        stream.play().map_err(OsciError::device)?;

        let device = AudioDevice {
            name: device.name.clone(),
            sample_rate,
            channels: channels as u16,
        };
        info!(%device, "output stream started");
        Ok(Box::new(CpalStream {
            _stream: stream,
            device,
        }))
    }
}

struct CpalStream {
    _stream: cpal::Stream,
    device: AudioDevice,
}

impl OutputStream for CpalStream {
    fn device(&self) -> &AudioDevice {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        effect::EffectChain,
        geometry::Vector2,
        render::TraceEvent,
    };
    use rtrb::RingBuffer;

    #[test]
    fn test_fill_buffer_spans_blocks() {
        let (mut trace_tx, trace_rx) = RingBuffer::new(MAX_BLOCK_SIZE * 2);
        let (_control_tx, control_rx) = RingBuffer::new(4);
        let renderer = Mutex::new(Renderer::new(48_000.0, EffectChain::new(), trace_rx, control_rx));

        trace_tx.push(TraceEvent::FrameStart).unwrap();
        let frames = MAX_BLOCK_SIZE + 10;
        for i in 0..frames {
            trace_tx.push(TraceEvent::Point(Vector2::new(i as f32, 0.0))).unwrap();
        }

        let mut data = vec![0.0; frames * 2];
        fill_buffer(&renderer, &mut data, 2);
        assert_eq!(data[(frames - 1) * 2], (frames - 1) as f32);
        assert_eq!(renderer.lock().unwrap().stats().underruns(), 0);
    }
}

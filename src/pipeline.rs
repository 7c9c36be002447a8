//! The top-level owner of everything that runs.
//!
//! ```text
//!                 ┌────────────── Pipeline (control thread) ──────────────┐
//!                 │ sources  parameters  CcMapper  listeners  backend     │
//!                 └──┬──────────────┬───────────────────────────┬─────────┘
//!        frame settings        RenderMessage ring          open / close
//!                    ▼              ▼                           ▼
//!  FrameSource ─→ FrameProducer ═trace═→ Renderer ─→ OutputStream ─→ device
//!                                          │
//!                                     AnalysisTap ═→ FrequencyAnalyser ─→ listeners
//! ```
//!
//! Every change made from the control side reaches the realtime path either
//! as a message on the renderer's ring or as a whole frame-settings snapshot
//! picked up by the producer at the next frame boundary.

use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
};

use rtrb::{Producer, RingBuffer};
use tracing::{error, info, warn};

use crate::{
    analysis::{
        analysis_channel, window_len, FrequencyAnalyser, FrequencyCell, FrequencyListener,
        FrequencySnapshot, ListenerRegistry,
    },
    config::PipelineConfig,
    control::{CcMapper, ControlAction, ParameterBank, ParameterTarget, ProjectState},
    effect::{EffectChain, EffectId},
    error::{OsciError, Result},
    geometry::Vector2,
    io::{converter::midi_to_render, AudioBackend, AudioDevice, MidiEvent, OutputStream},
    render::{FrameProducer, RenderMessage, RenderStats, Renderer, TraceEvent},
    source::{FrameSettings, ObjectParameters, ObjectSettings, SharedFrameSource},
};

const MIDI_CHANNELS: u8 = 16;

pub struct Pipeline {
    // Field order is drop order: producer first, then the device, then analysis
    producer: Option<FrameProducer>,
    stream: Option<Box<dyn OutputStream>>,
    analyser: Option<FrequencyAnalyser>,
    backend: Box<dyn AudioBackend>,
    renderer: Arc<Mutex<Renderer>>,
    controls: Producer<RenderMessage>,
    sample_rate: Arc<AtomicU32>,
    config: PipelineConfig,
    sources: Vec<SharedFrameSource>,
    active: usize,
    listeners: ListenerRegistry,
    frequency: Arc<FrequencyCell>,
    parameters: ParameterBank,
    mapper: CcMapper,
    enabled_effects: BTreeSet<EffectId>,
    stats: Arc<RenderStats>,
}

impl Pipeline {
    /// Open the preferred (or default) device and start producing from the
    /// first source.
    ///
    /// Fails with [`OsciError::NoDevice`] only when the host has no output
    /// device at all; a preferred device that is missing falls back to the
    /// default.
    pub fn start(
        mut backend: Box<dyn AudioBackend>,
        config: PipelineConfig,
        sources: Vec<SharedFrameSource>,
    ) -> Result<Self> {
        if sources.is_empty() {
            return Err(OsciError::InvalidParameter(
                "at least one frame source is required".into(),
            ));
        }

        let device = Self::initial_device(backend.as_ref(), &config)?;
        let sample_rate = device.sample_rate;

        let (chain, wobble_input) = EffectChain::standard(sample_rate as f32, config.wobble_volume);
        let frequency = Arc::new(FrequencyCell::default());
        let listeners: ListenerRegistry = Arc::new(Mutex::new(vec![
            wobble_input as Arc<dyn FrequencyListener>,
            Arc::clone(&frequency) as Arc<dyn FrequencyListener>,
        ]));

        let (trace_tx, trace_rx) = RingBuffer::<TraceEvent>::new(config.trace_capacity.max(1));
        let (controls, control_rx) = RingBuffer::new(config.control_capacity.max(1));
        let renderer = Renderer::new(sample_rate as f32, chain, trace_rx, control_rx);
        let stats = renderer.stats();
        let renderer = Arc::new(Mutex::new(renderer));

        let stream = backend.open(&device, Arc::clone(&renderer))?;
        let opened = stream.device().clone();

        let mut pipeline = Self {
            producer: None,
            stream: Some(stream),
            analyser: None,
            backend,
            renderer,
            controls,
            sample_rate: Arc::new(AtomicU32::new(opened.sample_rate)),
            parameters: ParameterBank::standard(config.wobble_volume),
            config,
            sources,
            active: 0,
            listeners,
            frequency,
            mapper: CcMapper::new(),
            enabled_effects: BTreeSet::new(),
            stats,
        };
        pipeline.bind_device_rate(opened.sample_rate)?;
        pipeline.sync_parameters()?;

        let first = Arc::clone(&pipeline.sources[0]);
        let frame_rate = pipeline.config.effective_frame_rate();
        for source in &pipeline.sources {
            let mut source = source.lock().map_err(|_| OsciError::Poisoned("frame source"))?;
            source.set_frame_rate(frame_rate);
            source.disable();
        }
        first
            .lock()
            .map_err(|_| OsciError::Poisoned("frame source"))?
            .enable();
        pipeline.producer = Some(FrameProducer::spawn(
            first,
            trace_tx,
            Arc::clone(&pipeline.sample_rate),
            frame_rate,
        )?);

        info!(device = %opened, sources = pipeline.sources.len(), "pipeline started");
        Ok(pipeline)
    }

    fn initial_device(backend: &dyn AudioBackend, config: &PipelineConfig) -> Result<AudioDevice> {
        if let Some(name) = config.device_name.as_deref() {
            match backend.find(name) {
                Ok(device) => return Ok(device),
                Err(err) => warn!(%err, "preferred device unavailable, using default"),
            }
        }
        backend.default_output_device()?.ok_or(OsciError::NoDevice)
    }

    /// Point the renderer, producer and analyser at a device rate. The
    /// analyser is always rebuilt, never retuned.
    fn bind_device_rate(&mut self, sample_rate: u32) -> Result<()> {
        if let Some(analyser) = self.analyser.take() {
            analyser.stop()?;
        }

        let window = window_len(sample_rate, self.config.effective_analysis_window());
        let (tap, input) = analysis_channel(window * self.config.analysis_ring_windows.max(2));
        {
            let mut renderer = self.lock_renderer()?;
            renderer.set_sample_rate(sample_rate as f32);
            renderer.set_analysis_tap(Some(tap));
        }
        self.sample_rate.store(sample_rate, Ordering::Release);
        self.analyser = Some(FrequencyAnalyser::spawn(
            input,
            sample_rate,
            window,
            Arc::clone(&self.listeners),
        )?);
        Ok(())
    }

    fn lock_renderer(&self) -> Result<std::sync::MutexGuard<'_, Renderer>> {
        self.renderer
            .lock()
            .map_err(|_| OsciError::Poisoned("renderer"))
    }

    fn send(&mut self, message: RenderMessage) -> Result<()> {
        self.controls
            .push(message)
            .map_err(|_| OsciError::QueueFull("renderer control"))
    }

    /// Push every parameter's current value to where it takes effect.
    fn sync_parameters(&mut self) -> Result<()> {
        let targets: Vec<_> = self.parameters.iter().map(|p| p.target).collect();
        for target in targets {
            self.dispatch(target)?;
        }
        Ok(())
    }

    // ---- parameters ------------------------------------------------------

    /// Set a parameter and forward it. Returns the stored value after
    /// clamping and snapping.
    pub fn set_parameter(&mut self, target: ParameterTarget, value: f32) -> Result<f32> {
        let stored = self
            .parameters
            .set(target, value)
            .ok_or_else(|| OsciError::InvalidParameter(target.label().into()))?;
        self.dispatch(target)?;
        Ok(stored)
    }

    fn dispatch(&mut self, target: ParameterTarget) -> Result<()> {
        let value = self
            .parameters
            .value(target)
            .ok_or_else(|| OsciError::InvalidParameter(target.label().into()))?;

        match target {
            ParameterTarget::Quality => self.send(RenderMessage::SetQuality(value)),
            ParameterTarget::RotationSpeed => self.send(RenderMessage::SetRotationSpeed(value)),
            ParameterTarget::TranslationSpeed => {
                self.send(RenderMessage::SetTranslationSpeed(value))
            }
            ParameterTarget::Scale => self.send(RenderMessage::SetScale(value)),
            ParameterTarget::TranslationX | ParameterTarget::TranslationY => {
                let translation = self.translation();
                self.send(RenderMessage::SetTranslation(translation))
            }
            ParameterTarget::FocalLength | ParameterTarget::ObjectRotateSpeed => {
                let parameters = self.object_parameters();
                match &self.producer {
                    Some(producer) => producer.set_object_parameters(parameters),
                    None => {
                        let mut source = self.sources[self.active]
                            .lock()
                            .map_err(|_| OsciError::Poisoned("frame source"))?;
                        let mut settings = source.frame_settings();
                        parameters.apply(&mut settings);
                        source.set_frame_settings(settings);
                        Ok(())
                    }
                }
            }
            ParameterTarget::Effect(id) => self.send(RenderMessage::SetEffectValue { id, value }),
        }
    }

    fn object_parameters(&self) -> ObjectParameters {
        let defaults = ObjectSettings::default();
        ObjectParameters {
            focal_length: self
                .parameters
                .value(ParameterTarget::FocalLength)
                .unwrap_or(defaults.focal_length),
            rotate_speed: self
                .parameters
                .value(ParameterTarget::ObjectRotateSpeed)
                .unwrap_or(defaults.rotate_speed),
        }
    }

    fn translation(&self) -> Vector2 {
        Vector2::new(
            self.parameters.value(ParameterTarget::TranslationX).unwrap_or(0.0),
            self.parameters.value(ParameterTarget::TranslationY).unwrap_or(0.0),
        )
    }

    pub fn parameters(&self) -> &ParameterBank {
        &self.parameters
    }

    // ---- renderer contract -----------------------------------------------

    pub fn set_quality(&mut self, quality: f32) -> Result<f32> {
        self.set_parameter(ParameterTarget::Quality, quality)
    }

    pub fn set_rotation_speed(&mut self, speed: f32) -> Result<f32> {
        self.set_parameter(ParameterTarget::RotationSpeed, speed)
    }

    pub fn set_translation_speed(&mut self, speed: f32) -> Result<f32> {
        self.set_parameter(ParameterTarget::TranslationSpeed, speed)
    }

    pub fn set_scale(&mut self, scale: f32) -> Result<f32> {
        self.set_parameter(ParameterTarget::Scale, scale)
    }

    pub fn set_translation(&mut self, translation: Vector2) -> Result<Vector2> {
        self.parameters.set(ParameterTarget::TranslationX, translation.x);
        self.parameters.set(ParameterTarget::TranslationY, translation.y);
        let stored = self.translation();
        self.send(RenderMessage::SetTranslation(stored))?;
        Ok(stored)
    }

    pub fn stop_midi_notes(&mut self) -> Result<()> {
        self.send(RenderMessage::StopMidiNotes)
    }

    pub fn reset_midi(&mut self) -> Result<()> {
        self.send(RenderMessage::ResetMidi)
    }

    pub fn set_main_midi_channel(&mut self, channel: u8) -> Result<()> {
        if channel >= MIDI_CHANNELS {
            return Err(OsciError::InvalidParameter(format!(
                "MIDI channel {channel} out of range"
            )));
        }
        self.send(RenderMessage::SetMainMidiChannel(channel))
    }

    // ---- effects -----------------------------------------------------------

    pub fn set_effect_value(&mut self, id: EffectId, value: f32) -> Result<f32> {
        self.set_parameter(ParameterTarget::Effect(id), value)
    }

    pub fn set_effect_enabled(&mut self, id: EffectId, enabled: bool) -> Result<()> {
        self.send(RenderMessage::SetEffectEnabled { id, enabled })?;
        if enabled {
            self.enabled_effects.insert(id);
        } else {
            self.enabled_effects.remove(&id);
        }
        Ok(())
    }

    pub fn is_effect_enabled(&self, id: EffectId) -> bool {
        self.enabled_effects.contains(&id)
    }

    /// Rewind every effect phase; control values are kept.
    pub fn restart_effects(&mut self) -> Result<()> {
        self.send(RenderMessage::RestartEffects)
    }

    // ---- frame sources -----------------------------------------------------

    pub fn sources(&self) -> &[SharedFrameSource] {
        &self.sources
    }

    pub fn active_source(&self) -> usize {
        self.active
    }

    /// Replace the active source's settings. They apply from the next frame.
    pub fn set_frame_settings(&mut self, settings: FrameSettings) -> Result<()> {
        match &self.producer {
            Some(producer) => producer.set_frame_settings(settings),
            None => {
                let source = &self.sources[self.active];
                source
                    .lock()
                    .map_err(|_| OsciError::Poisoned("frame source"))?
                    .set_frame_settings(settings);
                Ok(())
            }
        }
    }

    pub fn frame_settings(&self) -> Result<FrameSettings> {
        match &self.producer {
            Some(producer) => producer.frame_settings(),
            None => Ok(self.sources[self.active]
                .lock()
                .map_err(|_| OsciError::Poisoned("frame source"))?
                .frame_settings()),
        }
    }

    /// Switch to another source.
    ///
    /// The old producer finishes at a shape boundary and is joined before the
    /// new one starts, so the renderer sees the old source's points followed
    /// by the new source's, never a mix. Settings carry over where the two
    /// sources are compatible and effect phases restart.
    ///
    /// A full control queue refuses the switch before anything changes. Once
    /// the old producer is stopped a producer is always running again when
    /// this returns, on the new source or, if it could not be activated, on
    /// the old one.
    pub fn select_source(&mut self, index: usize) -> Result<()> {
        let next = self
            .sources
            .get(index)
            .cloned()
            .ok_or_else(|| OsciError::InvalidParameter(format!("no frame source {index}")))?;
        if self.controls.slots() == 0 {
            return Err(OsciError::QueueFull("renderer control"));
        }
        let settings = {
            let previous = self.frame_settings()?;
            let source = next.lock().map_err(|_| OsciError::Poisoned("frame source"))?;
            let mut settings = previous.carry_over(&source.frame_settings());
            self.object_parameters().apply(&mut settings);
            settings
        };

        let trace = self.take_trace()?;
        let activated = self.activate(index, &next, settings);
        self.producer = Some(FrameProducer::spawn(
            Arc::clone(&self.sources[self.active]),
            trace,
            Arc::clone(&self.sample_rate),
            self.config.effective_frame_rate(),
        )?);
        let name = activated?;

        if let Err(err) = self.send(RenderMessage::RestartEffects) {
            warn!(%err, "effect restart not queued, phases continue");
        }
        info!(index, source = %name, "frame source selected");
        Ok(())
    }

    /// Stop the running producer and take back its trace ring. If the ring
    /// went down with the thread, a fresh one is handed to the renderer.
    fn take_trace(&mut self) -> Result<Producer<TraceEvent>> {
        let stopped = match self.producer.take() {
            Some(producer) => producer.stop(),
            None => Err(OsciError::ThreadPanicked("frame producer")),
        };
        match stopped {
            Ok(trace) => Ok(trace),
            Err(err) => {
                warn!(%err, "frame producer lost, starting a new trace ring");
                let (trace, consumer) = RingBuffer::new(self.config.trace_capacity.max(1));
                self.lock_renderer()?.replace_trace(consumer);
                Ok(trace)
            }
        }
    }

    /// Make `index` the active source. Nothing changes if a source lock is
    /// poisoned.
    fn activate(
        &mut self,
        index: usize,
        next: &SharedFrameSource,
        settings: FrameSettings,
    ) -> Result<String> {
        let mut source = next.lock().map_err(|_| OsciError::Poisoned("frame source"))?;
        if index != self.active {
            self.sources[self.active]
                .lock()
                .map_err(|_| OsciError::Poisoned("frame source"))?
                .disable();
        }
        source.set_frame_settings(settings);
        source.enable();
        self.active = index;
        Ok(source.name().to_owned())
    }

    // ---- MIDI ---------------------------------------------------------------

    /// Route a decoded MIDI event: notes go to the renderer's bookkeeping,
    /// control and program changes through the CC mapper.
    pub fn handle_midi(&mut self, event: MidiEvent) -> Result<Option<ControlAction>> {
        if let Some(message) = midi_to_render(event) {
            self.send(message)?;
            return Ok(None);
        }

        let action = self
            .mapper
            .handle(event, &self.parameters, self.sources.len());
        match action {
            Some(ControlAction::SetParameter { target, value }) => {
                self.set_parameter(target, value)?;
            }
            Some(ControlAction::StopMidiNotes) => self.stop_midi_notes()?,
            Some(ControlAction::SelectSource(index)) => self.select_source(index)?,
            Some(ControlAction::Bound { cc, target }) => {
                info!(cc, target = target.label(), "MIDI controller bound");
            }
            None => {}
        }
        Ok(action)
    }

    /// Arm `target` so the next control change binds to it.
    pub fn arm(&mut self, target: ParameterTarget) {
        self.mapper.arm(target);
    }

    pub fn disarm(&mut self) {
        self.mapper.disarm();
    }

    pub fn reset_cc_map(&mut self) {
        self.mapper.reset();
    }

    pub fn cc_mapper(&self) -> &CcMapper {
        &self.mapper
    }

    // ---- persistence boundary --------------------------------------------

    pub fn project_state(&self) -> ProjectState {
        ProjectState::capture(&self.parameters, &self.mapper)
    }

    /// Load saved parameters and bindings, skipping entries that no longer
    /// apply. Returns how many parameters were restored.
    pub fn restore_project(&mut self, state: &ProjectState) -> Result<usize> {
        let changed = state.apply(&mut self.parameters, &mut self.mapper);
        for &target in &changed {
            self.dispatch(target)?;
        }
        Ok(changed.len())
    }

    // ---- frequency -------------------------------------------------------

    pub fn add_frequency_listener(&self, listener: Arc<dyn FrequencyListener>) -> Result<()> {
        self.listeners
            .lock()
            .map_err(|_| OsciError::Poisoned("frequency listeners"))?
            .push(listener);
        Ok(())
    }

    /// Most recent estimate published by the analyser.
    pub fn frequency(&self) -> FrequencySnapshot {
        self.frequency.load()
    }

    // ---- devices -----------------------------------------------------------

    pub fn device(&self) -> Option<&AudioDevice> {
        self.stream.as_ref().map(|stream| stream.device())
    }

    pub fn output_devices(&self) -> Result<Vec<AudioDevice>> {
        self.backend.output_devices()
    }

    /// Move playback to another device.
    ///
    /// The current stream is released before the new device is opened. If
    /// the new device cannot be opened the previous one is reopened and the
    /// renderer carries on where it was; on success the renderer is hard
    /// restarted at the new rate and the analyser rebuilt.
    pub fn switch_device(&mut self, name: &str) -> Result<AudioDevice> {
        let target = self.backend.find(name).inspect_err(|err| {
            warn!(%err, "device switch refused, staying on current device");
        })?;
        let previous = self.device().cloned();

        drop(self.stream.take());
        match self.backend.open(&target, Arc::clone(&self.renderer)) {
            Ok(stream) => {
                let opened = stream.device().clone();
                self.stream = Some(stream);
                self.lock_renderer()?.hard_restart();
                self.bind_device_rate(opened.sample_rate)?;
                info!(device = %opened, "switched output device");
                Ok(opened)
            }
            Err(err) => {
                warn!(%err, device = %target, "device switch failed, restoring previous device");
                if let Some(previous) = previous {
                    match self.backend.open(&previous, Arc::clone(&self.renderer)) {
                        Ok(stream) => self.stream = Some(stream),
                        Err(reopen) => error!(err = %reopen, "previous device could not be reopened"),
                    }
                }
                Err(err)
            }
        }
    }

    // ---- status ------------------------------------------------------------

    pub fn stats(&self) -> &Arc<RenderStats> {
        &self.stats
    }

    pub fn underruns(&self) -> u64 {
        self.stats.underruns()
    }

    /// Stop production first so the renderer drains cleanly, then release
    /// the device and the analyser.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(producer) = self.producer.take() {
            producer.stop()?;
        }
        drop(self.stream.take());
        if let Some(analyser) = self.analyser.take() {
            analyser.stop()?;
        }
        info!(underruns = self.stats.underruns(), "pipeline stopped");
        Ok(())
    }
}

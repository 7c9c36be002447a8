use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rtrb::Consumer;

use crate::{
    analysis::AnalysisTap,
    effect::EffectChain,
    geometry::Vector2,
    render::{Motion, RenderMessage, TraceEvent},
};

const MIN_QUALITY: f32 = 0.05;
const MAX_QUALITY: f32 = 16.0;
const MIDI_KEYS: usize = 128;
const MIDI_CHANNELS: u8 = 16;

/// Counters published by the renderer for the control side.
#[derive(Debug, Default)]
pub struct RenderStats {
    underruns: AtomicU64,
    frames: AtomicU64,
    samples: AtomicU64,
}

impl RenderStats {
    /// Output samples for which no traced point was ready.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Frames started so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}

/// The realtime sink.
///
/// `render_block` is called from the audio callback. It drains pending
/// control messages, then for each output frame takes the next traced point,
/// runs it through the effect chain and the live motion, and writes X to
/// channel 0 and Y to channel 1. It never allocates, locks or blocks.
pub struct Renderer {
    sample_rate: f32,
    chain: EffectChain,
    motion: Motion,
    trace: Consumer<TraceEvent>,
    controls: Consumer<RenderMessage>,
    tap: Option<AnalysisTap>,
    quality: f32,
    step: f32,
    current: Vector2,
    sample_index: u64,
    idle: bool,
    notes: NoteState,
    stats: Arc<RenderStats>,
}

impl Renderer {
    pub fn new(
        sample_rate: f32,
        chain: EffectChain,
        trace: Consumer<TraceEvent>,
        controls: Consumer<RenderMessage>,
    ) -> Self {
        Self {
            sample_rate,
            chain,
            motion: Motion::new(),
            trace,
            controls,
            tap: None,
            quality: 1.0,
            step: 0.0,
            current: Vector2::ZERO,
            sample_index: 0,
            idle: true,
            notes: NoteState::new(),
            stats: Arc::new(RenderStats::default()),
        }
    }

    /// Fill an interleaved output buffer with `channels` channels.
    pub fn render_block(&mut self, out: &mut [f32], channels: usize) {
        self.drain_controls();

        if channels == 0 {
            return;
        }
        for frame in out.chunks_mut(channels) {
            let point = self.next_point();
            let shaped = self.chain.apply(self.sample_index, point);
            let moved = self.motion.apply(shaped, self.sample_rate);

            frame[0] = moved.x;
            if let Some(y) = frame.get_mut(1) {
                *y = moved.y;
            }
            for extra in frame.iter_mut().skip(2) {
                *extra = 0.0;
            }

            if let Some(tap) = self.tap.as_mut() {
                tap.push(moved);
            }
            self.sample_index += 1;
        }
        self.stats
            .samples
            .store(self.sample_index, Ordering::Relaxed);
    }

    /// Render `count` stereo points without a device; used for offline
    /// rendering and tests.
    pub fn render_points(&mut self, count: usize) -> Vec<Vector2> {
        let mut buffer = vec![0.0; count * 2];
        self.render_block(&mut buffer, 2);
        buffer
            .chunks_exact(2)
            .map(|pair| Vector2::new(pair[0], pair[1]))
            .collect()
    }

    fn drain_controls(&mut self) {
        while let Ok(message) = self.controls.pop() {
            self.handle(message);
        }
    }

    fn handle(&mut self, message: RenderMessage) {
        match message {
            RenderMessage::SetQuality(quality) => self.set_quality(quality),
            RenderMessage::SetRotationSpeed(speed) => self.motion.rotation_speed = finite_or(speed, 0.0),
            RenderMessage::SetTranslationSpeed(speed) => {
                self.motion.translation_speed = finite_or(speed, 0.0)
            }
            RenderMessage::SetScale(scale) => self.motion.scale = finite_or(scale, 1.0),
            RenderMessage::SetTranslation(translation) => {
                if translation.is_finite() {
                    self.motion.translation = translation;
                }
            }
            RenderMessage::SetEffectValue { id, value } => {
                self.chain.set_value(id, value);
            }
            RenderMessage::SetEffectEnabled { id, enabled } => {
                self.chain.set_enabled(id, enabled);
            }
            RenderMessage::RestartEffects => self.chain.restart(),
            RenderMessage::NoteOn {
                channel,
                key,
                velocity,
            } => self.notes.note_on(channel, key, velocity),
            RenderMessage::NoteOff { channel, key } => self.notes.note_off(channel, key),
            RenderMessage::StopMidiNotes => self.notes.release_all(),
            RenderMessage::ResetMidi => self.notes.reset(),
            RenderMessage::SetMainMidiChannel(channel) => self.notes.set_main_channel(channel),
        }
    }

    /// Advance the trace by `quality` points and return the current one.
    ///
    /// With quality 1 every output sample consumes exactly one point. Lower
    /// values hold points for several samples, higher values skip through the
    /// trace faster.
    fn next_point(&mut self) -> Vector2 {
        self.step += self.quality;
        while self.step >= 1.0 {
            self.step -= 1.0;
            match self.pop_point() {
                Some(point) => self.current = point,
                None => {
                    if !self.idle {
                        self.stats.underruns.fetch_add(1, Ordering::Relaxed);
                    }
                    self.step = 0.0;
                    break;
                }
            }
        }
        self.current
    }

    fn pop_point(&mut self) -> Option<Vector2> {
        while let Ok(event) = self.trace.pop() {
            match event {
                TraceEvent::FrameStart => {
                    self.chain.commit();
                    self.idle = false;
                    self.stats.frames.fetch_add(1, Ordering::Relaxed);
                }
                TraceEvent::Point(point) => {
                    // Never send NaN to the device; hold the beam instead
                    return Some(if point.is_finite() { point } else { self.current });
                }
                TraceEvent::EndOfStream => self.idle = true,
            }
        }
        None
    }

    pub fn set_quality(&mut self, quality: f32) {
        self.quality = finite_or(quality, 1.0).clamp(MIN_QUALITY, MAX_QUALITY);
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Adopt a new device rate. Effects are told so their phase rates stay
    /// correct.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.chain.set_sample_rate(sample_rate);
    }

    /// Rewind every phase: effect accumulators and the live motion.
    pub fn hard_restart(&mut self) {
        self.chain.restart();
        self.motion.reset();
    }

    /// Read points from a new trace ring. Anything left in the old one is
    /// dropped and the beam holds until the next frame.
    pub fn replace_trace(&mut self, trace: Consumer<TraceEvent>) {
        self.trace = trace;
        self.idle = true;
    }

    pub fn set_analysis_tap(&mut self, tap: Option<AnalysisTap>) {
        self.tap = tap;
    }

    pub fn effects(&mut self) -> &mut EffectChain {
        &mut self.chain
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn held_notes(&self) -> usize {
        self.notes.held()
    }

    pub fn main_midi_channel(&self) -> u8 {
        self.notes.main_channel
    }

    pub fn stats(&self) -> Arc<RenderStats> {
        Arc::clone(&self.stats)
    }

    /// The last point taken from the trace.
    pub fn current_point(&self) -> Vector2 {
        self.current
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Held-note table for the main MIDI channel.
#[derive(Debug)]
struct NoteState {
    main_channel: u8,
    held: [bool; MIDI_KEYS],
}

impl NoteState {
    fn new() -> Self {
        Self {
            main_channel: 0,
            held: [false; MIDI_KEYS],
        }
    }

    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        if channel != self.main_channel {
            return;
        }
        if let Some(slot) = self.held.get_mut(key as usize) {
            // Note-on with zero velocity is a note-off
            *slot = velocity > 0;
        }
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        if channel != self.main_channel {
            return;
        }
        if let Some(slot) = self.held.get_mut(key as usize) {
            *slot = false;
        }
    }

    fn release_all(&mut self) {
        self.held = [false; MIDI_KEYS];
    }

    fn reset(&mut self) {
        self.release_all();
        self.main_channel = 0;
    }

    fn set_main_channel(&mut self, channel: u8) {
        if channel < MIDI_CHANNELS && channel != self.main_channel {
            self.release_all();
            self.main_channel = channel;
        }
    }

    fn held(&self) -> usize {
        self.held.iter().filter(|&&held| held).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::{Producer, RingBuffer};

    fn renderer_with(chain: EffectChain) -> (Renderer, Producer<TraceEvent>, Producer<RenderMessage>) {
        let (trace_tx, trace_rx) = RingBuffer::new(1024);
        let (control_tx, control_rx) = RingBuffer::new(64);
        (Renderer::new(48_000.0, chain, trace_rx, control_rx), trace_tx, control_tx)
    }

    fn push_points(tx: &mut Producer<TraceEvent>, points: &[Vector2]) {
        tx.push(TraceEvent::FrameStart).unwrap();
        for &p in points {
            tx.push(TraceEvent::Point(p)).unwrap();
        }
    }

    #[test]
    fn test_points_pass_through_identity_chain() {
        let (mut renderer, mut trace, _) = renderer_with(EffectChain::new());
        let points: Vec<_> = (0..10).map(|i| Vector2::new(i as f32 * 0.1, -0.5)).collect();
        push_points(&mut trace, &points);

        assert_eq!(renderer.render_points(10), points);
        assert_eq!(renderer.stats().frames(), 1);
        assert_eq!(renderer.stats().underruns(), 0);
    }

    #[test]
    fn test_underrun_holds_last_point() {
        let (mut renderer, mut trace, _) = renderer_with(EffectChain::new());
        push_points(&mut trace, &[Vector2::new(0.3, 0.4)]);

        let out = renderer.render_points(4);
        assert!(out.iter().all(|&p| p == Vector2::new(0.3, 0.4)));
        assert_eq!(renderer.stats().underruns(), 3);
    }

    #[test]
    fn test_end_of_stream_is_not_an_underrun() {
        let (mut renderer, mut trace, _) = renderer_with(EffectChain::new());
        push_points(&mut trace, &[Vector2::new(0.3, 0.4)]);
        trace.push(TraceEvent::EndOfStream).unwrap();

        renderer.render_points(1);
        renderer.render_points(5);
        assert_eq!(renderer.stats().underruns(), 0);
    }

    #[test]
    fn test_quality_half_holds_each_point_twice() {
        let (mut renderer, mut trace, mut controls) = renderer_with(EffectChain::new());
        let points = [Vector2::new(0.1, 0.0), Vector2::new(0.2, 0.0), Vector2::new(0.3, 0.0)];
        push_points(&mut trace, &points);
        controls.push(RenderMessage::SetQuality(0.5)).unwrap();

        let out = renderer.render_points(6);
        // First sample still shows the resting beam
        assert_eq!(out[0], Vector2::ZERO);
        assert_eq!(out[1], points[0]);
        assert_eq!(out[2], points[0]);
        assert_eq!(out[3], points[1]);
    }

    #[test]
    fn test_quality_two_skips_points() {
        let (mut renderer, mut trace, mut controls) = renderer_with(EffectChain::new());
        let points: Vec<_> = (1..=6).map(|i| Vector2::new(i as f32, 0.0)).collect();
        push_points(&mut trace, &points);
        controls.push(RenderMessage::SetQuality(2.0)).unwrap();

        let out = renderer.render_points(3);
        assert_eq!(out, vec![points[1], points[3], points[5]]);
    }

    #[test]
    fn test_mono_device_gets_x() {
        let (mut renderer, mut trace, _) = renderer_with(EffectChain::new());
        push_points(&mut trace, &[Vector2::new(0.25, 0.75)]);
        let mut out = [0.0f32; 1];
        renderer.render_block(&mut out, 1);
        assert_eq!(out, [0.25]);
    }

    #[test]
    fn test_extra_channels_are_silent() {
        let (mut renderer, mut trace, _) = renderer_with(EffectChain::new());
        push_points(&mut trace, &[Vector2::new(0.25, 0.75)]);
        let mut out = [9.0f32; 4];
        renderer.render_block(&mut out, 4);
        assert_eq!(out, [0.25, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn test_non_finite_points_hold_the_beam() {
        let (mut renderer, mut trace, _) = renderer_with(EffectChain::new());
        push_points(&mut trace, &[Vector2::new(0.5, 0.5), Vector2::new(f32::NAN, 0.0)]);
        let out = renderer.render_points(2);
        assert_eq!(out[1], Vector2::new(0.5, 0.5));
    }

    #[test]
    fn test_controls_apply_before_next_sample() {
        let (mut renderer, mut trace, mut controls) = renderer_with(EffectChain::new());
        push_points(&mut trace, &[Vector2::new(1.0, 1.0), Vector2::new(1.0, 1.0)]);

        assert_eq!(renderer.render_points(1)[0], Vector2::new(1.0, 1.0));
        controls.push(RenderMessage::SetScale(0.5)).unwrap();
        controls
            .push(RenderMessage::SetTranslation(Vector2::new(0.25, 0.0)))
            .unwrap();
        assert_eq!(renderer.render_points(1)[0], Vector2::new(0.75, 0.5));
    }

    #[test]
    fn test_note_bookkeeping() {
        let (mut renderer, _, mut controls) = renderer_with(EffectChain::new());
        for message in [
            RenderMessage::NoteOn { channel: 0, key: 60, velocity: 100 },
            RenderMessage::NoteOn { channel: 0, key: 64, velocity: 100 },
            RenderMessage::NoteOn { channel: 3, key: 67, velocity: 100 },
            RenderMessage::NoteOn { channel: 0, key: 64, velocity: 0 },
        ] {
            controls.push(message).unwrap();
        }
        renderer.render_points(1);
        assert_eq!(renderer.held_notes(), 1);

        controls.push(RenderMessage::SetMainMidiChannel(3)).unwrap();
        controls
            .push(RenderMessage::NoteOn { channel: 3, key: 67, velocity: 90 })
            .unwrap();
        renderer.render_points(1);
        assert_eq!(renderer.held_notes(), 1);
        assert_eq!(renderer.main_midi_channel(), 3);

        controls.push(RenderMessage::ResetMidi).unwrap();
        renderer.render_points(1);
        assert_eq!(renderer.held_notes(), 0);
        assert_eq!(renderer.main_midi_channel(), 0);
    }

    #[test]
    fn test_staged_frequency_applies_from_next_frame() {
        use crate::{analysis::FrequencyListener, effect::{EffectId, WobbleEffect}};

        let wobble = WobbleEffect::new(48_000.0, 0.5);
        let input = wobble.frequency_input();
        let (mut renderer, mut trace, _) =
            renderer_with(EffectChain::new().with(EffectId::Wobble, wobble));

        let points = vec![Vector2::ZERO; 8];
        push_points(&mut trace, &points);
        push_points(&mut trace, &points);

        // Frame one was committed at 0 Hz
        assert!(renderer.render_points(4).iter().all(|&p| p == Vector2::ZERO));

        // An estimate arriving mid-frame must not touch the rest of the frame
        input.update_frequency(1_000.0, 1_000.0);
        assert!(renderer.render_points(4).iter().all(|&p| p == Vector2::ZERO));

        let next = renderer.render_points(4);
        assert!(next.iter().all(|p| p.x > 0.0));
        assert_eq!(renderer.stats().frames(), 2);
    }
}

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use rtrb::{Producer, PushError};

use crate::{
    geometry::{frame::usable_weight, Frame, Shape, Vector2},
    render::TraceEvent,
    source::{FrameSettings, ObjectParameters, SharedFrameSource, Transform},
    OsciError, Result,
};

/*
Frame Production
================

Every frame gets the same number of samples:

    samples_per_frame = sample_rate / frame_rate

so the image refreshes at `frame_rate` no matter how complex it is. Those
samples are shared out between the shapes in proportion to their weight:

    count_i ≈ samples_per_frame × weight_i / Σ weight

using the largest-remainder method, so the counts always add up to exactly
`samples_per_frame`. Each shape is then sampled at evenly spaced t from 0 to
1 inclusive, and every point goes through the frame's transform (scale →
rotate → translate) before being queued for the renderer.

Shapes with a NaN, infinite, zero or negative weight get no samples. A frame
with nothing drawable still takes up `samples_per_frame` samples (the beam
rests at the origin) so the frame cadence is kept.
*/

const BACKPRESSURE_WAIT: Duration = Duration::from_millis(1);
/// How long a stopping producer waits for room to queue `EndOfStream`.
const END_OF_STREAM_WAIT: Duration = Duration::from_millis(50);

/// Samples per frame at the given rates, at least one.
pub fn samples_per_frame(sample_rate: f32, frame_rate: f32) -> usize {
    if frame_rate <= 0.0 || !frame_rate.is_finite() {
        return sample_rate.max(1.0) as usize;
    }
    ((sample_rate / frame_rate).round() as usize).max(1)
}

/// Split `total` samples between shapes in proportion to their weights.
///
/// Malformed weights (non-finite, zero or negative) receive zero samples. The
/// result sums to `total` unless no weight is usable, in which case it is all
/// zeros.
pub fn allocate_samples(weights: &[f32], total: usize) -> Vec<usize> {
    let usable: Vec<f32> = weights
        .iter()
        .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
        .collect();
    let sum: f64 = usable.iter().map(|&w| w as f64).sum();
    if sum <= 0.0 {
        return vec![0; weights.len()];
    }

    let exact: Vec<f64> = usable
        .iter()
        .map(|&w| w as f64 / sum * total as f64)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let assigned: usize = counts.iter().sum();
    let mut order: Vec<usize> = (0..counts.len()).filter(|&i| usable[i] > 0.0).collect();
    // Largest fractional part first; earlier shapes win ties
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });
    for &i in order.iter().cycle().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    counts
}

/// Sample one shape at `count` evenly spaced t values over `[0, 1]`.
pub fn trace_shape(
    shape: &dyn Shape,
    count: usize,
    transform: &Transform,
    mut emit: impl FnMut(Vector2),
) {
    match count {
        0 => {}
        1 => emit(transform.apply(shape.point_at(0.0))),
        _ => {
            let last = (count - 1) as f32;
            for k in 0..count {
                emit(transform.apply(shape.point_at(k as f32 / last)));
            }
        }
    }
}

/// Convert a whole frame to points in drawing order.
pub fn convert_frame(frame: &Frame, transform: &Transform, samples_per_frame: usize) -> Vec<Vector2> {
    let mut points = Vec::with_capacity(samples_per_frame);
    let weights: Vec<f32> = frame.shapes().iter().map(|s| usable_weight(s.as_ref())).collect();
    let counts = allocate_samples(&weights, samples_per_frame);

    if counts.iter().all(|&c| c == 0) {
        points.resize(samples_per_frame, transform.apply(Vector2::ZERO));
        return points;
    }

    for (shape, &count) in frame.shapes().iter().zip(&counts) {
        trace_shape(shape.as_ref(), count, transform, |p| points.push(p));
    }
    points
}

/// Updates waiting for the next frame boundary.
#[derive(Debug, Default)]
struct Pending {
    settings: Option<FrameSettings>,
    object: Option<ObjectParameters>,
}

/// Runs one frame source on its own thread, streaming points to the renderer.
///
/// Stopping is cooperative: the thread checks its stop flag between shapes and
/// while waiting for room in the trace ring, queues `EndOfStream`, then hands
/// the ring back so the next producer can continue the same stream.
pub struct FrameProducer {
    source: SharedFrameSource,
    pending: Arc<Mutex<Pending>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Producer<TraceEvent>>>,
}

impl FrameProducer {
    pub fn spawn(
        source: SharedFrameSource,
        trace: Producer<TraceEvent>,
        sample_rate: Arc<AtomicU32>,
        frame_rate: f32,
    ) -> Result<Self> {
        let pending = Arc::new(Mutex::new(Pending::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = ProducerLoop {
            source: Arc::clone(&source),
            pending: Arc::clone(&pending),
            stop: Arc::clone(&stop),
            trace,
            sample_rate,
            frame_rate,
        };
        let handle = thread::Builder::new()
            .name("frame-producer".into())
            .spawn(move || worker.run())
            .map_err(|err| OsciError::Source(format!("failed to spawn producer: {err}")))?;

        Ok(Self {
            source,
            pending,
            stop,
            handle: Some(handle),
        })
    }

    pub fn source(&self) -> &SharedFrameSource {
        &self.source
    }

    /// Replace the settings; picked up at the next frame boundary.
    pub fn set_frame_settings(&self, settings: FrameSettings) -> Result<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| OsciError::Poisoned("frame settings"))?;
        pending.settings = Some(settings);
        Ok(())
    }

    /// Change focal length and rotate speed at the next frame boundary,
    /// keeping everything else the source holds.
    pub fn set_object_parameters(&self, parameters: ObjectParameters) -> Result<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| OsciError::Poisoned("frame settings"))?;
        pending.object = Some(parameters);
        Ok(())
    }

    /// The settings the next frame will use.
    pub fn frame_settings(&self) -> Result<FrameSettings> {
        let pending = self
            .pending
            .lock()
            .map_err(|_| OsciError::Poisoned("frame settings"))?;
        let mut settings = match pending.settings {
            Some(settings) => settings,
            None => self
                .source
                .lock()
                .map_err(|_| OsciError::Poisoned("frame source"))?
                .frame_settings(),
        };
        if let Some(object) = pending.object {
            object.apply(&mut settings);
        }
        Ok(settings)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and take back the trace ring.
    pub fn stop(mut self) -> Result<Producer<TraceEvent>> {
        self.stop.store(true, Ordering::Release);
        let handle = self
            .handle
            .take()
            .ok_or(OsciError::ThreadPanicked("frame producer"))?;
        handle
            .join()
            .map_err(|_| OsciError::ThreadPanicked("frame producer"))
    }
}

impl Drop for FrameProducer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct ProducerLoop {
    source: SharedFrameSource,
    pending: Arc<Mutex<Pending>>,
    stop: Arc<AtomicBool>,
    trace: Producer<TraceEvent>,
    sample_rate: Arc<AtomicU32>,
    frame_rate: f32,
}

impl ProducerLoop {
    fn run(mut self) -> Producer<TraceEvent> {
        let mut last_good: Option<Frame> = None;

        while !self.stopping() {
            let Some((frame, transform)) = self.next_frame(&mut last_good) else {
                thread::sleep(Duration::from_secs_f32(1.0 / self.frame_rate.max(1.0)));
                continue;
            };

            let sample_rate = self.sample_rate.load(Ordering::Acquire) as f32;
            let total = samples_per_frame(sample_rate, self.frame_rate);
            if !self.emit_frame(&frame, &transform, total) {
                break;
            }
        }

        self.end_stream();
        self.trace
    }

    /// Queue `EndOfStream`, waiting a little for the renderer to make room.
    fn end_stream(&mut self) {
        let deadline = Instant::now() + END_OF_STREAM_WAIT;
        while self.trace.push(TraceEvent::EndOfStream).is_err() {
            if self.trace.is_abandoned() || Instant::now() >= deadline {
                tracing::debug!("trace ring full, stopped without end of stream");
                return;
            }
            thread::sleep(BACKPRESSURE_WAIT);
        }
    }

    /// Pull a frame, applying any pending settings first. Falls back to the
    /// last good frame if the source fails.
    fn next_frame(&mut self, last_good: &mut Option<Frame>) -> Option<(Frame, Transform)> {
        let update = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => Pending::default(),
        };

        let Ok(mut source) = self.source.lock() else {
            tracing::warn!("frame source lock poisoned, producer idle");
            return None;
        };
        if let Some(settings) = update.settings {
            source.set_frame_settings(settings);
        }
        if let Some(object) = update.object {
            let mut settings = source.frame_settings();
            object.apply(&mut settings);
            source.set_frame_settings(settings);
        }
        let transform = source.frame_settings().transform;

        match source.next_frame() {
            Ok(frame) => {
                *last_good = Some(frame.clone());
                Some((frame, transform))
            }
            Err(err) => {
                tracing::warn!(source = source.name(), %err, "frame source read failed, repeating last frame");
                last_good.clone().map(|frame| (frame, transform))
            }
        }
    }

    /// Queue one frame. Returns false if stopped part way.
    fn emit_frame(&mut self, frame: &Frame, transform: &Transform, total: usize) -> bool {
        if !self.push(TraceEvent::FrameStart) {
            return false;
        }

        let weights: Vec<f32> = frame.shapes().iter().map(|s| usable_weight(s.as_ref())).collect();
        let skipped = weights.iter().filter(|&&w| w == 0.0).count();
        if skipped > 0 {
            tracing::trace!(skipped, "shapes without usable weight skipped");
        }
        let counts = allocate_samples(&weights, total);

        if counts.iter().all(|&c| c == 0) {
            let rest = transform.apply(Vector2::ZERO);
            return (0..total).all(|_| self.push(TraceEvent::Point(rest)));
        }

        for (shape, &count) in frame.shapes().iter().zip(&counts) {
            if self.stopping() {
                return false;
            }
            let mut ok = true;
            trace_shape(shape.as_ref(), count, transform, |p| {
                ok = ok && self.push(TraceEvent::Point(p));
            });
            if !ok {
                return false;
            }
        }
        true
    }

    /// Push with backpressure. Returns false if stopped while waiting or the
    /// renderer went away.
    fn push(&mut self, event: TraceEvent) -> bool {
        let mut event = event;
        loop {
            match self.trace.push(event) {
                Ok(()) => return true,
                Err(PushError::Full(rejected)) => {
                    if self.stopping() || self.trace.is_abandoned() {
                        return false;
                    }
                    event = rejected;
                    thread::sleep(BACKPRESSURE_WAIT);
                }
            }
        }
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::Line,
        source::{shared, FrameSource, ObjectSettings, StaticFrameSource, WireframeSource},
    };
    use rtrb::{Consumer, RingBuffer};

    /// 10 samples per frame.
    const SAMPLE_RATE: u32 = 480;
    const FRAME_RATE: f32 = 48.0;

    fn line() -> Line {
        Line::new(Vector2::new(-1.0, 0.0), Vector2::new(1.0, 0.0))
    }

    fn spawn(source: SharedFrameSource, capacity: usize) -> (FrameProducer, Consumer<TraceEvent>) {
        let (tx, rx) = RingBuffer::new(capacity);
        let rate = Arc::new(AtomicU32::new(SAMPLE_RATE));
        (FrameProducer::spawn(source, tx, rate, FRAME_RATE).unwrap(), rx)
    }

    fn next_event(rx: &mut Consumer<TraceEvent>) -> TraceEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(event) = rx.pop() {
                return event;
            }
            assert!(Instant::now() < deadline, "producer went quiet");
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Read up to and including the next `FrameStart`, then the frame's points.
    fn next_frame(rx: &mut Consumer<TraceEvent>) -> Vec<Vector2> {
        while next_event(rx) != TraceEvent::FrameStart {}
        (0..10)
            .map(|_| match next_event(rx) {
                TraceEvent::Point(p) => p,
                other => panic!("expected a point, got {other:?}"),
            })
            .collect()
    }

    /// Serves one good frame, then fails on every read.
    struct FailsAfterFirst {
        served: bool,
        settings: FrameSettings,
    }

    impl FrameSource for FailsAfterFirst {
        fn next_frame(&mut self) -> Result<Frame> {
            if self.served {
                return Err(OsciError::Source("file vanished".into()));
            }
            self.served = true;
            Ok(Frame::new(vec![Box::new(line())]))
        }

        fn enable(&mut self) {}

        fn disable(&mut self) {}

        fn is_enabled(&self) -> bool {
            true
        }

        fn set_frame_settings(&mut self, settings: FrameSettings) {
            self.settings = settings;
        }

        fn frame_settings(&self) -> FrameSettings {
            self.settings
        }
    }

    #[test]
    fn test_read_failure_repeats_last_good_frame() {
        let source = shared(FailsAfterFirst {
            served: false,
            settings: FrameSettings::default(),
        });
        let (producer, mut rx) = spawn(source, 64);

        let first = next_frame(&mut rx);
        assert_eq!(first[0], Vector2::new(-1.0, 0.0));
        assert_eq!(first[9], Vector2::new(1.0, 0.0));
        for _ in 0..3 {
            assert_eq!(next_frame(&mut rx), first);
        }
        producer.stop().unwrap();
    }

    #[test]
    fn test_settings_wait_for_the_next_frame() {
        let source = shared(StaticFrameSource::new("line", Frame::new(vec![Box::new(line())])));
        // Smaller than a frame, so the producer is held inside the current one
        let (producer, mut rx) = spawn(source, 4);

        let mut current = Vec::new();
        while next_event(&mut rx) != TraceEvent::FrameStart {}
        for _ in 0..2 {
            if let TraceEvent::Point(p) = next_event(&mut rx) {
                current.push(p);
            }
        }

        producer
            .set_frame_settings(FrameSettings {
                transform: Transform {
                    scale: 2.0,
                    ..Transform::IDENTITY
                },
                object: None,
            })
            .unwrap();
        assert_eq!(producer.frame_settings().unwrap().transform.scale, 2.0);

        loop {
            match next_event(&mut rx) {
                TraceEvent::Point(p) => current.push(p),
                TraceEvent::FrameStart => break,
                TraceEvent::EndOfStream => panic!("producer stopped"),
            }
        }
        assert_eq!(current.len(), 10);
        assert_eq!(current[9], Vector2::new(1.0, 0.0));

        let scaled: Vec<Vector2> = (0..10)
            .map(|_| match next_event(&mut rx) {
                TraceEvent::Point(p) => p,
                other => panic!("expected a point, got {other:?}"),
            })
            .collect();
        assert_eq!(scaled[0], Vector2::new(-2.0, 0.0));
        assert_eq!(scaled[9], Vector2::new(2.0, 0.0));
        producer.stop().unwrap();
    }

    #[test]
    fn test_stop_queues_end_of_stream_and_returns_the_ring() {
        let source = shared(StaticFrameSource::new("line", Frame::new(vec![Box::new(line())])));
        let (producer, mut rx) = spawn(source, 16);
        assert!(producer.is_running());
        next_frame(&mut rx);

        let stopper = thread::spawn(move || producer.stop());
        while next_event(&mut rx) != TraceEvent::EndOfStream {}
        let mut trace = stopper.join().unwrap().unwrap();

        assert!(rx.is_empty());
        trace.push(TraceEvent::FrameStart).unwrap();
        assert!(matches!(rx.pop(), Ok(TraceEvent::FrameStart)));
    }

    #[test]
    fn test_object_parameters_keep_accumulated_rotation() {
        let mut cube = WireframeSource::cube();
        let mut object = ObjectSettings::default();
        object.rotate_speed = 1.0;
        cube.set_frame_settings(FrameSettings::with_object(object));
        cube.enable();
        let source = shared(cube);
        let (producer, mut rx) = spawn(Arc::clone(&source), 64);

        for _ in 0..3 {
            next_frame(&mut rx);
        }
        let before = source.lock().unwrap().frame_settings().object.unwrap();
        producer
            .set_object_parameters(ObjectParameters {
                focal_length: 2.0,
                rotate_speed: 1.0,
            })
            .unwrap();
        for _ in 0..3 {
            next_frame(&mut rx);
        }
        producer.stop().unwrap();

        let after = source.lock().unwrap().frame_settings().object.unwrap();
        assert_eq!(after.focal_length, 2.0);
        assert!(after.current_rotation.x > before.current_rotation.x);
    }

    #[test]
    fn test_allocation_sums_to_total() {
        let weights = [1.0, 2.0, 3.0, 0.5, 7.25];
        for total in [1, 7, 100, 801, 4096] {
            let counts = allocate_samples(&weights, total);
            assert_eq!(counts.iter().sum::<usize>(), total);

            let sum: f32 = weights.iter().sum();
            for (count, weight) in counts.iter().zip(weights) {
                let ideal = weight / sum * total as f32;
                assert!((*count as f32 - ideal).abs() < 1.0, "{count} vs {ideal}");
            }
        }
    }

    #[test]
    fn test_malformed_weights_get_nothing() {
        let counts = allocate_samples(&[f32::NAN, 1.0, -2.0, f32::INFINITY, 0.0, 1.0], 10);
        assert_eq!(counts, vec![0, 5, 0, 0, 0, 5]);
    }

    #[test]
    fn test_all_malformed_is_all_zero() {
        assert_eq!(allocate_samples(&[0.0, f32::NAN], 10), vec![0, 0]);
    }

    #[test]
    fn test_samples_per_frame() {
        assert_eq!(samples_per_frame(48_000.0, 60.0), 800);
        assert_eq!(samples_per_frame(44_100.0, 60.0), 735);
        assert_eq!(samples_per_frame(10.0, 100.0), 1);
    }

    #[test]
    fn test_single_shape_hits_both_ends() {
        let line = Line::new(Vector2::new(-1.0, 0.0), Vector2::new(1.0, 0.0));
        let frame = Frame::new(vec![Box::new(line)]);
        let points = convert_frame(&frame, &Transform::IDENTITY, 101);

        assert_eq!(points.len(), 101);
        assert_eq!(points[0], Vector2::new(-1.0, 0.0));
        assert_eq!(points[100], Vector2::new(1.0, 0.0));
        assert!((points[50].x).abs() < 1e-6);
    }

    #[test]
    fn test_empty_frame_rests_at_origin() {
        let points = convert_frame(&Frame::empty(), &Transform::IDENTITY, 16);
        assert_eq!(points, vec![Vector2::ZERO; 16]);
    }

    #[test]
    fn test_transform_is_applied() {
        let line = Line::new(Vector2::ZERO, Vector2::new(1.0, 0.0));
        let frame = Frame::new(vec![Box::new(line)]);
        let transform = Transform {
            scale: 2.0,
            rotation: 0.0,
            translation: Vector2::new(0.0, 0.5),
        };
        let points = convert_frame(&frame, &transform, 2);
        assert_eq!(points, vec![Vector2::new(0.0, 0.5), Vector2::new(2.0, 0.5)]);
    }
}

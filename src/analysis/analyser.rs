use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, trace, warn};

use crate::{
    analysis::{AnalysisInput, FrequencyListener, PeakEstimator},
    error::{OsciError, Result},
};

const MIN_WINDOW: usize = 256;
const MAX_WINDOW: usize = 1 << 20;
const IDLE_SLEEP: Duration = Duration::from_millis(2);

/// Listeners shared between the pipeline (which registers them) and the
/// analyser thread (which notifies them).
pub type ListenerRegistry = Arc<Mutex<Vec<Arc<dyn FrequencyListener>>>>;

/// Analysis window length for a device rate: `seconds` worth of samples,
/// rounded up to a power of two, between 256 and 2^20.
pub fn window_len(sample_rate: u32, seconds: f32) -> usize {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let samples = (sample_rate as f64 * seconds as f64).ceil() as usize;
    samples.clamp(MIN_WINDOW, MAX_WINDOW).next_power_of_two()
}

/// Estimates the per-channel dominant frequency of the emitted signal on its
/// own thread.
///
/// Bound to one device rate; the pipeline replaces it on device switch.
pub struct FrequencyAnalyser {
    sample_rate: u32,
    window: usize,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrequencyAnalyser {
    pub fn spawn(
        input: AnalysisInput,
        sample_rate: u32,
        window: usize,
        listeners: ListenerRegistry,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut worker = AnalyserLoop {
            input,
            estimator: PeakEstimator::new(window, sample_rate as f32),
            left: Vec::with_capacity(window),
            right: Vec::with_capacity(window),
            window,
            listeners,
            stop: Arc::clone(&stop),
        };

        let handle = thread::Builder::new()
            .name("frequency-analyser".into())
            .spawn(move || worker.run())
            .map_err(|e| OsciError::Device(format!("failed to spawn analyser: {e}")))?;

        debug!(sample_rate, window, "frequency analyser started");
        Ok(Self {
            sample_rate,
            window,
            stop,
            handle: Some(handle),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Latency of one estimate, in seconds.
    pub fn latency(&self) -> f32 {
        self.window as f32 / self.sample_rate as f32
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the loop to finish its current window check and wait for it.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| OsciError::ThreadPanicked("frequency-analyser")),
            None => Ok(()),
        }
    }
}

impl Drop for FrequencyAnalyser {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(%err, "analyser did not stop cleanly");
        }
    }
}

struct AnalyserLoop {
    input: AnalysisInput,
    estimator: PeakEstimator,
    left: Vec<f32>,
    right: Vec<f32>,
    window: usize,
    listeners: ListenerRegistry,
    stop: Arc<AtomicBool>,
}

impl AnalyserLoop {
    fn run(&mut self) {
        while !self.stop.load(Ordering::Acquire) {
            if !self.fill() {
                thread::sleep(IDLE_SLEEP);
                continue;
            }

            // The renderer dropped samples while this window was filling
            if self.input.take_overrun() {
                let discarded = self.input.discard();
                debug!(discarded, "analysis window overrun, dropped");
                self.clear();
                continue;
            }

            let left = self.estimator.estimate(&self.left);
            let right = self.estimator.estimate(&self.right);
            self.clear();
            trace!(left, right, "frequency estimate");
            self.publish(left, right);
        }
    }

    /// Pull queued pairs into the window. True once the window is complete.
    fn fill(&mut self) -> bool {
        while self.left.len() < self.window {
            let Some(point) = self.input.pop() else {
                return false;
            };
            self.left.push(point.x);
            self.right.push(point.y);
        }
        true
    }

    fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    fn publish(&self, left: f32, right: f32) {
        let Ok(listeners) = self.listeners.lock() else {
            warn!("listener registry poisoned, estimate dropped");
            return;
        };
        for listener in listeners.iter() {
            listener.update_frequency(left, right);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{f32::consts::TAU, time::Instant};

    use super::*;
    use crate::{
        analysis::{analysis_channel, FrequencyCell},
        geometry::Vector2,
    };

    #[test]
    fn test_window_len() {
        assert_eq!(window_len(48_000, 0.05), 4096);
        assert_eq!(window_len(44_100, 0.05), 4096);
        assert_eq!(window_len(8_000, 0.01), 256);
        assert_eq!(window_len(48_000, 0.0), 256);
        assert_eq!(window_len(48_000, 1.0e9), 1 << 20);
        assert_eq!(window_len(48_000, f32::INFINITY), 256);
        assert_eq!(window_len(48_000, f32::NAN), 256);
    }

    #[test]
    fn test_publishes_estimates_to_listeners() {
        let (mut tap, input) = analysis_channel(4096);
        let cell = Arc::new(FrequencyCell::default());
        let listeners: ListenerRegistry = Arc::new(Mutex::new(vec![cell.clone() as Arc<dyn FrequencyListener>]));
        let analyser = FrequencyAnalyser::spawn(input, 48_000, 1024, listeners).unwrap();

        for i in 0..2048 {
            let t = i as f32 / 48_000.0;
            tap.push(Vector2::new((TAU * 1500.0 * t).sin(), (TAU * 3000.0 * t).sin()));
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while cell.load().left == 0.0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        let estimate = cell.load();
        assert!((estimate.left - 1500.0).abs() < 20.0, "{estimate:?}");
        assert!((estimate.right - 3000.0).abs() < 20.0, "{estimate:?}");

        analyser.stop().unwrap();
    }

    #[test]
    fn test_overrun_window_is_dropped() {
        let (mut tap, input) = analysis_channel(256);
        let cell = Arc::new(FrequencyCell::default());
        let listeners: ListenerRegistry = Arc::new(Mutex::new(vec![cell.clone() as Arc<dyn FrequencyListener>]));

        // Overfill before the analyser runs: the first window is flagged
        for i in 0..300 {
            let t = i as f32 / 48_000.0;
            tap.push(Vector2::new((TAU * 1500.0 * t).sin(), 0.0));
        }
        let analyser = FrequencyAnalyser::spawn(input, 48_000, 256, listeners).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(cell.load().left, 0.0);

        analyser.stop().unwrap();
    }
}

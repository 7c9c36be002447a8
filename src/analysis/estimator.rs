use std::{f32::consts::PI, sync::Arc};

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Below this RMS a window counts as silence and reports 0 Hz.
const SILENCE_RMS: f32 = 1e-4;

/// Dominant-frequency estimator over a fixed window.
///
/// The window is mean-removed, Hann-weighted and transformed; the strongest
/// non-DC bin is refined with parabolic interpolation over the log magnitudes
/// of its neighbours.
pub struct PeakEstimator {
    sample_rate: f32,
    /// Hann window coefficients
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
}

impl PeakEstimator {
    pub fn new(len: usize, sample_rate: f32) -> Self {
        let len = len.max(4);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);

        let denom = (len - 1) as f32;
        let window = (0..len)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
            .collect();

        let fft_scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            sample_rate,
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); len],
            fft_scratch,
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Frequency resolution of one bin, Hz.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate / self.len() as f32
    }

    /// Estimate the dominant frequency of `samples`, in Hz.
    ///
    /// Returns 0 for silent windows and for windows whose length does not
    /// match the estimator.
    pub fn estimate(&mut self, samples: &[f32]) -> f32 {
        if samples.len() != self.len() {
            return 0.0;
        }

        let n = samples.len() as f32;
        let mean = samples.iter().sum::<f32>() / n;
        let energy = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>();
        if !energy.is_finite() || (energy / n).sqrt() < SILENCE_RMS {
            return 0.0;
        }

        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(samples).zip(&self.window) {
            *slot = Complex::new((sample - mean) * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.scratch, &mut self.fft_scratch);

        let half = self.len() / 2;
        let magnitude = |bin: &Complex<f32>| bin.norm_sqr().max(1e-20).ln();

        let Some((peak, _)) = self.scratch[1..half]
            .iter()
            .enumerate()
            .map(|(i, bin)| (i + 1, bin.norm_sqr()))
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            return 0.0;
        };

        let offset = if peak > 1 && peak + 1 < half {
            let a = magnitude(&self.scratch[peak - 1]);
            let b = magnitude(&self.scratch[peak]);
            let c = magnitude(&self.scratch[peak + 1]);
            let denom = a - 2.0 * b + c;
            if denom.abs() > f32::EPSILON {
                (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
            } else {
                0.0
            }
        } else {
            0.0
        };

        (peak as f32 + offset) * self.bin_width()
    }
}

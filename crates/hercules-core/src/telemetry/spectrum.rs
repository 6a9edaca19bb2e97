use crate::domain::{HerculesError, HerculesResult};
use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Centred frequency axis of a `window`-point spectrum:
/// `f_k = (k - window/2) * rate / window`.
pub fn frequency_axis(window: usize, sample_rate_hz: f64) -> Array1<f64> {
    let centre = (window / 2) as f64;
    let resolution = sample_rate_hz / window as f64;
    Array1::from_iter((0..window).map(|k| (k as f64 - centre) * resolution))
}

/// Non-overlapping windowed DFT with the zero-frequency bin centred.
pub struct WindowedDft {
    window: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for WindowedDft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedDft")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl WindowedDft {
    pub fn new(window: usize) -> HerculesResult<Self> {
        if window == 0 {
            return Err(HerculesError::invalid_argument(
                "TELEMETRY.WINDOW",
                "spectrum window must hold at least one sample",
            ));
        }
        let fft = FftPlanner::new().plan_fft_forward(window);
        Ok(Self { window, fft })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Full windows in a series; the remainder is dropped.
    pub fn slice_count(&self, series_len: usize) -> usize {
        series_len / self.window
    }

    /// Mean-subtracted, centred, `sqrt(1/window)`-scaled spectrum of one
    /// window of samples. `samples` must hold exactly `window` values.
    pub fn transform_window(&self, samples: &[Complex64]) -> HerculesResult<Vec<Complex64>> {
        if samples.len() != self.window {
            return Err(HerculesError::invalid_argument(
                "TELEMETRY.WINDOW_LENGTH",
                format!(
                    "expected {} samples for the spectrum window, got {}",
                    self.window,
                    samples.len()
                ),
            ));
        }
        Ok(self.transform_full_window(samples))
    }

    fn transform_full_window(&self, samples: &[Complex64]) -> Vec<Complex64> {
        let mean = samples.iter().sum::<Complex64>() / self.window as f64;
        let mut buffer: Vec<Complex64> = samples.iter().map(|sample| sample - mean).collect();
        self.fft.process(&mut buffer);
        buffer.rotate_right(self.window / 2);

        let scale = (1.0 / self.window as f64).sqrt();
        buffer.iter_mut().for_each(|bin| *bin *= scale);
        buffer
    }

    /// Spectra of every full window of `series`, shaped (slices, window).
    pub fn spectra(&self, series: ArrayView1<'_, Complex64>) -> Array2<Complex64> {
        let slices = self.slice_count(series.len());
        let mut output = Array2::zeros((slices, self.window));
        let samples: Vec<Complex64> = series.iter().copied().collect();
        for (slice, chunk) in samples.chunks_exact(self.window).enumerate() {
            let spectrum = self.transform_full_window(chunk);
            output.row_mut(slice).assign(&ArrayView1::from(&spectrum));
        }
        output
    }
}

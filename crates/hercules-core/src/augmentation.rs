//! Augmentations applied to quick-loaded (acquisition, channel, time) series.

use crate::domain::{HerculesError, HerculesResult};
use ndarray::Array3;
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

/// Boltzmann constant in J/K.
pub const BOLTZMANN: f64 = 1.380649e-23;

/// An in-place modification of a quick-loaded series.
pub trait Augmentation {
    fn apply(&self, data: &mut Array3<Complex64>) -> HerculesResult<()>;
}

impl<F> Augmentation for F
where
    F: Fn(&mut Array3<Complex64>) -> HerculesResult<()>,
{
    fn apply(&self, data: &mut Array3<Complex64>) -> HerculesResult<()> {
        self(data)
    }
}

/// Returns an augmented copy of `data`; the input is left untouched.
pub fn transform<A: Augmentation + ?Sized>(
    data: &Array3<Complex64>,
    augmentation: &A,
) -> HerculesResult<Array3<Complex64>> {
    let mut augmented = data.clone();
    augmentation.apply(&mut augmented)?;
    Ok(augmented)
}

/// Thermal noise of a resistor at `temperature_k` seen over `bandwidth_hz`.
///
/// Only the real part of each sample is perturbed unless
/// [`WhiteGaussianNoise::in_both_quadratures`] is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteGaussianNoise {
    pub temperature_k: f64,
    pub bandwidth_hz: f64,
    pub seed: u64,
    pub both_quadratures: bool,
}

impl WhiteGaussianNoise {
    pub fn new(temperature_k: f64, bandwidth_hz: f64, seed: u64) -> HerculesResult<Self> {
        for (name, value) in [("temperature", temperature_k), ("bandwidth", bandwidth_hz)] {
            if !value.is_finite() || value < 0.0 {
                return Err(HerculesError::invalid_argument(
                    "AUGMENT.NOISE_PARAMETER",
                    format!("noise {name} must be finite and non-negative, got {value}"),
                ));
            }
        }
        Ok(Self {
            temperature_k,
            bandwidth_hz,
            seed,
            both_quadratures: false,
        })
    }

    /// Adds independent noise to the imaginary part as well.
    pub fn in_both_quadratures(mut self) -> Self {
        self.both_quadratures = true;
        self
    }

    /// `sqrt(k_B * T * bandwidth)`, in volts.
    pub fn amplitude(&self) -> f64 {
        (BOLTZMANN * self.temperature_k * self.bandwidth_hz).sqrt()
    }
}

impl Augmentation for WhiteGaussianNoise {
    fn apply(&self, data: &mut Array3<Complex64>) -> HerculesResult<()> {
        let amplitude = self.amplitude();
        let normal = Normal::new(0.0, amplitude).map_err(|error| {
            HerculesError::invalid_argument(
                "AUGMENT.NOISE_PARAMETER",
                format!("noise amplitude {amplitude} is unusable: {error}"),
            )
        })?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        for sample in data.iter_mut() {
            sample.re += normal.sample(&mut rng);
            if self.both_quadratures {
                sample.im += normal.sample(&mut rng);
            }
        }
        debug!(
            amplitude,
            samples = data.len(),
            both_quadratures = self.both_quadratures,
            "white gaussian noise added"
        );
        Ok(())
    }
}

/// Adds real-valued noise of amplitude `sqrt(k_B * T * bandwidth)` to every
/// sample, uncorrelated over time and channels.
pub fn white_gaussian_noise(
    data: &Array3<Complex64>,
    temperature_k: f64,
    bandwidth_hz: f64,
    seed: u64,
) -> HerculesResult<Array3<Complex64>> {
    transform(data, &WhiteGaussianNoise::new(temperature_k, bandwidth_hz, seed)?)
}

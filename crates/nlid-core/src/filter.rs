//! Butterworth bandpass filtering
//!
//! Isolates one frequency band from a raw channel. The design follows the
//! classic analog-prototype route: Butterworth lowpass poles, lowpass to
//! bandpass transform, pre-warped bilinear transform, then a cascade of
//! second-order sections. An order-`N` design yields `N` sections (`2N`
//! poles), unity gain at the band centre.

use core::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Band;

/// Highest supported prototype order
pub const MAX_FILTER_ORDER: usize = 12;

/// Imaginary part below which a prototype pole is treated as real
const REAL_POLE_TOLERANCE: f64 = 1e-12;

// ============================================================================
// Second-Order Sections
// ============================================================================

/// Biquad coefficients (second-order section)
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BiquadCoeffs {
    /// Numerator coefficients [b0, b1, b2]
    pub b: [f64; 3],
    /// Denominator coefficients [a0=1, a1, a2]
    pub a: [f64; 3],
}

impl BiquadCoeffs {
    /// Section with poles `p1`, `p2` and zeros at z = +1 and z = -1.
    fn bandpass_section(p1: Complex64, p2: Complex64) -> Self {
        Self {
            b: [1.0, 0.0, -1.0],
            a: [1.0, -(p1 + p2).re, (p1 * p2).re],
        }
    }

    /// Complex response at normalised angular frequency `omega` (rad/sample)
    fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = z2 * self.b[2] + z1 * self.b[1] + self.b[0];
        let den = z2 * self.a[2] + z1 * self.a[1] + self.a[0];
        num / den
    }

    /// Both poles strictly inside the unit circle
    fn is_stable(&self) -> bool {
        let (a1, a2) = (self.a[1], self.a[2]);
        a2.abs() < 1.0 && a1.abs() < 1.0 + a2
    }
}

/// Second-order section with direct form II transposed state
#[derive(Clone, Debug)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    /// State: [z1, z2]
    state: [f64; 2],
}

impl Biquad {
    /// Create a section with zero initial state
    #[must_use]
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, state: [0.0, 0.0] }
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let BiquadCoeffs { b, a } = self.coeffs;
        let output = b[0] * input + self.state[0];
        self.state[0] = b[1] * input - a[1] * output + self.state[1];
        self.state[1] = b[2] * input - a[2] * output;
        output
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.state = [0.0, 0.0];
    }
}

// ============================================================================
// Band Filter
// ============================================================================

/// How the filter is run over a signal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Single forward pass from zero state
    #[default]
    Causal,
    /// Forward then backward pass; squared magnitude, zero phase
    ZeroPhase,
}

/// Butterworth bandpass as a cascade of biquads.
#[derive(Clone, Debug)]
pub struct BandFilter {
    sections: Vec<BiquadCoeffs>,
    sample_rate_hz: f64,
    mode: FilterMode,
}

impl BandFilter {
    /// Design a Butterworth bandpass for `band`.
    ///
    /// # Arguments
    ///
    /// * `sample_rate_hz` - Sample rate in Hz
    /// * `band` - Pass band; must lie strictly inside (0, Nyquist)
    /// * `order` - Prototype order (4 gives an 8-pole bandpass)
    /// * `mode` - Causal or zero-phase application
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSampleRate`], [`ConfigError::InvalidFilterOrder`]
    /// or [`ConfigError::InvalidBand`].
    pub fn design(
        sample_rate_hz: f64,
        band: &Band,
        order: usize,
        mode: FilterMode,
    ) -> Result<Self, ConfigError> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSampleRate { sample_rate_hz });
        }
        if order == 0 || order > MAX_FILTER_ORDER {
            return Err(ConfigError::InvalidFilterOrder { order, max: MAX_FILTER_ORDER });
        }
        band.validate(sample_rate_hz)?;

        // Pre-warped analog band edges (rad/s)
        let fs2 = 2.0 * sample_rate_hz;
        let w_low = fs2 * (PI * band.low_hz / sample_rate_hz).tan();
        let w_high = fs2 * (PI * band.high_hz / sample_rate_hz).tan();
        let bandwidth = w_high - w_low;
        let center_sq = w_low * w_high;

        let bilinear = |s: Complex64| (s + fs2) / (-s + fs2);

        let mut sections = Vec::with_capacity(order);
        for k in 0..order {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let pole = Complex64::from_polar(1.0, theta);
            if pole.im < -REAL_POLE_TOLERANCE {
                // Conjugate of an upper-half pole already handled
                continue;
            }

            let shifted = pole * (bandwidth / 2.0);
            let disc = (shifted * shifted - center_sq).sqrt();
            let p1 = bilinear(shifted + disc);
            let p2 = bilinear(shifted - disc);

            if pole.im > REAL_POLE_TOLERANCE {
                sections.push(BiquadCoeffs::bandpass_section(p1, p1.conj()));
                sections.push(BiquadCoeffs::bandpass_section(p2, p2.conj()));
            } else {
                sections.push(BiquadCoeffs::bandpass_section(p1, p2));
            }
        }

        // Unity gain at the warped centre, spread evenly across sections
        let omega_center = 2.0 * (center_sq.sqrt() / fs2).atan();
        let magnitude: f64 = sections.iter().map(|s| s.response(omega_center).norm()).product();
        let per_section = magnitude.recip().powf(1.0 / sections.len() as f64);
        for section in &mut sections {
            for b in &mut section.b {
                *b *= per_section;
            }
        }

        Ok(Self { sections, sample_rate_hz, mode })
    }

    /// Filter a whole signal, returning a new buffer of the same length.
    #[must_use]
    pub fn apply(&self, samples: &[f64]) -> Vec<f64> {
        let mut out = samples.to_vec();
        self.forward(&mut out);
        if self.mode == FilterMode::ZeroPhase {
            out.reverse();
            self.forward(&mut out);
            out.reverse();
        }
        out
    }

    /// Run the cascade in place from zero state
    fn forward(&self, buffer: &mut [f64]) {
        for coeffs in &self.sections {
            let mut section = Biquad::new(*coeffs);
            for x in buffer.iter_mut() {
                *x = section.process(*x);
            }
        }
    }

    /// Magnitude response of one forward pass at `freq_hz`
    #[must_use]
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / self.sample_rate_hz;
        self.sections.iter().map(|s| s.response(omega).norm()).product()
    }

    /// Whether every section is stable
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(BiquadCoeffs::is_stable)
    }

    /// Second-order sections
    #[must_use]
    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.sections
    }

    /// Application mode
    #[must_use]
    pub fn mode(&self) -> FilterMode {
        self.mode
    }
}

/// Design a filter for `band` and apply it to `samples` in one step.
///
/// # Errors
///
/// See [`BandFilter::design`].
pub fn bandpass(
    samples: &[f64],
    sample_rate_hz: f64,
    band: &Band,
    order: usize,
    mode: FilterMode,
) -> Result<Vec<f64>, ConfigError> {
    Ok(BandFilter::design(sample_rate_hz, band, order, mode)?.apply(samples))
}

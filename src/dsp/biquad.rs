//! Biquad Filter Implementation (IIR 2nd Order)
//!
//! Second-order sections used by both coloration stages: the tube stage's band
//! split and DC blocker, and the transformer stage's shelving EQ.
//!
//! # Design Notes
//! - Coefficients are plain values produced by pure design functions (RBJ
//!   cookbook, derived in f64). Changing a parameter means deriving a new
//!   [`BiquadCoeffs`] and handing it to the filter; there is no hidden caching.
//! - Coefficient swaps keep the delay state so automation does not click.
//! - All processing is allocation-free and safe for the audio thread.

use std::f64::consts::PI;

/// Butterworth Q for the 2nd-order band-split and DC-blocking filters.
pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Normalised biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Pass-through section.
    pub const fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv_a0 = 1.0 / a0;
        Self {
            b0: (b0 * inv_a0) as f32,
            b1: (b1 * inv_a0) as f32,
            b2: (b2 * inv_a0) as f32,
            a1: (a1 * inv_a0) as f32,
            a2: (a2 * inv_a0) as f32,
        }
    }

    #[inline]
    fn omega(sample_rate: f64, cutoff: f64) -> (f64, f64) {
        // Keep the cutoff strictly below Nyquist so low sample rates stay stable.
        let fc = cutoff.clamp(1.0e-3, sample_rate * 0.499);
        let w0 = 2.0 * PI * fc / sample_rate;
        (w0.sin(), w0.cos())
    }

    pub fn highpass(sample_rate: f64, cutoff: f64, q: f64) -> Self {
        let (sw0, cw0) = Self::omega(sample_rate, cutoff);
        let alpha = sw0 / (2.0 * q.max(1e-6));

        Self::normalized(
            (1.0 + cw0) * 0.5,
            -(1.0 + cw0),
            (1.0 + cw0) * 0.5,
            1.0 + alpha,
            -2.0 * cw0,
            1.0 - alpha,
        )
    }

    pub fn lowpass(sample_rate: f64, cutoff: f64, q: f64) -> Self {
        let (sw0, cw0) = Self::omega(sample_rate, cutoff);
        let alpha = sw0 / (2.0 * q.max(1e-6));

        Self::normalized(
            (1.0 - cw0) * 0.5,
            1.0 - cw0,
            (1.0 - cw0) * 0.5,
            1.0 + alpha,
            -2.0 * cw0,
            1.0 - alpha,
        )
    }

    pub fn low_shelf(sample_rate: f64, cutoff: f64, q: f64, gain_db: f64) -> Self {
        // Flat shelf. Any non-zero gain gets a real section.
        if gain_db == 0.0 {
            return Self::identity();
        }

        let a = 10.0_f64.powf(gain_db / 40.0);
        let (sw0, cw0) = Self::omega(sample_rate, cutoff);
        let beta = sw0 * a.sqrt() / q.max(1e-6);

        Self::normalized(
            a * ((a + 1.0) - (a - 1.0) * cw0 + beta),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cw0),
            a * ((a + 1.0) - (a - 1.0) * cw0 - beta),
            (a + 1.0) + (a - 1.0) * cw0 + beta,
            -2.0 * ((a - 1.0) + (a + 1.0) * cw0),
            (a + 1.0) + (a - 1.0) * cw0 - beta,
        )
    }

    pub fn high_shelf(sample_rate: f64, cutoff: f64, q: f64, gain_db: f64) -> Self {
        if gain_db == 0.0 {
            return Self::identity();
        }

        let a = 10.0_f64.powf(gain_db / 40.0);
        let (sw0, cw0) = Self::omega(sample_rate, cutoff);
        let beta = sw0 * a.sqrt() / q.max(1e-6);

        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * cw0 + beta),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cw0),
            a * ((a + 1.0) + (a - 1.0) * cw0 - beta),
            (a + 1.0) - (a - 1.0) * cw0 + beta,
            2.0 * ((a - 1.0) - (a + 1.0) * cw0),
            (a + 1.0) - (a - 1.0) * cw0 - beta,
        )
    }

    /// Magnitude response at DC.
    pub fn dc_gain(&self) -> f32 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Magnitude response at Nyquist.
    pub fn nyquist_gain(&self) -> f32 {
        ((self.b0 - self.b1 + self.b2) / (1.0 - self.a1 + self.a2)).abs()
    }
}

/// One channel of a biquad (transposed direct form II).
#[derive(Debug, Clone, Copy, Default)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Swap coefficients, keeping the delay state.
    #[inline]
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let out = input * c.b0 + self.z1;

        // Anti-denormal: tiny DC offset
        self.z1 = input * c.b1 + self.z2 - c.a1 * out + 1e-25;
        self.z2 = input * c.b2 - c.a2 * out + 1e-25;

        out
    }

    /// Clear delay state. Coefficient updates never do this implicitly.
    #[inline]
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// A stereo pair sharing one coefficient set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StereoBiquad {
    channels: [Biquad; 2],
}

impl StereoBiquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            channels: [Biquad::new(coeffs); 2],
        }
    }

    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        for ch in &mut self.channels {
            ch.set_coeffs(coeffs);
        }
    }

    #[inline]
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        self.channels[channel].process(input)
    }

    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.reset();
        }
    }
}

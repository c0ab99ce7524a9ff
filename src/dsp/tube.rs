//! Tube Saturation (Pre-Compression Coloration)
//!
//! # Perceptual Contract
//! - **Intended Effect**: Warm, even-harmonic "tube" thickening of the low and
//!   low-mid range, applied before the compressor so the detector reacts to it.
//! - **Will Not Do**:
//!   - Saturate the highs (they pass through the clean band, slightly attenuated).
//!   - Leave a DC offset behind (a 5 Hz blocker follows the recombination).
//!
//! # Signal Flow
//! ```text
//! in ──┬─ LP 800 Hz ── shape ──┐
//!      └─ HP 600 Hz ── ×(1 − 0.3·drive) ──┴─ + ── HP 5 Hz ── out
//! ```
//!
//! The shaper constants are tuned by ear and are kept as literals below.

use crate::dsp::biquad::{BiquadCoeffs, StereoBiquad, BUTTERWORTH_Q};
use crate::dsp::utils::{soft_saturate, BYPASS_EPS};

const LOW_BAND_HZ: f64 = 800.0;
const HIGH_BAND_HZ: f64 = 600.0;
const DC_BLOCK_HZ: f64 = 5.0;

// Input gain into the shaper: up to 2.5x at full drive.
const DRIVE_GAIN: f32 = 1.5;
const TANH_SCALE: f32 = 0.8;
// Negative half-wave squash (even harmonics).
const ASYMMETRY: f32 = 0.08;
// x·|x| second-harmonic-like term.
const HARMONIC: f32 = 0.15;
const SOFT_SAT_BASE: f32 = 0.3;
const SOFT_SAT_DRIVE: f32 = 0.5;
const MAKEUP: f32 = 0.85;
const MAKEUP_DRIVE: f32 = 0.3;
// High band attenuation at full drive.
const HIGH_BAND_CUT: f32 = 0.3;

/// Fixed filter set of the tube stage. Depends on the sample rate only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TubeCoeffs {
    pub low_band: BiquadCoeffs,
    pub high_band: BiquadCoeffs,
    pub dc_block: BiquadCoeffs,
}

impl TubeCoeffs {
    pub fn derive(sample_rate: f64) -> Self {
        Self {
            low_band: BiquadCoeffs::lowpass(sample_rate, LOW_BAND_HZ, BUTTERWORTH_Q),
            high_band: BiquadCoeffs::highpass(sample_rate, HIGH_BAND_HZ, BUTTERWORTH_Q),
            dc_block: BiquadCoeffs::highpass(sample_rate, DC_BLOCK_HZ, BUTTERWORTH_Q),
        }
    }
}

pub struct TubeSaturation {
    drive: f32,
    low_band: StereoBiquad,
    high_band: StereoBiquad,
    dc_block: StereoBiquad,
    // Filter history is stale after a bypassed stretch.
    needs_flush: bool,
}

impl Default for TubeSaturation {
    fn default() -> Self {
        Self::new()
    }
}

impl TubeSaturation {
    pub fn new() -> Self {
        Self {
            drive: 0.0,
            low_band: StereoBiquad::default(),
            high_band: StereoBiquad::default(),
            dc_block: StereoBiquad::default(),
            needs_flush: false,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        let c = TubeCoeffs::derive(sample_rate);
        self.low_band.set_coeffs(c.low_band);
        self.high_band.set_coeffs(c.high_band);
        self.dc_block.set_coeffs(c.dc_block);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.low_band.reset();
        self.high_band.reset();
        self.dc_block.reset();
        self.needs_flush = false;
    }

    /// Drive in 0..1.
    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(0.0, 1.0);
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.drive < BYPASS_EPS
    }

    /// Waveshaper applied to the low band.
    #[inline]
    pub fn shape(&self, input: f32) -> f32 {
        let drive = self.drive;
        if drive < BYPASS_EPS {
            return input;
        }

        let x = input * (1.0 + drive * DRIVE_GAIN);
        let mut out = (x * TANH_SCALE).tanh();
        if x < 0.0 {
            out += x * x.abs() * ASYMMETRY * drive;
        }
        out += input * input.abs() * HARMONIC * drive;

        out = soft_saturate(out, SOFT_SAT_BASE + drive * SOFT_SAT_DRIVE);
        out *= MAKEUP / (1.0 + drive * MAKEUP_DRIVE);

        input * (1.0 - drive) + out * drive
    }

    /// Process up to two channels in place. Identity while bypassed.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        if self.is_bypassed() {
            self.needs_flush = true;
            return;
        }
        if self.needs_flush {
            self.reset();
        }

        let high_gain = 1.0 - self.drive * HIGH_BAND_CUT;

        for (ch, data) in channels.iter_mut().take(2).enumerate() {
            for sample in data.iter_mut() {
                let x = *sample;
                let low = self.low_band.process(ch, x);
                let low = self.shape(low);
                let high = self.high_band.process(ch, x);
                *sample = self.dc_block.process(ch, low + high * high_gain);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::test_signals::{harmonic_magnitudes, sine};

    const SR: f64 = 48000.0;

    fn tube(drive: f32) -> TubeSaturation {
        let mut t = TubeSaturation::new();
        t.prepare(SR, 512);
        t.set_drive(drive);
        t
    }

    #[test]
    fn zero_drive_is_identity() {
        let mut t = tube(0.0);
        let input = sine(440.0, 0.8, SR, 1024);
        let mut l = input.clone();
        let mut r = input.clone();
        t.process_block(&mut [&mut l, &mut r]);
        assert_eq!(l, input);
        assert_eq!(r, input);
    }

    #[test]
    fn drive_is_clamped() {
        let mut t = tube(2.0);
        assert_eq!(t.drive(), 1.0);
        t.set_drive(-1.0);
        assert!(t.is_bypassed());
    }

    #[test]
    fn full_drive_stays_bounded() {
        for &freq in &[50.0, 200.0, 1000.0, 5000.0] {
            let mut t = tube(1.0);
            let mut l = sine(freq, 1.0, SR, 9600);
            let mut r = l.clone();
            t.process_block(&mut [&mut l, &mut r]);
            for &y in l.iter().chain(r.iter()) {
                assert!(y.is_finite());
                assert!(y.abs() < 2.0, "{freq} Hz produced {y}");
            }
        }
    }

    #[test]
    fn shaper_is_asymmetric() {
        let t = tube(1.0);
        assert!(t.shape(-0.5).abs() != t.shape(0.5).abs());
    }

    #[test]
    fn adds_even_harmonics() {
        let mut t = tube(1.0);
        let n = 4800;
        let mut l = sine(100.0, 0.5, SR, 48_000 + n);
        t.process_block(&mut [&mut l]);

        // 10 Hz bins: fundamental at 10, second harmonic at 20
        let mags = harmonic_magnitudes(&l[48_000..], &[10, 20]);
        assert!(mags[1] > mags[0] * 1e-3, "2nd harmonic {} vs {}", mags[1], mags[0]);
    }

    #[test]
    fn reenabling_after_bypass_starts_clean() {
        let mut t = tube(0.5);
        let mut l = sine(100.0, 0.9, SR, 512);
        t.process_block(&mut [&mut l]);

        t.set_drive(0.0);
        let mut l = sine(100.0, 0.9, SR, 512);
        t.process_block(&mut [&mut l]);

        t.set_drive(0.5);
        let mut silence = vec![0.0f32; 64];
        t.process_block(&mut [&mut silence]);
        assert!(silence.iter().all(|v| v.abs() < 1e-12));
    }
}

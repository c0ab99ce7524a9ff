//! Hybrid RMS + Peak Sidechain Detector
//!
//! # Perceptual Contract
//! - **Intended Effect**: Smooth, program-dependent level estimate with enough
//!   transient awareness to keep the optical release from pumping.
//! - **Will Not Do**:
//!   - Stereo unlinking (left and right are folded to mono before detection).
//!   - Frequency weighting of the sidechain.
//!
//! # Detection
//! - **RMS**: exact sliding mean-square over a ~10 ms window.
//! - **Peak**: asymmetric one-pole (0.1 ms attack, 50 ms release toward zero).
//! - **Blend**: 70% RMS + 30% peak, converted to dB with a −60 dB floor.

use crate::dsp::utils::{lin_to_db, one_pole_coeff};

// RMS integration window (s).
// Increasing: smoother detector; decreasing: faster, more ripple.
const RMS_WINDOW_SEC: f64 = 0.01;
// Peak envelope attack (s).
const PEAK_ATTACK_SEC: f64 = 0.0001;
// Peak envelope release (s).
const PEAK_RELEASE_SEC: f64 = 0.05;
// Default hybrid blend (RMS share). Peak share is the complement.
const DEFAULT_RMS_WEIGHT: f32 = 0.7;

/// Fixed-size window of squared samples with an incrementally maintained sum.
///
/// The backing storage is allocated once in [`RmsWindow::with_len`] and never
/// resized; writes go through a wrapping cursor.
#[derive(Debug, Clone)]
pub struct RmsWindow {
    buf: Box<[f32]>,
    idx: usize,
    // f64 keeps subtract/add drift far below one f32 ulp of the window mean.
    sum: f64,
}

impl RmsWindow {
    pub fn with_len(len: usize) -> Self {
        let len = len.max(1);
        Self {
            buf: vec![0.0; len].into_boxed_slice(),
            idx: 0,
            sum: 0.0,
        }
    }

    /// Push one squared sample, evicting the oldest. Returns the window RMS.
    #[inline]
    pub fn push(&mut self, squared: f32) -> f32 {
        let slot = &mut self.buf[self.idx];
        self.sum += f64::from(squared) - f64::from(*slot);
        *slot = squared;

        self.idx += 1;
        if self.idx == self.buf.len() {
            self.idx = 0;
        }

        (self.sum.max(0.0) / self.buf.len() as f64).sqrt() as f32
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn clear(&mut self) {
        self.buf.fill(0.0);
        self.idx = 0;
        self.sum = 0.0;
    }

    #[cfg(test)]
    fn recomputed_sum(&self) -> f64 {
        self.buf.iter().map(|&v| f64::from(v)).sum()
    }
}

/// Stereo-to-mono hybrid level detector.
#[derive(Debug, Clone)]
pub struct SidechainDetector {
    window: RmsWindow,
    peak_attack_coeff: f32,
    peak_release_coeff: f32,
    peak_env: f32,
    rms_weight: f32,
    peak_weight: f32,
}

impl Default for SidechainDetector {
    fn default() -> Self {
        Self {
            window: RmsWindow::with_len(1),
            peak_attack_coeff: 0.0,
            peak_release_coeff: 0.0,
            peak_env: 0.0,
            rms_weight: DEFAULT_RMS_WEIGHT,
            peak_weight: 1.0 - DEFAULT_RMS_WEIGHT,
        }
    }
}

impl SidechainDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the RMS window for `sample_rate` and clear all state.
    pub fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        let window_len = (sample_rate * RMS_WINDOW_SEC) as usize;
        self.window = RmsWindow::with_len(window_len);

        self.peak_attack_coeff = one_pole_coeff(PEAK_ATTACK_SEC, sample_rate);
        self.peak_release_coeff = one_pole_coeff(PEAK_RELEASE_SEC, sample_rate);
        self.peak_env = 0.0;
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.peak_env = 0.0;
    }

    /// Set the RMS share of the hybrid blend (clamped to 0..1).
    pub fn set_blend(&mut self, rms_weight: f32) {
        self.rms_weight = rms_weight.clamp(0.0, 1.0);
        self.peak_weight = 1.0 - self.rms_weight;
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Consume one stereo sample pair and return the detection level in dB.
    #[inline]
    pub fn process_sample(&mut self, input_l: f32, input_r: f32) -> f32 {
        let mono = (input_l + input_r) * 0.5;
        let mono_abs = mono.abs();

        let rms = self.window.push(mono * mono);

        self.peak_env = if mono_abs > self.peak_env {
            self.peak_attack_coeff * self.peak_env + (1.0 - self.peak_attack_coeff) * mono_abs
        } else {
            self.peak_release_coeff * self.peak_env
        };

        let hybrid = rms * self.rms_weight + self.peak_env * self.peak_weight;
        lin_to_db(hybrid)
    }
}

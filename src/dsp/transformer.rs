//! Transformer Coloration (Post-Compression)
//!
//! # Perceptual Contract
//! - **Intended Effect**: Odd-harmonic "iron" density with a gentle bass lift
//!   and a touch of high-frequency rounding, applied to the compressed signal.
//! - **Will Not Do**:
//!   - Exceed 50% wet blend of the saturated signal.
//!   - Add even harmonics (the shaper is odd-symmetric).
//!
//! # Shelves
//! - Low shelf at 120 Hz, Q 0.5, up to +3 dB.
//! - High shelf at 8 kHz, Q 0.5, down to −1.5 dB.
//! - Both scale linearly with the amount and stay real sections down to the
//!   bypass threshold, however small the resulting gain.

use crate::dsp::biquad::{BiquadCoeffs, StereoBiquad};
use crate::dsp::utils::{soft_saturate, BYPASS_EPS};

const LOW_SHELF_HZ: f64 = 120.0;
const HIGH_SHELF_HZ: f64 = 8000.0;
const SHELF_Q: f64 = 0.5;
const LOW_SHELF_MAX_DB: f64 = 3.0;
const HIGH_SHELF_MAX_DB: f64 = -1.5;

const SAT_KNEE_BASE: f32 = 0.2;
const SAT_KNEE_AMOUNT: f32 = 0.4;
const INPUT_GAIN: f32 = 0.5;
const THIRD_HARMONIC: f32 = 0.1;
const THIRD_HARMONIC_KNEE: f32 = 0.5;
const MAKEUP: f32 = 0.95;
const MAKEUP_AMOUNT: f32 = 0.2;
const MAX_WET: f32 = 0.5;

/// Shelf pair for a given color amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformerCoeffs {
    pub low_shelf: BiquadCoeffs,
    pub high_shelf: BiquadCoeffs,
}

impl TransformerCoeffs {
    pub fn derive(amount: f32, sample_rate: f64) -> Self {
        let amount = f64::from(amount);
        Self {
            low_shelf: BiquadCoeffs::low_shelf(
                sample_rate,
                LOW_SHELF_HZ,
                SHELF_Q,
                amount * LOW_SHELF_MAX_DB,
            ),
            high_shelf: BiquadCoeffs::high_shelf(
                sample_rate,
                HIGH_SHELF_HZ,
                SHELF_Q,
                amount * HIGH_SHELF_MAX_DB,
            ),
        }
    }
}

pub struct TransformerColoration {
    sample_rate: f64,
    amount: f32,
    low_shelf: StereoBiquad,
    high_shelf: StereoBiquad,
    needs_flush: bool,
}

impl Default for TransformerColoration {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformerColoration {
    pub fn new() -> Self {
        Self {
            sample_rate: 44100.0,
            amount: 0.0,
            low_shelf: StereoBiquad::default(),
            high_shelf: StereoBiquad::default(),
            needs_flush: false,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_shelves();
        self.reset();
    }

    pub fn reset(&mut self) {
        self.low_shelf.reset();
        self.high_shelf.reset();
        self.needs_flush = false;
    }

    /// Color amount in 0..1. Re-derives the shelves when the value moves.
    pub fn set_amount(&mut self, amount: f32) {
        let amount = amount.clamp(0.0, 1.0);
        if amount != self.amount {
            self.amount = amount;
            self.update_shelves();
        }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.amount < BYPASS_EPS
    }

    fn update_shelves(&mut self) {
        let c = TransformerCoeffs::derive(self.amount, self.sample_rate);
        self.low_shelf.set_coeffs(c.low_shelf);
        self.high_shelf.set_coeffs(c.high_shelf);
    }

    /// Odd-symmetric saturator with a capped wet blend.
    #[inline]
    pub fn shape(&self, input: f32) -> f32 {
        let amount = self.amount;
        if amount < BYPASS_EPS {
            return input;
        }

        let knee = SAT_KNEE_BASE + amount * SAT_KNEE_AMOUNT;
        let mut sat = soft_saturate(input * (1.0 + amount * INPUT_GAIN), knee);
        sat += soft_saturate(
            input * input * input * THIRD_HARMONIC * amount,
            THIRD_HARMONIC_KNEE,
        );
        sat *= MAKEUP / (1.0 + amount * MAKEUP_AMOUNT);

        let wet = amount * MAX_WET;
        input * (1.0 - wet) + sat * wet
    }

    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        if self.is_bypassed() {
            self.needs_flush = true;
            return;
        }
        if self.needs_flush {
            self.reset();
        }

        for (ch, data) in channels.iter_mut().take(2).enumerate() {
            for sample in data.iter_mut() {
                let shaped = self.shape(*sample);
                let low = self.low_shelf.process(ch, shaped);
                *sample = self.high_shelf.process(ch, low);
            }
        }
    }
}

//! Optical Envelope Follower (Two-Stage Release)
//!
//! Smooths the sidechain detection level with the program-dependent release
//! of an optical cell: a fast first stage that catches transient recovery,
//! then a slow tail once the envelope has fallen below half of its last peak.
//!
//! # Time Constants
//! - **Attack**: user attack time, 0.1 to 100 ms.
//! - **Fast release**: 30% of the user release time.
//! - **Slow release**: 150% of the user release time.
//! - **Crossover**: envelope below 50% of the peak recorded during attack.
//!
//! These ratios define the audible character and must not change.
//!
//! # Design Notes
//! - Envelope runs in the linear domain; input and output are dB with a −60 dB floor.
//! - **No Allocations**: stack-only state, deterministic per sample.

use crate::dsp::utils::{db_to_lin, lin_to_db, one_pole_coeff};

/// Attack range (ms).
pub const ATTACK_MIN_MS: f32 = 0.1;
pub const ATTACK_MAX_MS: f32 = 100.0;
/// Release range (ms).
pub const RELEASE_MIN_MS: f32 = 10.0;
pub const RELEASE_MAX_MS: f32 = 1000.0;

// Must not change: fast stage is 30% of the release time.
const FAST_RELEASE_RATIO: f64 = 0.3;
// Must not change: slow stage is 150% of the release time.
const SLOW_RELEASE_RATIO: f64 = 1.5;
// Must not change: slow stage engages below 50% of the recorded peak.
const RELEASE_STAGE_THRESHOLD: f32 = 0.5;

const DEFAULT_ATTACK_MS: f32 = 10.0;
const DEFAULT_RELEASE_MS: f32 = 100.0;
const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Coefficient set derived from attack/release times and the sample rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticsCoeffs {
    pub attack: f32,
    pub release_fast: f32,
    pub release_slow: f32,
}

impl BallisticsCoeffs {
    pub fn derive(attack_ms: f32, release_ms: f32, sample_rate: f64) -> Self {
        let attack_sec = f64::from(attack_ms) / 1000.0;
        let release_sec = f64::from(release_ms) / 1000.0;

        Self {
            attack: one_pole_coeff(attack_sec, sample_rate),
            release_fast: one_pole_coeff(release_sec * FAST_RELEASE_RATIO, sample_rate),
            release_slow: one_pole_coeff(release_sec * SLOW_RELEASE_RATIO, sample_rate),
        }
    }
}

/// Which release stage the follower is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    Fast,
    Slow,
}

pub struct EnvelopeFollower {
    sample_rate: f64,
    attack_ms: f32,
    release_ms: f32,
    coeffs: BallisticsCoeffs,

    // State
    envelope: f32,
    peak_reference: f32,
    stage: ReleaseStage,
}

impl Default for EnvelopeFollower {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            attack_ms: DEFAULT_ATTACK_MS,
            release_ms: DEFAULT_RELEASE_MS,
            coeffs: BallisticsCoeffs::derive(
                DEFAULT_ATTACK_MS,
                DEFAULT_RELEASE_MS,
                DEFAULT_SAMPLE_RATE,
            ),
            envelope: 0.0,
            peak_reference: 0.0,
            stage: ReleaseStage::Fast,
        }
    }
}

impl EnvelopeFollower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
        self.reset();
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.peak_reference = 0.0;
        self.stage = ReleaseStage::Fast;
    }

    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.clamp(ATTACK_MIN_MS, ATTACK_MAX_MS);
        self.update_coefficients();
    }

    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.clamp(RELEASE_MIN_MS, RELEASE_MAX_MS);
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        if self.sample_rate <= 0.0 {
            return;
        }
        self.coeffs = BallisticsCoeffs::derive(self.attack_ms, self.release_ms, self.sample_rate);
    }

    /// Process one detection level (dB) and return the smoothed envelope (dB).
    #[inline]
    pub fn process_sample(&mut self, detection_db: f32) -> f32 {
        let detection = db_to_lin(detection_db);

        if detection > self.envelope {
            let a = self.coeffs.attack;
            self.envelope = a * self.envelope + (1.0 - a) * detection;
            self.peak_reference = self.envelope;
            self.stage = ReleaseStage::Fast;
        } else {
            if self.stage == ReleaseStage::Fast
                && self.envelope < self.peak_reference * RELEASE_STAGE_THRESHOLD
            {
                self.stage = ReleaseStage::Slow;
            }

            let r = match self.stage {
                ReleaseStage::Fast => self.coeffs.release_fast,
                ReleaseStage::Slow => self.coeffs.release_slow,
            };
            self.envelope = r * self.envelope + (1.0 - r) * detection;
        }

        lin_to_db(self.envelope)
    }

    pub fn current_db(&self) -> f32 {
        lin_to_db(self.envelope)
    }

    pub fn stage(&self) -> ReleaseStage {
        self.stage
    }

    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::utils::DB_FLOOR;

    const SR: f64 = 48000.0;

    fn follower(attack_ms: f32, release_ms: f32) -> EnvelopeFollower {
        let mut f = EnvelopeFollower::new();
        f.prepare(SR, 512);
        f.set_attack_ms(attack_ms);
        f.set_release_ms(release_ms);
        f
    }

    #[test]
    fn setters_clamp() {
        let mut f = follower(10.0, 100.0);
        f.set_attack_ms(0.0);
        assert_eq!(f.attack_ms(), ATTACK_MIN_MS);
        f.set_attack_ms(500.0);
        assert_eq!(f.attack_ms(), ATTACK_MAX_MS);
        f.set_release_ms(1.0);
        assert_eq!(f.release_ms(), RELEASE_MIN_MS);
        f.set_release_ms(5000.0);
        assert_eq!(f.release_ms(), RELEASE_MAX_MS);
    }

    #[test]
    fn release_stages_keep_their_ratios() {
        let c = BallisticsCoeffs::derive(10.0, 100.0, SR);
        assert_eq!(c.release_fast, one_pole_coeff(0.03, SR));
        assert_eq!(c.release_slow, one_pole_coeff(0.15, SR));
        assert!(c.release_fast < c.release_slow);
    }

    #[test]
    fn attack_rises_monotonically_without_overshoot() {
        let mut f = follower(10.0, 100.0);
        let target_db = -10.0;
        let mut prev = f.process_sample(DB_FLOOR);
        assert_eq!(prev, DB_FLOOR);

        for _ in 0..48_000 {
            let env = f.process_sample(target_db);
            // One-ulp dither once the envelope has reached the target
            assert!(env >= prev - 1e-5, "envelope fell during attack");
            assert!(env <= target_db + 1e-4, "envelope overshot: {env}");
            prev = env;
        }
        assert!((prev - target_db).abs() < 0.01);
        assert_eq!(f.stage(), ReleaseStage::Fast);
    }

    #[test]
    fn release_switches_to_slow_at_half_peak() {
        let mut f = follower(1.0, 100.0);
        for _ in 0..48_000 {
            f.process_sample(-6.0);
        }
        let peak = f.peak_reference;
        assert!(peak > 0.0);

        let mut prev_env = f.envelope;
        let mut switched_at = None;
        for n in 0..48_000 {
            let before = f.envelope;
            let out = f.process_sample(DB_FLOOR);
            let after = f.envelope;

            // Monotonic fall toward silence
            assert!(after <= prev_env, "envelope rose during release at {n}");
            prev_env = after;

            let expected_slow = before < peak * 0.5;
            assert_eq!(
                f.stage() == ReleaseStage::Slow,
                expected_slow,
                "stage mismatch at sample {n}"
            );

            let ratio = after / before;
            let coeff = if expected_slow {
                f.coeffs.release_slow
            } else {
                f.coeffs.release_fast
            };
            if before > 1e-6 {
                assert!((ratio - coeff).abs() < 1e-5, "wrong release coefficient at {n}");
            }
            if expected_slow && switched_at.is_none() {
                switched_at = Some(n);
            }
            assert!(out <= -6.0 + 1e-4);
        }
        assert!(switched_at.is_some());
    }

    #[test]
    fn reattack_resets_stage_to_fast() {
        let mut f = follower(1.0, 10.0);
        for _ in 0..4800 {
            f.process_sample(-6.0);
        }
        for _ in 0..4800 {
            f.process_sample(DB_FLOOR);
        }
        assert_eq!(f.stage(), ReleaseStage::Slow);

        f.process_sample(0.0);
        assert_eq!(f.stage(), ReleaseStage::Fast);
    }

    #[test]
    fn floor_input_maps_to_silence() {
        let mut f = follower(10.0, 100.0);
        assert_eq!(f.process_sample(-80.0), DB_FLOOR);
        assert_eq!(f.current_db(), DB_FLOOR);
    }
}

//! User-facing parameters.
//!
//! Ranges are enforced where values enter the core: [`FatParams::clamped`],
//! [`FatParams::from_json`] and every [`SharedParams`] setter. The audio path
//! never re-validates.

use anyhow::Context;
use atomic_float::AtomicF32;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;

/// Fixed soft-knee width of the gain computer (dB). Not user-adjustable.
pub const KNEE_WIDTH_DB: f32 = 6.0;

/// Bounds and default of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub const THRESHOLD_DB: ParamRange = ParamRange {
        min: -60.0,
        max: 0.0,
        default: -20.0,
    };
    pub const RATIO: ParamRange = ParamRange {
        min: 1.0,
        max: 20.0,
        default: 4.0,
    };
    pub const ATTACK_MS: ParamRange = ParamRange {
        min: 0.1,
        max: 100.0,
        default: 10.0,
    };
    pub const RELEASE_MS: ParamRange = ParamRange {
        min: 10.0,
        max: 1000.0,
        default: 100.0,
    };
    pub const FAT_PERCENT: ParamRange = ParamRange {
        min: 0.0,
        max: 100.0,
        default: 50.0,
    };
    pub const OUTPUT_DB: ParamRange = ParamRange {
        min: -12.0,
        max: 12.0,
        default: 0.0,
    };
    pub const MIX_PERCENT: ParamRange = ParamRange {
        min: 0.0,
        max: 100.0,
        default: 100.0,
    };

    /// Clamp into range. NaN falls back to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Plain snapshot of every parameter, in user units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatParams {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub fat_percent: f32,
    pub output_db: f32,
    pub mix_percent: f32,
}

impl Default for FatParams {
    fn default() -> Self {
        Self {
            threshold_db: ParamRange::THRESHOLD_DB.default,
            ratio: ParamRange::RATIO.default,
            attack_ms: ParamRange::ATTACK_MS.default,
            release_ms: ParamRange::RELEASE_MS.default,
            fat_percent: ParamRange::FAT_PERCENT.default,
            output_db: ParamRange::OUTPUT_DB.default,
            mix_percent: ParamRange::MIX_PERCENT.default,
        }
    }
}

impl FatParams {
    pub fn clamped(&self) -> Self {
        Self {
            threshold_db: ParamRange::THRESHOLD_DB.clamp(self.threshold_db),
            ratio: ParamRange::RATIO.clamp(self.ratio),
            attack_ms: ParamRange::ATTACK_MS.clamp(self.attack_ms),
            release_ms: ParamRange::RELEASE_MS.clamp(self.release_ms),
            fat_percent: ParamRange::FAT_PERCENT.clamp(self.fat_percent),
            output_db: ParamRange::OUTPUT_DB.clamp(self.output_db),
            mix_percent: ParamRange::MIX_PERCENT.clamp(self.mix_percent),
        }
    }

    /// Parse a (possibly partial) JSON parameter set. Missing fields take
    /// their defaults; out-of-range values are clamped.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let params: FatParams =
            serde_json::from_str(json).context("invalid FatPressor parameter JSON")?;
        Ok(params.clamped())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize parameters")
    }

    /// Fat amount as a 0..1 drive.
    #[inline]
    pub fn fat_normalized(&self) -> f32 {
        self.fat_percent / 100.0
    }

    /// Mix as a 0..1 wet share.
    #[inline]
    pub fn mix_normalized(&self) -> f32 {
        self.mix_percent / 100.0
    }
}

/// Lock-free parameter cells written by a control thread and read by the
/// audio thread once per block.
///
/// Each cell is independent (relaxed ordering). A block may observe a mix of
/// old and new values across parameters; the smoothers absorb that.
pub struct SharedParams {
    threshold_db: AtomicF32,
    ratio: AtomicF32,
    attack_ms: AtomicF32,
    release_ms: AtomicF32,
    fat_percent: AtomicF32,
    output_db: AtomicF32,
    mix_percent: AtomicF32,
}

impl Default for SharedParams {
    fn default() -> Self {
        Self::new(&FatParams::default())
    }
}

impl SharedParams {
    pub fn new(initial: &FatParams) -> Self {
        let p = initial.clamped();
        Self {
            threshold_db: AtomicF32::new(p.threshold_db),
            ratio: AtomicF32::new(p.ratio),
            attack_ms: AtomicF32::new(p.attack_ms),
            release_ms: AtomicF32::new(p.release_ms),
            fat_percent: AtomicF32::new(p.fat_percent),
            output_db: AtomicF32::new(p.output_db),
            mix_percent: AtomicF32::new(p.mix_percent),
        }
    }

    pub fn set_threshold_db(&self, v: f32) {
        self.threshold_db
            .store(ParamRange::THRESHOLD_DB.clamp(v), Ordering::Relaxed);
    }

    pub fn set_ratio(&self, v: f32) {
        self.ratio.store(ParamRange::RATIO.clamp(v), Ordering::Relaxed);
    }

    pub fn set_attack_ms(&self, v: f32) {
        self.attack_ms
            .store(ParamRange::ATTACK_MS.clamp(v), Ordering::Relaxed);
    }

    pub fn set_release_ms(&self, v: f32) {
        self.release_ms
            .store(ParamRange::RELEASE_MS.clamp(v), Ordering::Relaxed);
    }

    pub fn set_fat_percent(&self, v: f32) {
        self.fat_percent
            .store(ParamRange::FAT_PERCENT.clamp(v), Ordering::Relaxed);
    }

    pub fn set_output_db(&self, v: f32) {
        self.output_db
            .store(ParamRange::OUTPUT_DB.clamp(v), Ordering::Relaxed);
    }

    pub fn set_mix_percent(&self, v: f32) {
        self.mix_percent
            .store(ParamRange::MIX_PERCENT.clamp(v), Ordering::Relaxed);
    }

    /// Store a whole parameter set (e.g. a preset recall).
    pub fn store(&self, params: &FatParams) {
        self.set_threshold_db(params.threshold_db);
        self.set_ratio(params.ratio);
        self.set_attack_ms(params.attack_ms);
        self.set_release_ms(params.release_ms);
        self.set_fat_percent(params.fat_percent);
        self.set_output_db(params.output_db);
        self.set_mix_percent(params.mix_percent);
    }

    pub fn snapshot(&self) -> FatParams {
        FatParams {
            threshold_db: self.threshold_db.load(Ordering::Relaxed),
            ratio: self.ratio.load(Ordering::Relaxed),
            attack_ms: self.attack_ms.load(Ordering::Relaxed),
            release_ms: self.release_ms.load(Ordering::Relaxed),
            fat_percent: self.fat_percent.load(Ordering::Relaxed),
            output_db: self.output_db.load(Ordering::Relaxed),
            mix_percent: self.mix_percent.load(Ordering::Relaxed),
        }
    }
}

//! Shared conversions and shaping helpers for the FatPressor signal path.
//!
//! All dB conversions here apply the −60 dB floor used by every metering and
//! detection path, so nothing downstream ever sees `-inf` or NaN.

/// Floor for every dB conversion in the core.
pub const DB_FLOOR: f32 = -60.0;

/// Drive/amount below which a coloration stage is bypassed outright.
pub const BYPASS_EPS: f32 = 0.001;

/// dB → linear gain. Levels at or below the floor map to silence.
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    if db > DB_FLOOR {
        10.0_f32.powf(db * 0.05)
    } else {
        0.0
    }
}

/// Linear gain → dB, clamped to [`DB_FLOOR`].
#[inline]
pub fn lin_to_db(gain: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

/// One-pole smoothing coefficient `exp(-1 / (sr * t))` for a time constant in seconds.
///
/// Derived in f64 so long time constants at high sample rates keep their precision.
#[inline]
pub fn one_pole_coeff(time_sec: f64, sample_rate: f64) -> f32 {
    let samples = (sample_rate * time_sec).max(f64::MIN_POSITIVE);
    (-1.0 / samples).exp() as f32
}

/// Smooth rational saturation `x / (1 + |x| * amount)`. Odd-symmetric, no discontinuities.
#[inline]
pub fn soft_saturate(x: f32, amount: f32) -> f32 {
    x / (1.0 + x.abs() * amount)
}

/// Peak magnitude of a block.
pub fn block_peak(x: &[f32]) -> f32 {
    x.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()))
}

//! Soft-Knee Gain Computer
//!
//! Static transfer curve of the compressor: maps the envelope level (dB) to a
//! gain reduction (dB, never positive).
//!
//! - Below the knee the curve is the identity.
//! - Inside the knee the reduction grows quadratically from zero.
//! - Above the knee the output follows `threshold + (input - threshold) / ratio`.
//!
//! A knee width of 0 collapses to a hard knee at the threshold.

const DEFAULT_THRESHOLD_DB: f32 = -20.0;
const DEFAULT_RATIO: f32 = 4.0;
const DEFAULT_KNEE_DB: f32 = 6.0;

/// Knee boundaries derived from threshold and knee width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KneeBounds {
    pub start: f32,
    pub end: f32,
}

impl KneeBounds {
    pub fn derive(threshold_db: f32, knee_db: f32) -> Self {
        let half = knee_db * 0.5;
        Self {
            start: threshold_db - half,
            end: threshold_db + half,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GainComputer {
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
    bounds: KneeBounds,
}

impl Default for GainComputer {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            ratio: DEFAULT_RATIO,
            knee_db: DEFAULT_KNEE_DB,
            bounds: KneeBounds::derive(DEFAULT_THRESHOLD_DB, DEFAULT_KNEE_DB),
        }
    }
}

impl GainComputer {
    pub fn new() -> Self {
        Self::default()
    }

    // No sample-rate dependent state.
    pub fn prepare(&mut self, _sample_rate: f64, _max_block_size: usize) {}

    pub fn reset(&mut self) {}

    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
        self.bounds = KneeBounds::derive(self.threshold_db, self.knee_db);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.max(1.0);
    }

    pub fn set_knee_db(&mut self, knee_db: f32) {
        self.knee_db = knee_db.max(0.0);
        self.bounds = KneeBounds::derive(self.threshold_db, self.knee_db);
    }

    /// Gain reduction (dB, ≤ 0) for an envelope level in dB.
    #[inline]
    pub fn compute_gain_reduction(&self, input_db: f32) -> f32 {
        let output_db = if input_db <= self.bounds.start {
            input_db
        } else if input_db >= self.bounds.end {
            self.threshold_db + (input_db - self.threshold_db) / self.ratio
        } else {
            // Only reachable with a non-zero knee
            let t = (input_db - self.bounds.start) / self.knee_db;
            let slope = 1.0 - 1.0 / self.ratio;
            input_db - slope * 0.5 * t * t * self.knee_db
        };

        (output_db - input_db).min(0.0)
    }

    /// Output level (dB) for an input level, for transfer-curve displays.
    pub fn compute_output(&self, input_db: f32) -> f32 {
        input_db + self.compute_gain_reduction(input_db)
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn knee_db(&self) -> f32 {
        self.knee_db
    }

    pub fn bounds(&self) -> KneeBounds {
        self.bounds
    }
}

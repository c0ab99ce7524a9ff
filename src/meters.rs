//! Thread-safe metering for the compressor.
//!
//! The audio thread publishes once per block; a UI thread polls at its own
//! rate. Every cell is an f32 bit-cast into an `AtomicU32` with relaxed
//! ordering, so a reader may see values up to one block old and cells from
//! different blocks. That staleness is acceptable for display.

use crate::dsp::utils::DB_FLOOR;
use std::sync::atomic::{AtomicU32, Ordering};

/// Plain copy of all meter values (dB).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSnapshot {
    pub input_l_db: f32,
    pub input_r_db: f32,
    pub output_l_db: f32,
    pub output_r_db: f32,
    /// Peak gain reduction of the last block, as a positive dB value.
    pub gain_reduction_db: f32,
}

pub struct Meters {
    input_l: AtomicU32,
    input_r: AtomicU32,
    output_l: AtomicU32,
    output_r: AtomicU32,
    gain_reduction: AtomicU32,
}

impl Default for Meters {
    fn default() -> Self {
        Self {
            input_l: AtomicU32::new(DB_FLOOR.to_bits()),
            input_r: AtomicU32::new(DB_FLOOR.to_bits()),
            output_l: AtomicU32::new(DB_FLOOR.to_bits()),
            output_r: AtomicU32::new(DB_FLOOR.to_bits()),
            gain_reduction: AtomicU32::new(0.0f32.to_bits()),
        }
    }
}

impl Meters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_l(&self, db: f32) {
        self.input_l.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn set_input_r(&self, db: f32) {
        self.input_r.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn set_output_l(&self, db: f32) {
        self.output_l.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn set_output_r(&self, db: f32) {
        self.output_r.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn set_gain_reduction(&self, db: f32) {
        self.gain_reduction.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn get_input_l(&self) -> f32 {
        f32::from_bits(self.input_l.load(Ordering::Relaxed))
    }

    pub fn get_input_r(&self) -> f32 {
        f32::from_bits(self.input_r.load(Ordering::Relaxed))
    }

    pub fn get_output_l(&self) -> f32 {
        f32::from_bits(self.output_l.load(Ordering::Relaxed))
    }

    pub fn get_output_r(&self) -> f32 {
        f32::from_bits(self.output_r.load(Ordering::Relaxed))
    }

    pub fn get_gain_reduction(&self) -> f32 {
        f32::from_bits(self.gain_reduction.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            input_l_db: self.get_input_l(),
            input_r_db: self.get_input_r(),
            output_l_db: self.get_output_l(),
            output_r_db: self.get_output_r(),
            gain_reduction_db: self.get_gain_reduction(),
        }
    }

    /// Back to the idle state (floor levels, no reduction).
    pub fn clear(&self) {
        self.set_input_l(DB_FLOOR);
        self.set_input_r(DB_FLOOR);
        self.set_output_l(DB_FLOOR);
        self.set_output_r(DB_FLOOR);
        self.set_gain_reduction(0.0);
    }
}

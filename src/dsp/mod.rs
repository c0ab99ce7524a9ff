pub mod biquad;
pub mod envelope;
pub mod gain_computer;
pub mod sidechain;
pub mod transformer;
pub mod tube;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_signals;

pub use biquad::{Biquad, BiquadCoeffs, StereoBiquad};
pub use envelope::EnvelopeFollower;
pub use gain_computer::GainComputer;
pub use sidechain::SidechainDetector;
pub use transformer::TransformerColoration;
pub use tube::TubeSaturation;

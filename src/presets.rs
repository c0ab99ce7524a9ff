use crate::params::FatParams;
use nih_plug::prelude::Enum;
use serde::{Deserialize, Serialize};

// =============================================================================
// PRESET CATEGORIES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[repr(usize)]
pub enum PresetCategory {
    #[serde(rename = "Drums")]
    #[name = "Drums"]
    Drums,
    #[serde(rename = "Vocals")]
    #[name = "Vocals"]
    Vocals,
    #[serde(rename = "Bass")]
    #[name = "Bass"]
    Bass,
    #[serde(rename = "Mix Bus")]
    #[name = "Mix Bus"]
    MixBus,
}

impl PresetCategory {
    pub fn name(&self) -> &'static str {
        Self::variants()[self.to_index()]
    }
}

// =============================================================================
// FACTORY PRESETS
// =============================================================================

/// Built-in settings, five per category.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[repr(usize)]
pub enum FactoryPreset {
    // Drums
    #[serde(rename = "Punchy Kick")]
    #[name = "Punchy Kick"]
    PunchyKick,
    #[serde(rename = "Snare Snap")]
    #[name = "Snare Snap"]
    SnareSnap,
    #[serde(rename = "Room Glue")]
    #[name = "Room Glue"]
    RoomGlue,
    #[serde(rename = "Parallel Smash")]
    #[name = "Parallel Smash"]
    ParallelSmash,
    #[serde(rename = "Drum Bus")]
    #[name = "Drum Bus"]
    #[default]
    DrumBus,

    // Vocals
    #[serde(rename = "Gentle Lead")]
    #[name = "Gentle Lead"]
    GentleLead,
    #[serde(rename = "Radio Ready")]
    #[name = "Radio Ready"]
    RadioReady,
    #[serde(rename = "Intimate")]
    #[name = "Intimate"]
    Intimate,
    #[serde(rename = "De-Harsh")]
    #[name = "De-Harsh"]
    DeHarsh,
    #[serde(rename = "Background Vox")]
    #[name = "Background Vox"]
    BackgroundVox,

    // Bass
    #[serde(rename = "Tight Low")]
    #[name = "Tight Low"]
    TightLow,
    #[serde(rename = "Tube Warmth")]
    #[name = "Tube Warmth"]
    TubeWarmth,
    #[serde(rename = "Slap Bass")]
    #[name = "Slap Bass"]
    SlapBass,
    #[serde(rename = "Sub Control")]
    #[name = "Sub Control"]
    SubControl,
    #[serde(rename = "Vintage Bass")]
    #[name = "Vintage Bass"]
    VintageBass,

    // Mix Bus
    #[serde(rename = "Glue Master")]
    #[name = "Glue Master"]
    GlueMaster,
    #[serde(rename = "Loud & Proud")]
    #[name = "Loud & Proud"]
    LoudAndProud,
    #[serde(rename = "Transparent")]
    #[name = "Transparent"]
    Transparent,
    #[serde(rename = "Analog Sum")]
    #[name = "Analog Sum"]
    AnalogSum,
    #[serde(rename = "Final Touch")]
    #[name = "Final Touch"]
    FinalTouch,
}

/// Compact constructor for the table below.
const fn preset(
    threshold_db: f32,
    ratio: f32,
    attack_ms: f32,
    release_ms: f32,
    fat_percent: f32,
    output_db: f32,
    mix_percent: f32,
) -> FatParams {
    FatParams {
        threshold_db,
        ratio,
        attack_ms,
        release_ms,
        fat_percent,
        output_db,
        mix_percent,
    }
}

impl FactoryPreset {
    pub const ALL: [FactoryPreset; 20] = [
        FactoryPreset::PunchyKick,
        FactoryPreset::SnareSnap,
        FactoryPreset::RoomGlue,
        FactoryPreset::ParallelSmash,
        FactoryPreset::DrumBus,
        FactoryPreset::GentleLead,
        FactoryPreset::RadioReady,
        FactoryPreset::Intimate,
        FactoryPreset::DeHarsh,
        FactoryPreset::BackgroundVox,
        FactoryPreset::TightLow,
        FactoryPreset::TubeWarmth,
        FactoryPreset::SlapBass,
        FactoryPreset::SubControl,
        FactoryPreset::VintageBass,
        FactoryPreset::GlueMaster,
        FactoryPreset::LoudAndProud,
        FactoryPreset::Transparent,
        FactoryPreset::AnalogSum,
        FactoryPreset::FinalTouch,
    ];

    pub fn name(&self) -> &'static str {
        Self::variants()[self.to_index()]
    }

    pub fn category(&self) -> PresetCategory {
        use FactoryPreset::*;
        match self {
            PunchyKick | SnareSnap | RoomGlue | ParallelSmash | DrumBus => PresetCategory::Drums,
            GentleLead | RadioReady | Intimate | DeHarsh | BackgroundVox => {
                PresetCategory::Vocals
            }
            TightLow | TubeWarmth | SlapBass | SubControl | VintageBass => PresetCategory::Bass,
            GlueMaster | LoudAndProud | Transparent | AnalogSum | FinalTouch => {
                PresetCategory::MixBus
            }
        }
    }

    /// Parameter values (threshold, ratio, attack, release, fat, output, mix).
    pub fn params(&self) -> FatParams {
        match self {
            // Fast attack lets the beater through; fat thickens the low end
            FactoryPreset::PunchyKick => preset(-24.0, 4.0, 5.0, 150.0, 45.0, 2.0, 100.0),
            FactoryPreset::SnareSnap => preset(-18.0, 3.5, 1.0, 80.0, 35.0, 3.0, 100.0),
            FactoryPreset::RoomGlue => preset(-30.0, 2.5, 15.0, 300.0, 55.0, 1.0, 100.0),
            // Heavy settings blended in parallel
            FactoryPreset::ParallelSmash => preset(-35.0, 8.0, 3.0, 120.0, 75.0, 6.0, 50.0),
            FactoryPreset::DrumBus => preset(-20.0, 3.0, 10.0, 200.0, 40.0, 2.0, 100.0),

            FactoryPreset::GentleLead => preset(-22.0, 2.5, 12.0, 180.0, 25.0, 1.5, 100.0),
            FactoryPreset::RadioReady => preset(-18.0, 5.0, 8.0, 150.0, 50.0, 4.0, 100.0),
            FactoryPreset::Intimate => preset(-28.0, 2.0, 20.0, 250.0, 60.0, 0.0, 100.0),
            FactoryPreset::DeHarsh => preset(-16.0, 3.0, 5.0, 200.0, 70.0, 2.0, 85.0),
            FactoryPreset::BackgroundVox => preset(-25.0, 4.0, 15.0, 300.0, 35.0, -2.0, 100.0),

            FactoryPreset::TightLow => preset(-20.0, 4.5, 8.0, 100.0, 30.0, 2.0, 100.0),
            FactoryPreset::TubeWarmth => preset(-25.0, 3.0, 15.0, 200.0, 80.0, 1.0, 100.0),
            FactoryPreset::SlapBass => preset(-18.0, 3.5, 2.0, 80.0, 40.0, 3.0, 100.0),
            FactoryPreset::SubControl => preset(-30.0, 6.0, 20.0, 250.0, 20.0, 4.0, 100.0),
            FactoryPreset::VintageBass => preset(-22.0, 3.0, 12.0, 180.0, 65.0, 2.0, 100.0),

            FactoryPreset::GlueMaster => preset(-18.0, 2.0, 25.0, 300.0, 30.0, 1.0, 100.0),
            FactoryPreset::LoudAndProud => preset(-12.0, 3.5, 15.0, 200.0, 50.0, 4.0, 100.0),
            FactoryPreset::Transparent => preset(-24.0, 1.5, 30.0, 400.0, 10.0, 0.5, 100.0),
            FactoryPreset::AnalogSum => preset(-20.0, 2.5, 20.0, 350.0, 55.0, 1.5, 100.0),
            FactoryPreset::FinalTouch => preset(-22.0, 2.0, 30.0, 500.0, 25.0, 1.0, 100.0),
        }
    }

    /// Look up a preset by display name (case-insensitive).
    pub fn from_name(name: &str) -> Option<FactoryPreset> {
        let name = name.trim();
        Self::variants()
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .map(Self::from_index)
    }

    pub fn in_category(category: PresetCategory) -> impl Iterator<Item = FactoryPreset> {
        Self::ALL
            .into_iter()
            .filter(move |p| p.category() == category)
    }
}

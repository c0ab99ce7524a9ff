//! FatPressor: tube-driven optical compressor core.
//!
//! Signal path per block:
//! tube saturation → (detector → envelope → gain computer) per sample →
//! transformer coloration → output gain and wet/dry mix.

pub mod debug;
pub mod dsp;
pub mod meters;
pub mod params;
pub mod presets;

use crate::dsp::utils::{block_peak, lin_to_db};
use crate::dsp::{
    EnvelopeFollower, GainComputer, SidechainDetector, TransformerColoration, TubeSaturation,
};
use nih_plug::prelude::{Smoother, SmoothingStyle};
use nih_plug::util::db_to_gain;
use std::sync::Arc;

pub use crate::meters::{MeterSnapshot, Meters};
pub use crate::params::{FatParams, ParamRange, SharedParams, KNEE_WIDTH_DB};
pub use crate::presets::{FactoryPreset, PresetCategory};

// Ramp times (ms)
const THRESHOLD_RAMP_MS: f32 = 2.0;
const RATIO_RAMP_MS: f32 = 2.0;
const ATTACK_RAMP_MS: f32 = 1.0;
const RELEASE_RAMP_MS: f32 = 1.0;
const FAT_RAMP_MS: f32 = 5.0;
const OUTPUT_RAMP_MS: f32 = 3.0;
const MIX_RAMP_MS: f32 = 3.0;

const MAX_CHANNELS: usize = 2;

/// Linear peaks and deepest gain reduction seen over one host block.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BlockLevels {
    input: [f32; MAX_CHANNELS],
    output: [f32; MAX_CHANNELS],
    // dB, ≤ 0
    gain_db: f32,
}

impl BlockLevels {
    const SILENT: BlockLevels = BlockLevels {
        input: [0.0; MAX_CHANNELS],
        output: [0.0; MAX_CHANNELS],
        gain_db: 0.0,
    };

    fn merge(&mut self, other: &BlockLevels) {
        for ch in 0..MAX_CHANNELS {
            self.input[ch] = self.input[ch].max(other.input[ch]);
            self.output[ch] = self.output[ch].max(other.output[ch]);
        }
        self.gain_db = self.gain_db.min(other.gain_db);
    }
}

/// Linear ramp that only restarts when its target actually moves.
struct SmoothedParam {
    smoother: Smoother<f32>,
    target: f32,
}

impl SmoothedParam {
    fn new(ramp_ms: f32) -> Self {
        Self {
            smoother: Smoother::new(SmoothingStyle::Linear(ramp_ms)),
            target: 0.0,
        }
    }

    fn reset(&mut self, value: f32) {
        self.target = value;
        self.smoother.reset(value);
    }

    fn retarget(&mut self, sample_rate: f32, target: f32) {
        if target != self.target {
            self.target = target;
            self.smoother.set_target(sample_rate, target);
        }
    }

    /// Advance a whole block at once and return the value at its end.
    #[inline]
    fn skip(&self, num_samples: usize) -> f32 {
        self.smoother.next_step(num_samples as u32)
    }

    #[inline]
    fn next(&self) -> f32 {
        self.smoother.next()
    }

    fn snap_to_target(&mut self) {
        self.smoother.reset(self.target);
    }
}

struct Smoothers {
    threshold_db: SmoothedParam,
    ratio: SmoothedParam,
    attack_ms: SmoothedParam,
    release_ms: SmoothedParam,
    fat: SmoothedParam,
    output_db: SmoothedParam,
    mix: SmoothedParam,
}

impl Smoothers {
    fn new() -> Self {
        Self {
            threshold_db: SmoothedParam::new(THRESHOLD_RAMP_MS),
            ratio: SmoothedParam::new(RATIO_RAMP_MS),
            attack_ms: SmoothedParam::new(ATTACK_RAMP_MS),
            release_ms: SmoothedParam::new(RELEASE_RAMP_MS),
            fat: SmoothedParam::new(FAT_RAMP_MS),
            output_db: SmoothedParam::new(OUTPUT_RAMP_MS),
            mix: SmoothedParam::new(MIX_RAMP_MS),
        }
    }

    fn reset_to(&mut self, p: &FatParams) {
        self.threshold_db.reset(p.threshold_db);
        self.ratio.reset(p.ratio);
        self.attack_ms.reset(p.attack_ms);
        self.release_ms.reset(p.release_ms);
        self.fat.reset(p.fat_normalized());
        self.output_db.reset(p.output_db);
        self.mix.reset(p.mix_normalized());
    }

    fn retarget(&mut self, sample_rate: f32, p: &FatParams) {
        self.threshold_db.retarget(sample_rate, p.threshold_db);
        self.ratio.retarget(sample_rate, p.ratio);
        self.attack_ms.retarget(sample_rate, p.attack_ms);
        self.release_ms.retarget(sample_rate, p.release_ms);
        self.fat.retarget(sample_rate, p.fat_normalized());
        self.output_db.retarget(sample_rate, p.output_db);
        self.mix.retarget(sample_rate, p.mix_normalized());
    }

    fn snap_to_targets(&mut self) {
        self.threshold_db.snap_to_target();
        self.ratio.snap_to_target();
        self.attack_ms.snap_to_target();
        self.release_ms.snap_to_target();
        self.fat.snap_to_target();
        self.output_db.snap_to_target();
        self.mix.snap_to_target();
    }
}

/// The compressor. Call [`FatPressor::prepare`] before [`FatPressor::process`].
pub struct FatPressor {
    sample_rate: f64,
    max_block_size: usize,
    prepared: bool,

    detector: SidechainDetector,
    envelope: EnvelopeFollower,
    gain_computer: GainComputer,
    tube: TubeSaturation,
    transformer: TransformerColoration,

    smoothers: Smoothers,
    // Dry copy for the wet/dry mix, sized in `prepare`
    dry: [Vec<f32>; MAX_CHANNELS],

    meters: Arc<Meters>,

    rt_log: crate::debug::RtLogger,
    #[cfg(feature = "debug")]
    log_drain: Option<crate::debug::logger::LogDrain>,
}

impl Default for FatPressor {
    fn default() -> Self {
        Self::new()
    }
}

impl FatPressor {
    pub fn new() -> Self {
        #[cfg(feature = "debug")]
        let (rt_log, log_drain) = crate::debug::logger::channel();
        #[cfg(not(feature = "debug"))]
        let rt_log = crate::debug::RtLogger;

        Self {
            sample_rate: 0.0,
            max_block_size: 0,
            prepared: false,
            detector: SidechainDetector::new(),
            envelope: EnvelopeFollower::new(),
            gain_computer: GainComputer::new(),
            tube: TubeSaturation::new(),
            transformer: TransformerColoration::new(),
            smoothers: Smoothers::new(),
            dry: [Vec::new(), Vec::new()],
            meters: Arc::new(Meters::new()),
            rt_log,
            #[cfg(feature = "debug")]
            log_drain: Some(log_drain),
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Allocate buffers, derive every coefficient for `sample_rate` and snap
    /// all smoothers to `params`. Not realtime-safe.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize, params: &FatParams) {
        let max_block_size = max_block_size.max(1);
        let params = params.clamped();

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        for buf in &mut self.dry {
            *buf = vec![0.0; max_block_size];
        }

        self.detector.prepare(sample_rate, max_block_size);
        self.envelope.prepare(sample_rate, max_block_size);
        self.gain_computer.prepare(sample_rate, max_block_size);
        self.gain_computer.set_knee_db(KNEE_WIDTH_DB);
        self.tube.prepare(sample_rate, max_block_size);
        self.transformer.prepare(sample_rate, max_block_size);

        self.smoothers.reset_to(&params);
        self.apply_stage_params(
            params.threshold_db,
            params.ratio,
            params.attack_ms,
            params.release_ms,
            params.fat_normalized(),
        );
        self.meters.clear();

        log::debug!(
            "FatPressor prepared: {} Hz, max block {}, RMS window {} samples",
            sample_rate,
            max_block_size,
            self.detector.window_len()
        );

        self.prepared = true;
    }

    /// Clear all signal state without reallocating. Smoothers jump to their targets.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.envelope.reset();
        self.gain_computer.reset();
        self.tube.reset();
        self.transformer.reset();
        self.smoothers.snap_to_targets();
        for buf in &mut self.dry {
            buf.fill(0.0);
        }
        self.meters.clear();
    }

    /// Process one block in place.
    ///
    /// One channel is treated as mono, two as stereo; further channels are
    /// left untouched. Blocks longer than the prepared maximum are split, and
    /// the meters then cover the whole block: loudest peaks, deepest gain
    /// reduction.
    pub fn process(&mut self, channels: &mut [&mut [f32]], params: &FatParams) {
        debug_assert!(self.prepared, "FatPressor::process called before prepare");
        if !self.prepared {
            return;
        }

        let params = params.clamped();
        let max = self.max_block_size;
        let mut levels = BlockLevels::SILENT;

        let len = match channels {
            [] => 0,
            [mono] => {
                let len = mono.len();
                if len > max {
                    crate::fp_log!(
                        self.rt_log,
                        "splitting {} samples into {}-sample chunks",
                        len,
                        max
                    );
                }
                let mut start = 0;
                while start < len {
                    let end = (start + max).min(len);
                    let chunk =
                        self.process_chunk_checked(&mut [&mut mono[start..end]], &params);
                    levels.merge(&chunk);
                    start = end;
                }
                len
            }
            [left, right, ..] => {
                let len = left.len().min(right.len());
                if len > max {
                    crate::fp_log!(
                        self.rt_log,
                        "splitting {} samples into {}-sample chunks",
                        len,
                        max
                    );
                }
                let mut start = 0;
                while start < len {
                    let end = (start + max).min(len);
                    let chunk = self.process_chunk_checked(
                        &mut [&mut left[start..end], &mut right[start..end]],
                        &params,
                    );
                    levels.merge(&chunk);
                    start = end;
                }
                len
            }
        };

        if len > 0 {
            self.publish_meters(&levels);
        }
    }

    #[inline]
    fn process_chunk_checked(
        &mut self,
        chunk: &mut [&mut [f32]],
        params: &FatParams,
    ) -> BlockLevels {
        #[cfg(debug_assertions)]
        let levels = assert_no_alloc::assert_no_alloc(|| self.process_chunk(chunk, params));
        #[cfg(not(debug_assertions))]
        let levels = self.process_chunk(chunk, params);
        levels
    }

    fn publish_meters(&self, levels: &BlockLevels) {
        self.meters.set_input_l(lin_to_db(levels.input[0]));
        self.meters.set_input_r(lin_to_db(levels.input[1]));
        // Positive dB
        self.meters.set_gain_reduction(-levels.gain_db);
        self.meters.set_output_l(lin_to_db(levels.output[0]));
        self.meters.set_output_r(lin_to_db(levels.output[1]));
    }

    fn process_chunk(&mut self, chunk: &mut [&mut [f32]], params: &FatParams) -> BlockLevels {
        let num_channels = chunk.len().min(MAX_CHANNELS);
        let num_samples = chunk[0].len();
        let stereo = num_channels == 2;

        // 1. Retarget
        self.smoothers.retarget(self.sample_rate as f32, params);

        // 2. Input metering
        let in_l = block_peak(&chunk[0]);
        let in_r = if stereo { block_peak(&chunk[1]) } else { in_l };

        // 3. Dry copy
        for ch in 0..num_channels {
            self.dry[ch][..num_samples].copy_from_slice(&chunk[ch]);
        }

        // 4-5. Fast parameters jump to the end of the block
        let threshold_db = self.smoothers.threshold_db.skip(num_samples);
        let ratio = self.smoothers.ratio.skip(num_samples);
        let attack_ms = self.smoothers.attack_ms.skip(num_samples);
        let release_ms = self.smoothers.release_ms.skip(num_samples);
        let fat = self.smoothers.fat.skip(num_samples);
        self.apply_stage_params(threshold_db, ratio, attack_ms, release_ms, fat);

        // 6. Tube
        self.tube.process_block(&mut chunk[..num_channels]);

        // 7. Detection and gain reduction
        let mut peak_gr_db = 0.0f32;
        for i in 0..num_samples {
            let l = chunk[0][i];
            let r = if stereo { chunk[1][i] } else { l };

            let detection_db = self.detector.process_sample(l, r);
            let envelope_db = self.envelope.process_sample(detection_db);
            let gr_db = self.gain_computer.compute_gain_reduction(envelope_db);
            peak_gr_db = peak_gr_db.min(gr_db);

            let gain = db_to_gain(gr_db);
            for ch in chunk[..num_channels].iter_mut() {
                ch[i] *= gain;
            }
        }

        // 8. Gain reduction is published with the other meters

        // 9. Transformer
        self.transformer.process_block(&mut chunk[..num_channels]);

        // 10. Output gain and mix, one ramp step per sample index
        for i in 0..num_samples {
            let out_gain = db_to_gain(self.smoothers.output_db.next());
            let mix = self.smoothers.mix.next();
            let dry_mix = 1.0 - mix;

            for ch in 0..num_channels {
                let wet = chunk[ch][i] * out_gain;
                chunk[ch][i] = wet * mix + self.dry[ch][i] * dry_mix;
            }
        }

        // 11. Output metering
        let out_l = block_peak(&chunk[0]);
        let out_r = if stereo { block_peak(&chunk[1]) } else { out_l };

        BlockLevels {
            input: [in_l, in_r],
            output: [out_l, out_r],
            gain_db: peak_gr_db,
        }
    }

    fn apply_stage_params(
        &mut self,
        threshold_db: f32,
        ratio: f32,
        attack_ms: f32,
        release_ms: f32,
        fat: f32,
    ) {
        self.gain_computer.set_threshold_db(threshold_db);
        self.gain_computer.set_ratio(ratio);
        self.envelope.set_attack_ms(attack_ms);
        self.envelope.set_release_ms(release_ms);
        self.tube.set_drive(fat);
        self.transformer.set_amount(fat);
    }

    /// Meter cells for a UI-side reader.
    pub fn meters(&self) -> Arc<Meters> {
        Arc::clone(&self.meters)
    }

    /// Static curve currently in use, for transfer-curve displays.
    pub fn gain_computer(&self) -> &GainComputer {
        &self.gain_computer
    }

    /// Control-thread end of this instance's realtime log. Handed out once.
    #[cfg(feature = "debug")]
    pub fn take_log_drain(&mut self) -> Option<crate::debug::logger::LogDrain> {
        self.log_drain.take()
    }

    /// No lookahead anywhere in the chain.
    pub fn latency_samples(&self) -> u32 {
        0
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::test_signals::sine;

    const SR: f64 = 48000.0;
    const BLOCK: usize = 512;

    fn bypass_params() -> FatParams {
        FatParams {
            threshold_db: 0.0,
            ratio: 1.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            fat_percent: 0.0,
            output_db: 0.0,
            mix_percent: 100.0,
        }
    }

    fn scenario_params() -> FatParams {
        FatParams {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            fat_percent: 50.0,
            output_db: 0.0,
            mix_percent: 100.0,
        }
    }

    fn prepared(params: &FatParams) -> FatPressor {
        let mut fp = FatPressor::new();
        fp.prepare(SR, BLOCK, params);
        fp
    }

    fn run_stereo(fp: &mut FatPressor, l: &mut [f32], r: &mut [f32], params: &FatParams) {
        for (cl, cr) in l.chunks_mut(BLOCK).zip(r.chunks_mut(BLOCK)) {
            fp.process(&mut [cl, cr], params);
        }
    }

    #[test]
    fn bypass_settings_are_transparent() {
        let params = bypass_params();
        let mut fp = prepared(&params);

        let in_l = sine(220.0, 0.8, SR, BLOCK * 20);
        let in_r = sine(3300.0, 0.3, SR, BLOCK * 20);
        let mut l = in_l.clone();
        let mut r = in_r.clone();
        run_stereo(&mut fp, &mut l, &mut r, &params);

        for i in 0..l.len() {
            assert!((l[i] - in_l[i]).abs() < 1e-6, "L differs at {i}");
            assert!((r[i] - in_r[i]).abs() < 1e-6, "R differs at {i}");
        }
        assert_eq!(fp.meters().get_gain_reduction(), 0.0);
    }

    #[test]
    fn zero_mix_returns_dry() {
        let mut params = scenario_params();
        params.threshold_db = -40.0;
        params.ratio = 20.0;
        params.fat_percent = 100.0;
        params.output_db = 12.0;
        params.mix_percent = 0.0;
        let mut fp = prepared(&params);

        let input = sine(440.0, 0.9, SR, BLOCK * 8);
        let mut l = input.clone();
        let mut r = input.clone();
        run_stereo(&mut fp, &mut l, &mut r, &params);

        for i in 0..l.len() {
            assert!((l[i] - input[i]).abs() < 1e-6);
            assert!((r[i] - input[i]).abs() < 1e-6);
        }
        // Compression still ran
        assert!(fp.meters().get_gain_reduction() > 1.0);
    }

    /// One second of 1 kHz at -6 dBFS; returns the settled meters.
    fn settled_sine_meters(params: &FatParams) -> MeterSnapshot {
        let mut fp = prepared(params);
        let amp = 10.0f32.powf(-6.0 / 20.0);
        let mut l = sine(1000.0, amp, SR, 48_000);
        let mut r = l.clone();
        run_stereo(&mut fp, &mut l, &mut r, params);
        fp.meters().snapshot()
    }

    #[test]
    fn sine_scenario_reduces_gain() {
        // The hybrid detector reads 0.7 RMS + 0.3 peak, about 2 dB under the
        // sine's peak. Clean, the curve sees roughly -8 dB: 12 dB over a
        // -20 dB threshold at 4:1 is 9 dB of reduction.
        let mut clean = scenario_params();
        clean.fat_percent = 0.0;
        let m = settled_sine_meters(&clean);
        assert!((m.input_l_db + 6.0).abs() < 0.1, "input meter {}", m.input_l_db);
        assert!(
            m.gain_reduction_db > 8.6 && m.gain_reduction_db < 9.3,
            "gain reduction {}",
            m.gain_reduction_db
        );

        // At 1 kHz the tube's 800 Hz low band and 600 Hz high band are about
        // 160 degrees apart and mostly cancel, so detection drops to roughly
        // -17 dB and only the top of the knee region is reached.
        let m = settled_sine_meters(&scenario_params());
        assert!(
            m.gain_reduction_db > 2.0 && m.gain_reduction_db < 2.8,
            "gain reduction {}",
            m.gain_reduction_db
        );
        assert!(m.output_l_db < m.input_l_db - 3.0);
        assert_eq!(m.output_l_db, m.output_r_db);
    }

    #[test]
    fn mix_blends_wet_and_dry_linearly() {
        let input = sine(440.0, 0.9, SR, BLOCK * 8);
        let render = |mix_percent: f32| {
            let mut params = scenario_params();
            params.threshold_db = -40.0;
            params.ratio = 8.0;
            params.mix_percent = mix_percent;
            let mut fp = prepared(&params);
            let mut l = input.clone();
            let mut r = input.clone();
            run_stereo(&mut fp, &mut l, &mut r, &params);
            l
        };

        let dry = render(0.0);
        let half = render(50.0);
        let wet = render(100.0);

        for i in 0..input.len() {
            assert!((dry[i] - input[i]).abs() < 1e-6, "dry differs at {i}");
            let expected = 0.5 * wet[i] + 0.5 * input[i];
            assert!(
                (half[i] - expected).abs() < 1e-6,
                "half mix at {i}: {} vs {expected}",
                half[i]
            );
        }

        let deviation = wet
            .iter()
            .zip(&input)
            .fold(0.0f32, |acc, (w, x)| acc.max((w - x).abs()));
        assert!(deviation > 0.1, "fully wet only moved {deviation}");
    }

    #[test]
    fn mono_matches_stereo_left() {
        let params = scenario_params();
        let mut mono_fp = prepared(&params);
        let mut stereo_fp = prepared(&params);

        let input = sine(150.0, 0.7, SR, BLOCK * 6);
        let mut mono = input.clone();
        let mut l = input.clone();
        let mut r = input.clone();

        for chunk in mono.chunks_mut(BLOCK) {
            mono_fp.process(&mut [chunk], &params);
        }
        run_stereo(&mut stereo_fp, &mut l, &mut r, &params);

        assert_eq!(mono, l);
        let m = mono_fp.meters().snapshot();
        assert_eq!(m.input_l_db, m.input_r_db);
        assert_eq!(m.output_l_db, m.output_r_db);
    }

    #[test]
    fn long_blocks_are_chunked() {
        let params = scenario_params();
        let mut whole = FatPressor::new();
        whole.prepare(SR, 256, &params);
        let mut pieces = FatPressor::new();
        pieces.prepare(SR, 256, &params);

        let input = sine(700.0, 0.6, SR, 2048);
        let mut a_l = input.clone();
        let mut a_r = input.clone();
        whole.process(&mut [&mut a_l, &mut a_r], &params);

        let mut b_l = input.clone();
        let mut b_r = input.clone();
        for (cl, cr) in b_l.chunks_mut(256).zip(b_r.chunks_mut(256)) {
            pieces.process(&mut [cl, cr], &params);
        }

        assert_eq!(a_l, b_l);
        assert_eq!(a_r, b_r);
    }

    #[test]
    fn split_block_meters_cover_every_chunk() {
        let mut params = scenario_params();
        params.release_ms = 10.0;
        let max = 256;

        // Loud burst, then a long silent tail
        let mut burst = sine(200.0, 0.9, SR, max * 2);
        burst.resize(max * 20, 0.0);

        let mut whole = FatPressor::new();
        whole.prepare(SR, max, &params);
        let mut l = burst.clone();
        let mut r = burst.clone();
        whole.process(&mut [&mut l, &mut r], &params);

        let mut pieces = FatPressor::new();
        pieces.prepare(SR, max, &params);
        let mut snaps = Vec::new();
        let mut pl = burst.clone();
        let mut pr = burst.clone();
        for (cl, cr) in pl.chunks_mut(max).zip(pr.chunks_mut(max)) {
            pieces.process(&mut [cl, cr], &params);
            snaps.push(pieces.meters().snapshot());
        }
        let loudest = |f: fn(&MeterSnapshot) -> f32| snaps.iter().map(f).fold(f32::MIN, f32::max);

        let m = whole.meters().snapshot();
        assert_eq!(m.input_l_db, loudest(|s| s.input_l_db));
        assert_eq!(m.input_r_db, loudest(|s| s.input_r_db));
        assert_eq!(m.gain_reduction_db, loudest(|s| s.gain_reduction_db));
        assert_eq!(m.output_l_db, loudest(|s| s.output_l_db));
        assert_eq!(m.output_r_db, loudest(|s| s.output_r_db));

        // The tail alone reports nothing
        let tail = snaps[snaps.len() - 1];
        assert!(tail.gain_reduction_db < 0.5);
        assert!(m.gain_reduction_db > 5.0, "gain reduction {}", m.gain_reduction_db);
    }

    #[test]
    fn gain_computer_follows_params() {
        let mut params = scenario_params();
        params.threshold_db = -30.0;
        params.ratio = 6.0;
        let mut fp = prepared(&params);

        let gc = fp.gain_computer();
        assert_eq!(gc.threshold_db(), -30.0);
        assert_eq!(gc.ratio(), 6.0);
        assert_eq!(gc.knee_db(), KNEE_WIDTH_DB);
        // 12 dB over threshold at 6:1 comes out 2 dB over it
        assert!((gc.compute_output(-18.0) + 28.0).abs() < 1e-4);

        params.ratio = 2.0;
        let mut l = vec![0.0f32; BLOCK];
        let mut r = vec![0.0f32; BLOCK];
        fp.process(&mut [&mut l, &mut r], &params);
        assert!((fp.gain_computer().ratio() - 2.0).abs() < 1e-5);
        assert!((fp.gain_computer().compute_output(-18.0) + 24.0).abs() < 1e-3);
    }

    #[test]
    #[cfg(feature = "debug")]
    fn each_instance_logs_to_its_own_drain() {
        let params = scenario_params();
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let mut fp = FatPressor::new();
                fp.prepare(SR, 256, &params);
                let drain = fp.take_log_drain();
                let handle = std::thread::spawn(move || {
                    let mut l = sine(300.0, 0.5, SR, 1024);
                    let mut r = l.clone();
                    fp.process(&mut [&mut l, &mut r], &params);
                    fp
                });
                (handle, drain)
            })
            .collect();

        for (handle, drain) in workers {
            let mut fp = handle.join().unwrap();
            assert!(fp.take_log_drain().is_none());

            let mut lines = Vec::new();
            drain.unwrap().drain(|l| lines.push(l.to_owned()));
            assert_eq!(lines, ["splitting 1024 samples into 256-sample chunks"]);
        }
    }

    #[test]
    fn output_ramp_is_shared_across_channels() {
        let mut params = bypass_params();
        let mut fp = prepared(&params);

        params.output_db = 6.0;
        let mut l = vec![0.25f32; BLOCK];
        let mut r = vec![0.25f32; BLOCK];
        fp.process(&mut [&mut l, &mut r], &params);

        assert_eq!(l, r);
        // 3 ms at 48 kHz = 144 steps
        for i in 1..144 {
            assert!(l[i] > l[i - 1], "ramp not rising at {i}");
        }
        let target = 0.25 * db_to_gain(6.0);
        assert!(l[0] > 0.25 && l[0] < target);
        for &v in &l[150..] {
            assert!((v - target).abs() < 1e-6);
        }
    }

    #[test]
    fn reset_clears_state_and_meters() {
        let params = scenario_params();
        let mut fp = prepared(&params);

        let mut l = sine(100.0, 0.9, SR, BLOCK * 10);
        let mut r = l.clone();
        run_stereo(&mut fp, &mut l, &mut r, &params);
        assert!(fp.meters().get_gain_reduction() > 0.0);

        fp.reset();
        assert_eq!(fp.meters().snapshot(), Meters::new().snapshot());

        let mut sl = vec![0.0f32; BLOCK];
        let mut sr = vec![0.0f32; BLOCK];
        fp.process(&mut [&mut sl, &mut sr], &params);
        assert_eq!(fp.meters().get_gain_reduction(), 0.0);
        assert!(sl.iter().chain(sr.iter()).all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn extra_channels_are_untouched() {
        let params = scenario_params();
        let mut fp = prepared(&params);

        let mut l = sine(100.0, 0.9, SR, BLOCK);
        let mut r = l.clone();
        let mut aux = vec![0.5f32; BLOCK];
        fp.process(&mut [&mut l, &mut r, &mut aux], &params);
        assert!(aux.iter().all(|&v| v == 0.5));
    }

    #[test]
    fn out_of_range_params_are_clamped() {
        let mut params = scenario_params();
        params.ratio = 0.0;
        params.mix_percent = 250.0;
        params.output_db = f32::NAN;
        let mut fp = prepared(&params);

        let mut l = sine(100.0, 0.9, SR, BLOCK);
        let mut r = l.clone();
        fp.process(&mut [&mut l, &mut r], &params);
        assert!(l.iter().chain(r.iter()).all(|v| v.is_finite() && v.abs() < 2.0));
    }

    #[test]
    fn no_latency() {
        assert_eq!(prepared(&FatParams::default()).latency_samples(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "before prepare")]
    fn process_before_prepare_panics_in_debug() {
        let mut fp = FatPressor::new();
        let mut l = vec![0.0f32; 16];
        fp.process(&mut [&mut l], &FatParams::default());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn process_before_prepare_passes_through() {
        let mut fp = FatPressor::new();
        let input = sine(100.0, 0.5, SR, 64);
        let mut l = input.clone();
        fp.process(&mut [&mut l], &FatParams::default());
        assert_eq!(l, input);
    }
}

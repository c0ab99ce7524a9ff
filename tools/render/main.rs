use anyhow::{Context, Result};
use fatpressor::{FactoryPreset, FatParams, FatPressor};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

const BLOCK: usize = 512;

fn usage() -> ! {
    eprintln!("usage: fatpressor_render <in.wav> <out.wav> [preset-name | params.json]");
    eprintln!();
    eprintln!("factory presets:");
    for p in FactoryPreset::ALL {
        eprintln!("  {:<16} ({})", p.name(), p.category().name());
    }
    std::process::exit(2);
}

/// Preset name, JSON file, or defaults.
fn load_params(arg: Option<&str>) -> Result<FatParams> {
    let Some(arg) = arg else {
        return Ok(FatParams::default());
    };

    if let Some(preset) = FactoryPreset::from_name(arg) {
        log::info!("using factory preset '{}'", preset.name());
        return Ok(preset.params());
    }

    let path = Path::new(arg);
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("'{arg}' is neither a factory preset nor a readable file"))?;
    FatParams::from_json(&json).with_context(|| format!("failed to load '{}'", path.display()))
}

/// Read a WAV into planar f32 channels (at most two are kept).
fn read_planar(path: &Path) -> Result<(WavSpec, Vec<Vec<f32>>)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open input WAV '{}'", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        anyhow::bail!("'{}' has no channels", path.display());
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .context("failed to decode float samples")?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<Result<_, _>>()
            .context("failed to decode 16-bit samples")?,
        (format, bits) => {
            anyhow::bail!("unsupported WAV format: {format:?} {bits}-bit (need 16-bit int or 32-bit float)")
        }
    };

    let kept = channels.min(2);
    let frames = interleaved.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); kept];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, buf) in planar.iter_mut().enumerate() {
            buf.push(frame[ch]);
        }
    }
    if channels > 2 {
        log::warn!("input has {channels} channels; only the first two are rendered");
    }

    Ok((spec, planar))
}

fn write_planar(path: &Path, sample_rate: u32, planar: &[Vec<f32>]) -> Result<()> {
    let spec = WavSpec {
        channels: planar.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create output WAV '{}'", path.display()))?;

    let frames = planar.first().map_or(0, Vec::len);
    for i in 0..frames {
        for ch in planar {
            writer.write_sample(ch[i])?;
        }
    }
    writer.finalize().context("failed to finalize output WAV")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.iter().any(|a| a == "-h" || a == "--help") {
        usage();
    }
    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);
    let params = load_params(args.get(2).map(String::as_str))?;

    let (spec, mut planar) = read_planar(&input)?;
    let frames = planar.first().map_or(0, Vec::len);

    let mut fp = FatPressor::new();
    fp.prepare(f64::from(spec.sample_rate), BLOCK, &params);
    let meters = fp.meters();
    #[cfg(feature = "debug")]
    let mut log_drain = fp.take_log_drain();

    let mut max_gr = 0.0f32;
    let mut gr_sum = 0.0f64;
    let mut blocks = 0usize;

    let mut start = 0;
    while start < frames {
        let end = (start + BLOCK).min(frames);
        match planar.as_mut_slice() {
            [mono] => fp.process(&mut [&mut mono[start..end]], &params),
            [l, r, ..] => fp.process(&mut [&mut l[start..end], &mut r[start..end]], &params),
            [] => {}
        }

        let gr = meters.get_gain_reduction();
        max_gr = max_gr.max(gr);
        gr_sum += f64::from(gr);
        blocks += 1;
        start = end;

        #[cfg(feature = "debug")]
        {
            if let Some(drain) = log_drain.as_mut() {
                drain.drain_to_log();
            }
        }
    }

    write_planar(&output, spec.sample_rate, &planar)?;

    let m = meters.snapshot();
    println!("Render summary for '{}':", input.display());
    println!("  frames processed   : {}", frames);
    println!("  sample rate        : {} Hz", spec.sample_rate);
    println!(
        "  params             : thr {:.1} dB, ratio {:.1}:1, atk {:.1} ms, rel {:.0} ms, fat {:.0}%, out {:+.1} dB, mix {:.0}%",
        params.threshold_db,
        params.ratio,
        params.attack_ms,
        params.release_ms,
        params.fat_percent,
        params.output_db,
        params.mix_percent
    );
    println!("  max gain reduction : {:.2} dB", max_gr);
    println!(
        "  avg gain reduction : {:.2} dB",
        if blocks > 0 { gr_sum / blocks as f64 } else { 0.0 }
    );
    println!(
        "  last block out     : L {:.1} dB / R {:.1} dB",
        m.output_l_db, m.output_r_db
    );
    println!("  written            : {}", output.display());
    Ok(())
}

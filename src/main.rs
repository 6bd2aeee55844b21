//! e3bank - inspect and edit Emulator 3X / ESI-32 / Emulator Three banks

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use e3bank::name;
use e3bank::{Bank, BankSummary, PresetSummary, SampleSummary, WavSink, WavSource};

#[derive(Parser)]
#[command(name = "e3bank")]
#[command(about = "Inspect and edit E-mu Emulator 3X, ESI-32 and Emulator Three banks")]
#[command(version)]
struct Cli {
    /// More output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List presets, zones and samples
    Info {
        /// Bank file
        bank: PathBuf,

        /// Only this preset (zero-based slot)
        #[arg(short, long)]
        preset: Option<usize>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write every sample to a WAV file
    Extract {
        /// Bank file
        bank: PathBuf,

        /// Output directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Edit presets and zones in place
    Edit(EditArgs),

    /// Append WAV files as new samples
    AddSample {
        /// Bank file
        bank: PathBuf,

        /// 16-bit PCM WAV files, mono or stereo
        #[arg(required = true)]
        wav: Vec<PathBuf>,
    },

    /// Append a blank preset
    AddPreset {
        /// Bank file
        bank: PathBuf,

        /// Preset name
        name: String,
    },

    /// Create a bank from an empty template bank
    New {
        /// Bank name (also the file name)
        name: String,

        /// Empty bank to copy
        #[arg(short, long)]
        template: PathBuf,

        /// Output directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct EditArgs {
    /// Bank file
    bank: PathBuf,

    /// Only this preset (zero-based slot); all presets otherwise
    #[arg(short, long)]
    preset: Option<usize>,

    /// Destinations for pitch, mod, pressure, pedal, MIDI A, MIDI B,
    /// footswitch 1 and footswitch 2; empty items are left alone
    #[arg(short, long, value_name = "LIST")]
    rt_controls: Option<String>,

    /// VCA level in percent [0, 100]
    #[arg(short, long)]
    level: Option<i64>,

    /// VCF cutoff [0, 255]
    #[arg(short, long)]
    cutoff: Option<i64>,

    /// VCF Q in percent [0, 100]
    #[arg(short, long)]
    q: Option<i64>,

    /// VCF type [0, 18]
    #[arg(short, long)]
    filter: Option<i64>,

    /// LFO shape [0, 3]
    #[arg(long)]
    lfo_shape: Option<i64>,

    /// Pitch bend range in semitones [0, 36]
    #[arg(short = 'b', long)]
    pitch_bend: Option<i64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Info {
            bank,
            preset,
            json,
        } => info(&bank, preset, json),
        Commands::Extract { bank, output } => extract(&bank, output.as_deref()),
        Commands::Edit(args) => edit(&args),
        Commands::AddSample { bank, wav } => add_samples(&bank, &wav),
        Commands::AddPreset { bank, name } => {
            let mut b = open(&bank)?;
            let appended = b.append_preset(&name)?;
            b.save(&bank)
                .with_context(|| format!("Failed to save {}", bank.display()))?;
            tracing::info!("Preset {} added", appended.slot);
            Ok(())
        }
        Commands::New {
            name,
            template,
            output,
        } => {
            let dir = output.unwrap_or_else(|| PathBuf::from("."));
            let path = e3bank::create_bank(&template, &name, &dir).with_context(|| {
                format!("Failed to create bank from {}", template.display())
            })?;
            tracing::info!("Created {}", path.display());
            Ok(())
        }
    }
}

fn open(path: &Path) -> Result<Bank> {
    Bank::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn info(path: &Path, preset: Option<usize>, json: bool) -> Result<()> {
    let bank = open(path)?;
    let mut summary = bank.summary()?;
    if let Some(index) = preset {
        summary.presets.retain(|p| p.index == index);
        if summary.presets.is_empty() {
            bail!("Preset slot {} is empty", index);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &BankSummary) {
    println!("Bank: {} ({})", summary.name, summary.dialect);
    println!("Objects: {}", summary.objects);
    println!("Next: 0x{:08x}", summary.next);
    if !summary.checksum_ok {
        println!("Warning: geometry parameters inconsistent");
    }
    for preset in &summary.presets {
        print_preset(preset);
    }
    for sample in &summary.samples {
        print_sample(sample);
    }
}

fn print_preset(preset: &PresetSummary) {
    println!("Preset {:3}: {}", preset.index, preset.name);
    println!("  Pitch bend range: {}", preset.pitch_bend_range);
    for routing in &preset.rt_controls {
        println!("  {}: {}", routing.source, routing.destination);
    }
    for fs in &preset.footswitches {
        match fs.destination {
            Some(destination) => println!("  {}: {}", fs.source, destination),
            None => println!("  {}: ?", fs.source),
        }
    }
    for (i, zone) in preset.zones.iter().enumerate() {
        println!(
            "  Zone {:2}: sample {}, root {}",
            i, zone.sample_index, zone.root_note
        );
        println!("    VCA level {}%, pan {}%", zone.vca_level, zone.vca_pan);
        println!(
            "    VCF {} cutoff {} Q {}%, LFO {}",
            zone.vcf_type.name(),
            zone.vcf_cutoff,
            zone.vcf_q,
            zone.lfo_shape.name()
        );
    }
}

fn print_sample(sample: &SampleSummary) {
    println!(
        "Sample {:3}: {} ({} ch, {} frames, {} Hz, loop {}..{})",
        sample.index,
        sample.name,
        sample.channels,
        sample.frames,
        sample.sample_rate,
        sample.loop_start,
        sample.loop_end
    );
}

fn extract(path: &Path, output: Option<&Path>) -> Result<()> {
    let bank = open(path)?;
    let dir = output.unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut count = 0;
    for sample in bank.samples()? {
        let sample = sample?;
        let file = dir.join(name::to_wav_filename(&sample.name()?));
        tracing::info!("Extracting sample {} to {}", sample.index(), file.display());
        let mut sink = WavSink::new(&file);
        sample
            .extract(&mut sink)
            .with_context(|| format!("Failed to write {}", file.display()))?;
        count += 1;
    }
    tracing::info!("{} sample(s) extracted", count);
    Ok(())
}

/// Splits "1,,3" into `[Some(1), None, Some(3)]`.
fn parse_rt_controls(list: &str) -> Result<Vec<Option<i64>>> {
    list.split(',')
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                Ok(None)
            } else {
                item.parse::<i64>()
                    .map(Some)
                    .with_context(|| format!("Invalid realtime control destination '{}'", item))
            }
        })
        .collect()
}

fn edit(args: &EditArgs) -> Result<()> {
    let mut bank = open(&args.bank)?;
    let rt_controls = args
        .rt_controls
        .as_deref()
        .map(parse_rt_controls)
        .transpose()?;

    let indices: Vec<usize> = match args.preset {
        Some(index) => vec![index],
        None => bank.preset_table()?.live().map(|l| l.index).collect(),
    };

    for index in indices {
        let mut preset = match bank.preset_mut(index)? {
            Some(preset) => preset,
            None => bail!("Preset slot {} is empty", index),
        };
        tracing::debug!("Editing preset {}", index);

        if let Some(destinations) = &rt_controls {
            preset.set_rt_controls(destinations)?;
        }
        if let Some(range) = args.pitch_bend {
            preset.set_pitch_bend_range(range)?;
        }
        preset.for_each_zone(|zone| {
            if let Some(level) = args.level {
                zone.set_level(level)?;
            }
            if let Some(cutoff) = args.cutoff {
                zone.set_cutoff(cutoff)?;
            }
            if let Some(q) = args.q {
                zone.set_q(q)?;
            }
            if let Some(filter) = args.filter {
                zone.set_filter(filter)?;
            }
            if let Some(shape) = args.lfo_shape {
                zone.set_lfo_shape(shape)?;
            }
            Ok(())
        })?;
    }

    bank.save(&args.bank)
        .with_context(|| format!("Failed to save {}", args.bank.display()))
}

fn add_samples(path: &Path, wavs: &[PathBuf]) -> Result<()> {
    let mut bank = open(path)?;
    for wav in wavs {
        let mut source =
            WavSource::open(wav).with_context(|| format!("Failed to read {}", wav.display()))?;
        let appended = bank
            .append_sample(&mut source)
            .with_context(|| format!("Failed to add {}", wav.display()))?;
        tracing::debug!("Sample stored at 0x{:08x}", appended.address);
    }
    bank.save(path)
        .with_context(|| format!("Failed to save {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rt_controls() {
        assert_eq!(
            parse_rt_controls("1,,3, 10").unwrap(),
            vec![Some(1), None, Some(3), Some(10)]
        );
        assert!(parse_rt_controls("1,x").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

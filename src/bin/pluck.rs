//! CLI tool for playing a key transcription on the string bank
//!
//! Usage: pluck <input.txt> [--seed N] [--dump]
//!
//! Renders offline and prints a summary. With `--dump` the samples are
//! written to stdout one per line, for piping into an external audio sink.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use env_logger::{Builder, Env};
use karplus::generator::StringParams;
use karplus::pipeline::{BankConfig, Pipeline, PipelineConfig, StringBank};
use log::{info, LevelFilter};

/// Play a key transcription on a Karplus-Strong string bank
#[derive(Parser)]
#[command(name = "pluck")]
#[command(version)]
struct Cli {
    /// Path to transcription file
    input: PathBuf,

    /// Seed for the pluck noise (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Energy kept per tick, between 0 and 1
    #[arg(long, default_value_t = 0.996)]
    decay: f64,

    /// Length of one transcription step in milliseconds
    #[arg(long, default_value_t = 50.0)]
    step_ms: f64,

    /// Longest tail rendered after the last event, in seconds
    #[arg(long, default_value_t = 10.0)]
    max_tail: f64,

    /// Write samples to stdout, one per line
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Builder::from_env(Env::default().default_filter_or(LevelFilter::Info.to_string())).init();

    let cli = Cli::parse();

    if !(cli.step_ms >= 0.0) || !(cli.max_tail >= 0.0) {
        return Err("step and tail lengths must be non-negative".into());
    }

    let content = fs::read_to_string(&cli.input)
        .map_err(|e| format!("Error reading {}: {}", cli.input.display(), e))?;

    let bank_config = BankConfig {
        string: StringParams {
            sample_rate: cli.sample_rate,
            decay_factor: cli.decay,
        },
        ..Default::default()
    };
    let bank = match cli.seed {
        Some(seed) => StringBank::seeded(bank_config, seed)?,
        None => StringBank::new(bank_config)?,
    };

    let ticks_per_sec = cli.sample_rate as f64;
    let config = PipelineConfig {
        ticks_per_step: (cli.step_ms / 1000.0 * ticks_per_sec).round() as usize,
        max_tail_ticks: (cli.max_tail * ticks_per_sec).round() as usize,
        ..Default::default()
    };

    info!("Configuration:");
    info!("  Sample rate: {} Hz", cli.sample_rate);
    info!("  Decay factor: {}", cli.decay);
    info!("  Step: {} ticks", config.ticks_per_step);
    info!("  Frame size: {} samples", config.frame_size);

    let mut pipeline = Pipeline::from_transcription(config, bank, &content)?;
    let samples = pipeline.render()?;

    if cli.dump {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        for sample in &samples {
            writeln!(out, "{}", sample)?;
        }
        out.flush()?;
    }

    let peak = samples.iter().fold(0.0f64, |peak, s| peak.max(s.abs()));
    let rms = if samples.is_empty() {
        0.0
    } else {
        (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
    };

    info!(
        "Rendered {} samples ({:.2}s)",
        samples.len(),
        samples.len() as f64 / ticks_per_sec
    );
    info!("  Peak: {:.4}", peak);
    info!("  RMS: {:.4}", rms);

    Ok(())
}

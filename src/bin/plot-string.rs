use std::path::PathBuf;

use clap::Parser;
use karplus::generator::{GeneratorState, GuitarString, SignalGenerator, StringParams};
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const FRAME_SIZE: usize = 64;
const MAX_SECONDS: f64 = 30.0;

/// Plot a plucked string's waveform and peak envelope to SVG
#[derive(Parser)]
#[command(name = "plot-string")]
#[command(after_help = "Examples:
  plot-string 440 0.996 1.0 7 a4.svg     # concert A for one second
  plot-string 110 0.999 3.0 7 a2.svg     # low A with a long sustain")]
struct Args {
    /// String frequency in Hz
    frequency: f64,

    /// Energy kept per tick, between 0 and 1
    decay_factor: f64,

    /// Length of the plot in seconds
    seconds: f64,

    /// Seed for the pluck noise
    seed: u64,

    /// Path of the SVG to write
    output_path: PathBuf,
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let args = Args::parse();

    if !(args.seconds > 0.0 && args.seconds <= MAX_SECONDS) {
        return Err(format!("Duration must be in (0, {}] seconds", MAX_SECONDS).into());
    }

    Ok(args)
}

/// Pluck a string and record its output and the ring's peak after every frame
fn generate_string(
    args: &Args,
    params: StringParams,
) -> Result<(Vec<f64>, Vec<(usize, f64)>), Box<dyn std::error::Error>> {
    let mut string = GuitarString::from_frequency(args.frequency, params)?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    string.excite(&mut rng);

    let total_samples = (args.seconds * params.sample_rate as f64) as usize;
    let mut samples = Vec::with_capacity(total_samples);
    let mut peaks = vec![(0, string.peak())];
    let mut frame_buffer = vec![0.0f64; FRAME_SIZE];

    while samples.len() < total_samples {
        let state = string.process(&mut frame_buffer);
        samples.extend_from_slice(&frame_buffer);
        peaks.push((samples.len(), string.peak()));

        if state == GeneratorState::Silent {
            break;
        }
    }
    samples.truncate(total_samples);

    Ok((samples, peaks))
}

fn check_decay(peaks: &[(usize, f64)]) -> Result<(), Box<dyn std::error::Error>> {
    for pair in peaks.windows(2) {
        let (_, before) = pair[0];
        let (at, after) = pair[1];
        if after > before + 1e-12 {
            return Err(format!(
                "GROWTH at sample {}: peak {} -> {}",
                at, before, after
            )
            .into());
        }
    }

    let first = peaks.first().map(|p| p.1).unwrap_or(0.0);
    let last = peaks.last().map(|p| p.1).unwrap_or(0.0);
    println!("  ✓ Peak decays monotonically: {:.4} -> {:.6}", first, last);
    Ok(())
}

fn create_plot(
    args: &Args,
    params: StringParams,
    samples: &[f64],
    peaks: &[(usize, f64)],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(&args.output_path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let to_ms = |i: usize| i as f64 * 1000.0 / params.sample_rate as f64;
    let max_time = to_ms(samples.len());

    let title = format!(
        "String: f={}Hz, decay={}, capacity={}",
        args.frequency,
        args.decay_factor,
        (params.sample_rate as f64 / args.frequency).round()
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..max_time.max(1.0), -0.55f64..0.55f64)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Amplitude")
        .x_labels(10)
        .y_labels(10)
        .draw()?;

    // Draw the waveform
    chart.draw_series(LineSeries::new(
        samples.iter().enumerate().map(|(i, &s)| (to_ms(i), s)),
        BLUE.stroke_width(1),
    ))?;

    // Draw the peak envelope on both sides
    chart.draw_series(LineSeries::new(
        peaks.iter().map(|&(i, p)| (to_ms(i), p)),
        RED.stroke_width(2),
    ))?;
    chart.draw_series(LineSeries::new(
        peaks.iter().map(|&(i, p)| (to_ms(i), -p)),
        RED.stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;
    let params = StringParams {
        decay_factor: args.decay_factor,
        ..Default::default()
    };

    println!("String Plot Generator");
    println!("=====================");
    println!("  Frequency: {}Hz", args.frequency);
    println!("  Decay factor: {}", args.decay_factor);
    println!("  Duration: {}s", args.seconds);
    println!("  Seed: {}", args.seed);
    println!();

    print!("  Generating waveform... ");
    let (samples, peaks) = generate_string(&args, params)?;
    println!("done ({} samples)", samples.len());

    check_decay(&peaks)?;

    print!("  Creating plot... ");
    create_plot(&args, params, &samples, &peaks)?;
    println!("done");

    println!();
    println!("Output: {}", args.output_path.display());

    Ok(())
}

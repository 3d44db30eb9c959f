use karplus::generator::{GeneratorState, GuitarString, SignalGenerator, StringParams};
use karplus::pipeline::{BankConfig, Instrument, StringBank};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn demo_string() {
    println!("\n=== Single String Demo ===\n");

    let frequency = 220.0;
    let frame_size = 64;
    let params = StringParams::default();

    let mut string = match GuitarString::from_frequency(frequency, params) {
        Ok(string) => string,
        Err(e) => {
            eprintln!("Cannot build string: {}", e);
            return;
        }
    };

    println!("Configuration:");
    println!("  Frequency: {} Hz", frequency);
    println!("  Sample rate: {} Hz", params.sample_rate);
    println!("  Capacity: {} samples", string.capacity());
    println!("  Decay factor: {}", string.decay_factor());
    println!();

    let mut rng = StdRng::seed_from_u64(2019);
    string.excite(&mut rng);

    let mut frame_buffer = vec![0.0f64; frame_size];
    let mut frame_count = 0;

    println!("{:<8} {:<12} {:<12}", "Frame", "First", "Peak");
    println!("{}", "-".repeat(34));

    loop {
        let state = string.process(&mut frame_buffer);
        frame_count += 1;

        // Print a row roughly every 0.1s of audio
        if frame_count == 1 || frame_count % 70 == 0 || state == GeneratorState::Silent {
            println!(
                "{:<8} {:<12.5} {:<12.6}",
                frame_count,
                frame_buffer[0],
                string.peak()
            );
        }

        if state == GeneratorState::Silent {
            break;
        }
    }

    println!(
        "\nSilent after {} frames ({:.2}s)",
        frame_count,
        (frame_count * frame_size) as f64 / params.sample_rate as f64
    );
}

fn demo_bank() {
    println!("\n=== String Bank Demo ===\n");

    let mut bank = match StringBank::seeded(BankConfig::default(), 37) {
        Ok(bank) => bank,
        Err(e) => {
            eprintln!("Cannot build bank: {}", e);
            return;
        }
    };

    println!("{} strings, pitches {:?}", bank.len(), bank.pitch_range());
    for index in (0..bank.len()).step_by(12) {
        if let (Some(key), Some(frequency)) =
            (bank.layout().symbol_at(index), bank.frequency_of(index))
        {
            println!("  {:?} -> {:.2} Hz", key, frequency);
        }
    }

    // A major triad by key, then an octave by pitch
    for key in ['v', 'j', ','] {
        if let Err(e) = bank.pluck_symbol(key) {
            eprintln!("  {}", e);
        }
    }
    bank.play_pitch(-12);

    // Strict keys reject unknown symbols, pitches outside the range are ignored
    if let Err(e) = bank.pluck_symbol('A') {
        println!("  Rejected: {}", e);
    }
    bank.play_pitch(30);

    println!();
    println!("{:<10} {:<12}", "Tick", "Mix");
    for _ in 0..8 {
        for _ in 0..2205 {
            bank.advance_all();
        }
        println!("{:<10} {:<12.5}", bank.tick_count(), bank.mix_sample());
    }
}

fn main() {
    env_logger::init();

    println!("Karplus-Strong String Synthesis");
    println!("===============================");

    demo_string();
    demo_bank();

    println!("\n===============================");
    println!("All demos complete!");
}

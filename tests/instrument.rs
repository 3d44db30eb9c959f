use std::sync::Once;

use karplus::generator::{GuitarString, SignalGenerator, StringParams};
use karplus::pipeline::{
    BankConfig, BankError, Instrument, Pipeline, PipelineConfig, StringBank, KEYBOARD,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

#[test]
fn test_every_key_plucks_its_own_string() {
    init_logger();

    for (index, key) in KEYBOARD.chars().enumerate() {
        let mut bank = StringBank::seeded(BankConfig::default(), index as u64).unwrap();
        assert_eq!(bank.layout().symbol_at(index), Some(key));
        bank.pluck_symbol(key).unwrap();

        for (i, string) in bank.strings().iter().enumerate() {
            if i == index {
                assert!(string.peak() > 0.0, "key {:?} left string {} silent", key, i);
            } else {
                assert_eq!(string.peak(), 0.0, "key {:?} touched string {}", key, i);
            }
        }
    }
}

#[test]
fn test_key_and_pitch_reach_the_same_string() {
    init_logger();

    let mut by_key = StringBank::seeded(BankConfig::default(), 5).unwrap();
    let mut by_pitch = StringBank::seeded(BankConfig::default(), 5).unwrap();

    // 'v' is index 24, pitch 0
    by_key.pluck_symbol('v').unwrap();
    by_pitch.play_pitch(0);

    for _ in 0..300 {
        assert_eq!(by_key.mix_sample(), by_pitch.mix_sample());
        by_key.advance_all();
        by_pitch.advance_all();
    }
}

#[test]
fn test_strict_keys_tolerant_pitches() {
    init_logger();

    let mut bank = StringBank::seeded(BankConfig::default(), 9).unwrap();
    bank.pluck_symbol('z').unwrap();
    bank.advance_all();
    let mix = bank.mix_sample();

    assert_eq!(bank.pluck_symbol('Z'), Err(BankError::UnsupportedSymbol('Z')));
    bank.play_pitch(-25);
    bank.play_pitch(13);

    assert_eq!(bank.mix_sample(), mix);
    assert_eq!(bank.tick_count(), 1);
}

#[test]
fn test_bank_sound_dies_away() {
    init_logger();

    let mut bank = StringBank::seeded(BankConfig::default(), 21).unwrap();
    for key in ['q', 'v', ' '] {
        bank.pluck_symbol(key).unwrap();
    }

    let initial = bank.peak();
    // Four seconds at 44.1kHz, over 400 periods of the lowest string
    for _ in 0..176400 {
        bank.advance_all();
    }

    assert_eq!(bank.tick_count(), 176400);
    assert!(bank.peak() < initial * 0.2);
}

#[test]
fn test_custom_bank_matches_standalone_strings() {
    init_logger();

    let params = StringParams {
        sample_rate: 8000,
        decay_factor: 0.99,
    };
    let config = BankConfig {
        keyboard: "abc".to_string(),
        lowest_pitch: -1,
        concert_pitch: 440.0,
        string: params,
    };
    let mut bank = StringBank::with_rng(config, StdRng::seed_from_u64(4)).unwrap();

    // Tuned the same as strings built by hand
    for (i, pitch) in (-1..=1).enumerate() {
        let frequency = 440.0 * 2f64.powf(pitch as f64 / 12.0);
        let string = GuitarString::from_frequency(frequency, params).unwrap();
        assert_eq!(bank.string(i).unwrap().capacity(), string.capacity());
    }

    // Plucking with the same seed gives the same noise
    let mut reference = GuitarString::from_frequency(440.0, params).unwrap();
    reference.excite(&mut StdRng::seed_from_u64(4));
    bank.pluck_symbol('b').unwrap();

    for _ in 0..100 {
        assert_eq!(bank.mix_sample(), reference.current_sample());
        bank.advance_all();
        reference.advance();
    }
}

#[test]
fn test_render_transcription() {
    init_logger();

    let score = "\
# two plucks, then a pitch outside the range
+0| 'v' 'n'
+2| -12, 99   # 99 is ignored
+1|           # rest
+1| ' '
";
    let bank_config = BankConfig {
        string: StringParams {
            decay_factor: 0.99,
            ..Default::default()
        },
        ..Default::default()
    };
    let bank = StringBank::seeded(bank_config, 77).unwrap();
    let config = PipelineConfig {
        ticks_per_step: 100,
        frame_size: 50,
        max_tail_ticks: 1_000_000,
        ..Default::default()
    };

    let mut pipeline = Pipeline::from_transcription(config, bank, score).unwrap();
    let samples = pipeline.render().unwrap();

    // Last event lands at step 4, tick 400
    assert!(samples.len() > 400);
    assert_eq!(samples.len() % 50, 0);
    assert!(samples[0] != 0.0);

    let bank = pipeline.into_instrument();
    assert_eq!(bank.tick_count(), samples.len() as u64);
    assert!(bank.peak() < PipelineConfig::default().silence_threshold);
}

#[test]
fn test_render_rejects_unknown_key() {
    init_logger();

    let bank = StringBank::seeded(BankConfig::default(), 0).unwrap();
    let result = Pipeline::from_transcription(PipelineConfig::default(), bank, "+0| 'A'\n");
    assert!(result.is_err());
}

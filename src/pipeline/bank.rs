//! String bank for polyphonic plucked-string synthesis
//!
//! Owns one tuned string per keyboard symbol, dispatches plucks by symbol or
//! pitch, advances every string in lock-step and mixes their output.

use std::ops::RangeInclusive;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::keyboard::{KeyboardLayout, KEYBOARD};
use super::Instrument;
use crate::generator::{GuitarString, SignalGenerator, StringError, StringParams};

/// Configuration for a string bank
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// Ordered key symbols, one string per symbol, lowest pitch first
    pub keyboard: String,
    /// Pitch of the first string in semitones relative to concert A
    pub lowest_pitch: i32,
    /// Frequency of pitch 0 in Hz
    pub concert_pitch: f64,
    /// Per-string sample rate and decay
    pub string: StringParams,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            keyboard: KEYBOARD.to_string(),
            lowest_pitch: -24,
            concert_pitch: 440.0,
            string: StringParams::default(),
        }
    }
}

/// Errors raised by the string bank
#[derive(Debug, Clone, PartialEq)]
pub enum BankError {
    UnsupportedSymbol(char),
    EmptyKeyboard,
    DuplicateSymbol(char),
    InvalidString(StringError),
}

impl std::fmt::Display for BankError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BankError::UnsupportedSymbol(c) => write!(f, "Unsupported symbol: {:?}", c),
            BankError::EmptyKeyboard => write!(f, "Keyboard layout is empty"),
            BankError::DuplicateSymbol(c) => write!(f, "Duplicate keyboard symbol: {:?}", c),
            BankError::InvalidString(e) => write!(f, "Cannot tune string: {}", e),
        }
    }
}

impl std::error::Error for BankError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BankError::InvalidString(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StringError> for BankError {
    fn from(e: StringError) -> Self {
        BankError::InvalidString(e)
    }
}

/// Equal-tempered frequency `semitones` away from `concert_pitch`
pub fn pitch_frequency(concert_pitch: f64, semitones: i32) -> f64 {
    concert_pitch * 2f64.powf(semitones as f64 / 12.0)
}

/// A fixed set of tuned strings behind a keyboard layout
///
/// String `i` is tuned to pitch `lowest_pitch + i`. The random source used
/// for plucking is owned by the bank so a seeded generator makes the whole
/// instrument deterministic.
pub struct StringBank<R: Rng = StdRng> {
    strings: Vec<GuitarString>,
    layout: KeyboardLayout,
    lowest_pitch: i32,
    concert_pitch: f64,
    ticks: u64,
    rng: R,
}

impl StringBank<StdRng> {
    /// Create a bank whose plucks draw from an entropy-seeded generator
    ///
    /// # Example
    /// ```
    /// use karplus::pipeline::{BankConfig, Instrument, StringBank};
    ///
    /// let mut bank = StringBank::new(BankConfig::default()).unwrap();
    /// assert_eq!(bank.len(), 37);
    /// bank.pluck_symbol('v').unwrap(); // concert A
    /// bank.advance_all();
    /// assert_eq!(bank.tick_count(), 1);
    /// ```
    pub fn new(config: BankConfig) -> Result<Self, BankError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a bank with a deterministic generator
    pub fn seeded(config: BankConfig, seed: u64) -> Result<Self, BankError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> StringBank<R> {
    /// Create a bank that plucks with the given random source
    pub fn with_rng(config: BankConfig, rng: R) -> Result<Self, BankError> {
        let layout = KeyboardLayout::new(&config.keyboard)?;

        let strings = (0..layout.len())
            .map(|i| {
                let pitch = config.lowest_pitch + i as i32;
                let frequency = pitch_frequency(config.concert_pitch, pitch);
                GuitarString::from_frequency(frequency, config.string)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "string bank: {} strings, pitches {}..={}, {} Hz sample rate, decay {}",
            strings.len(),
            config.lowest_pitch,
            config.lowest_pitch + strings.len() as i32 - 1,
            config.string.sample_rate,
            config.string.decay_factor
        );

        Ok(Self {
            strings,
            layout,
            lowest_pitch: config.lowest_pitch,
            concert_pitch: config.concert_pitch,
            ticks: 0,
            rng,
        })
    }

    /// Number of strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Pitches accepted by `play_pitch`
    pub fn pitch_range(&self) -> RangeInclusive<i32> {
        self.lowest_pitch..=self.lowest_pitch + self.strings.len() as i32 - 1
    }

    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    pub fn string(&self, index: usize) -> Option<&GuitarString> {
        self.strings.get(index)
    }

    pub fn strings(&self) -> &[GuitarString] {
        &self.strings
    }

    /// Nominal frequency of string `index`
    ///
    /// The sounding pitch is quantized by the integer buffer capacity.
    pub fn frequency_of(&self, index: usize) -> Option<f64> {
        (index < self.strings.len())
            .then(|| pitch_frequency(self.concert_pitch, self.lowest_pitch + index as i32))
    }

    /// Silence every string; the tick counter keeps counting
    pub fn reset(&mut self) {
        for string in self.strings.iter_mut() {
            string.mute();
        }
    }

    fn pitch_index(&self, pitch: i32) -> Option<usize> {
        if self.pitch_range().contains(&pitch) {
            Some((pitch - self.lowest_pitch) as usize)
        } else {
            None
        }
    }
}

impl<R: Rng> Instrument for StringBank<R> {
    fn has_symbol(&self, symbol: char) -> bool {
        self.layout.contains(symbol)
    }

    fn pluck_symbol(&mut self, symbol: char) -> Result<(), BankError> {
        let index = self
            .layout
            .index_of(symbol)
            .ok_or(BankError::UnsupportedSymbol(symbol))?;

        trace!("pluck {:?} -> string {}", symbol, index);
        self.strings[index].excite(&mut self.rng);
        Ok(())
    }

    fn has_pitch(&self, pitch: i32) -> bool {
        self.pitch_range().contains(&pitch)
    }

    fn play_pitch(&mut self, pitch: i32) {
        if let Some(index) = self.pitch_index(pitch) {
            trace!("play pitch {} -> string {}", pitch, index);
            self.strings[index].excite(&mut self.rng);
        }
    }

    fn mix_sample(&self) -> f64 {
        self.strings.iter().map(|s| s.current_sample()).sum()
    }

    fn advance_all(&mut self) {
        for string in self.strings.iter_mut() {
            string.advance();
        }
        self.ticks += 1;
    }

    fn tick_count(&self) -> u64 {
        self.ticks
    }

    fn peak(&self) -> f64 {
        self.strings.iter().fold(0.0f64, |peak, s| peak.max(s.peak()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_bank() -> StringBank {
        StringBank::seeded(BankConfig::default(), 1234).unwrap()
    }

    fn three_string_bank() -> StringBank {
        let config = BankConfig {
            keyboard: "abc".to_string(),
            lowest_pitch: -1,
            ..Default::default()
        };
        StringBank::seeded(config, 99).unwrap()
    }

    fn excited(bank: &StringBank) -> Vec<usize> {
        bank.strings()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.peak() > 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_reference_tuning() {
        let bank = reference_bank();
        assert_eq!(bank.len(), 37);
        assert_eq!(bank.pitch_range(), -24..=12);
        assert_eq!(bank.tick_count(), 0);

        // Index 24 is concert A
        assert!((bank.frequency_of(24).unwrap() - 440.0).abs() < 1e-9);
        assert_eq!(bank.string(24).unwrap().capacity(), 100);

        // Two octaves down: 44100 / 110 = 400.9
        assert!((bank.frequency_of(0).unwrap() - 110.0).abs() < 1e-9);
        assert_eq!(bank.string(0).unwrap().capacity(), 401);

        // One octave up: 44100 / 880 = 50.1
        assert!((bank.frequency_of(36).unwrap() - 880.0).abs() < 1e-9);
        assert_eq!(bank.string(36).unwrap().capacity(), 50);

        assert_eq!(bank.frequency_of(37), None);
        assert!(bank.string(37).is_none());
    }

    #[test]
    fn test_starts_silent() {
        let bank = reference_bank();
        assert_eq!(bank.mix_sample(), 0.0);
        assert_eq!(bank.peak(), 0.0);
    }

    #[test]
    fn test_has_symbol() {
        let bank = reference_bank();
        for c in KEYBOARD.chars() {
            assert!(bank.has_symbol(c), "expected {:?} to be a key", c);
        }
        for c in ['Q', 'W', 'V', 'a', '1', '3', '\t', '\n', '"', ']'] {
            assert!(!bank.has_symbol(c), "expected {:?} not to be a key", c);
        }
    }

    #[test]
    fn test_has_pitch() {
        let bank = reference_bank();
        assert!(bank.has_pitch(-24));
        assert!(bank.has_pitch(0));
        assert!(bank.has_pitch(12));
        assert!(!bank.has_pitch(-25));
        assert!(!bank.has_pitch(13));
    }

    #[test]
    fn test_pluck_symbol() {
        let mut bank = reference_bank();
        bank.pluck_symbol('v').unwrap();
        assert_eq!(excited(&bank), vec![24]);

        bank.pluck_symbol(' ').unwrap();
        assert_eq!(excited(&bank), vec![24, 36]);
    }

    #[test]
    fn test_pluck_unsupported_symbol() {
        let mut bank = reference_bank();
        bank.pluck_symbol('q').unwrap();
        let before = bank.mix_sample();
        let ring_before: Vec<f64> = bank.string(0).unwrap().samples().collect();

        let result = bank.pluck_symbol('Q');
        assert_eq!(result, Err(BankError::UnsupportedSymbol('Q')));

        assert_eq!(bank.mix_sample(), before);
        assert_eq!(excited(&bank), vec![0]);
        assert!(bank.string(0).unwrap().samples().eq(ring_before.into_iter()));
    }

    #[test]
    fn test_play_pitch() {
        let mut bank = reference_bank();
        bank.play_pitch(0);
        assert_eq!(excited(&bank), vec![24]);

        bank.play_pitch(-24);
        bank.play_pitch(12);
        assert_eq!(excited(&bank), vec![0, 24, 36]);
    }

    #[test]
    fn test_play_pitch_out_of_range_is_ignored() {
        let mut bank = reference_bank();
        for pitch in [-25, 13, 100, i32::MIN, i32::MAX] {
            bank.play_pitch(pitch);
        }
        assert!(excited(&bank).is_empty());
        assert_eq!(bank.mix_sample(), 0.0);
        assert_eq!(bank.tick_count(), 0);
    }

    #[test]
    fn test_advance_all_counts_ticks() {
        let mut bank = reference_bank();
        bank.pluck_symbol('z').unwrap();
        for expected in 1..=500u64 {
            bank.advance_all();
            assert_eq!(bank.tick_count(), expected);
        }
    }

    #[test]
    fn test_mix_is_unnormalized_sum() {
        let mut bank = reference_bank();
        for c in ['q', 'v', 'k', ' '] {
            bank.pluck_symbol(c).unwrap();
        }

        for _ in 0..200 {
            let expected: f64 = bank.strings().iter().map(|s| s.current_sample()).sum();
            assert_eq!(bank.mix_sample(), expected);
            bank.advance_all();
        }
    }

    #[test]
    fn test_three_string_end_to_end() {
        let mut bank = three_string_bank();
        assert_eq!(bank.pitch_range(), -1..=1);
        assert_eq!(bank.mix_sample(), 0.0);

        bank.play_pitch(0);
        bank.advance_all();

        let low = bank.string(0).unwrap().current_sample();
        let middle = bank.string(1).unwrap().current_sample();
        let high = bank.string(2).unwrap().current_sample();

        assert_eq!(low, 0.0);
        assert_eq!(high, 0.0);
        assert!(bank.string(1).unwrap().peak() > 0.0);
        assert_eq!(bank.mix_sample(), low + middle + high);
        assert_eq!(bank.mix_sample(), middle);
        assert_eq!(bank.tick_count(), 1);
    }

    #[test]
    fn test_seeded_banks_agree() {
        let mut first = reference_bank();
        let mut second = reference_bank();

        for bank in [&mut first, &mut second] {
            bank.pluck_symbol('e').unwrap();
            bank.play_pitch(-3);
        }

        for _ in 0..1000 {
            assert_eq!(first.mix_sample(), second.mix_sample());
            first.advance_all();
            second.advance_all();
        }
    }

    #[test]
    fn test_reset() {
        let mut bank = reference_bank();
        bank.pluck_symbol('v').unwrap();
        bank.advance_all();

        bank.reset();

        assert_eq!(bank.peak(), 0.0);
        assert_eq!(bank.mix_sample(), 0.0);
        assert_eq!(bank.tick_count(), 1);
    }

    #[test]
    fn test_invalid_configs() {
        let config = BankConfig {
            keyboard: String::new(),
            ..Default::default()
        };
        assert_eq!(
            StringBank::seeded(config, 0).err(),
            Some(BankError::EmptyKeyboard)
        );

        let config = BankConfig {
            keyboard: "aa".to_string(),
            ..Default::default()
        };
        assert_eq!(
            StringBank::seeded(config, 0).err(),
            Some(BankError::DuplicateSymbol('a'))
        );

        // Pitch 95 is above 100 kHz, far too short a ring at 44.1 kHz
        let config = BankConfig {
            keyboard: "ab".to_string(),
            lowest_pitch: 95,
            ..Default::default()
        };
        assert!(matches!(
            StringBank::seeded(config, 0),
            Err(BankError::InvalidString(_))
        ));

        // 400 semitones down is far below 1 Hz, too long a ring to allocate
        let config = BankConfig {
            lowest_pitch: -400,
            ..Default::default()
        };
        assert!(matches!(
            StringBank::seeded(config, 0),
            Err(BankError::InvalidString(_))
        ));

        let config = BankConfig {
            concert_pitch: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            StringBank::seeded(config, 0),
            Err(BankError::InvalidString(_))
        ));
    }
}

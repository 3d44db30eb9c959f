//! Instrument and performance pipeline
//!
//! - Keyboard: symbol lookup for the string bank
//! - Bank: polyphonic set of tuned strings
//! - Parser: text score of key and pitch events
//! - Scheduler: offline driver that turns a score into samples

pub mod bank;
pub mod keyboard;
pub mod parser;
pub mod scheduler;

pub use bank::{BankConfig, BankError, StringBank};
pub use keyboard::{KeyboardLayout, KEYBOARD};
pub use parser::{parse_transcription, Event, ParseError, TimedEvents};
pub use scheduler::{Pipeline, PipelineConfig, PipelineError};

/// A playable instrument driven one tick at a time
///
/// Symbols are plucked strictly (unknown symbols are an error) while pitches
/// are played tolerantly (out-of-range pitches are ignored).
pub trait Instrument {
    /// Whether `symbol` is bound to a string (exact, case-sensitive)
    fn has_symbol(&self, symbol: char) -> bool;

    /// Pluck the string bound to `symbol`
    ///
    /// # Errors
    /// `BankError::UnsupportedSymbol` if `has_symbol(symbol)` is false. No
    /// string is touched in that case.
    fn pluck_symbol(&mut self, symbol: char) -> Result<(), BankError>;

    /// Whether a string is tuned to `pitch`
    fn has_pitch(&self, pitch: i32) -> bool;

    /// Pluck the string tuned to `pitch` semitones from concert A
    ///
    /// Does nothing if `pitch` is outside the instrument's range.
    fn play_pitch(&mut self, pitch: i32);

    /// Sum of every string's current sample, not normalized
    fn mix_sample(&self) -> f64;

    /// Advance every string by one tick and bump the tick counter
    fn advance_all(&mut self);

    /// Number of `advance_all` calls so far
    fn tick_count(&self) -> u64;

    /// Largest absolute sample held by any string
    fn peak(&self) -> f64;
}

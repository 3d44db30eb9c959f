pub mod string;

pub use string::{GuitarString, StringError, StringParams, MAX_CAPACITY};

/// Peak magnitude below which a buffer is considered silent
pub const SILENCE_THRESHOLD: f64 = 1e-4;

/// Represents the current state of a signal generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Generator still holds audible energy
    Ringing,
    /// Every sample the generator holds is below [`SILENCE_THRESHOLD`]
    Silent,
}

/// Core trait for tick-driven signal generators
///
/// A generator exposes one sample at a time and moves forward by one
/// discrete step on each `advance()`. Reading never mutates.
pub trait SignalGenerator {
    /// The sample the generator outputs at the current tick
    fn current_sample(&self) -> f64;

    /// Move the generator forward by one tick
    fn advance(&mut self);

    /// Largest absolute value still held by the generator
    fn peak(&self) -> f64;

    /// Fill a frame of samples, reading then advancing once per slot
    ///
    /// # Returns
    /// * `GeneratorState::Ringing` if the generator still holds energy after the frame
    /// * `GeneratorState::Silent` once its peak has dropped below [`SILENCE_THRESHOLD`]
    fn process(&mut self, buffer: &mut [f64]) -> GeneratorState {
        for sample in buffer.iter_mut() {
            *sample = self.current_sample();
            self.advance();
        }

        if self.peak() < SILENCE_THRESHOLD {
            GeneratorState::Silent
        } else {
            GeneratorState::Ringing
        }
    }
}

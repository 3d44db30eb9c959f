//! Scheduler and Pipeline orchestrator
//!
//! Drives an instrument from a parsed transcription. Events are applied at
//! exact tick offsets; every tick reads one mixed sample and then advances
//! the instrument. This is an offline pull loop, not a real-time clock.

use log::{debug, warn};

use crate::generator::SILENCE_THRESHOLD;
use crate::pipeline::bank::BankError;
use crate::pipeline::parser::{parse_transcription, Event, ParseError, TimedEvents};
use crate::pipeline::Instrument;

/// Configuration for the performance pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of samples per frame
    pub frame_size: usize,
    /// Number of ticks per transcription step
    pub ticks_per_step: usize,
    /// Peak below which the instrument counts as silent
    pub silence_threshold: f64,
    /// Upper bound on ticks rendered after the last event
    pub max_tail_ticks: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_size: 64,
            ticks_per_step: 2205, // 50ms at 44.1kHz
            silence_threshold: SILENCE_THRESHOLD,
            max_tail_ticks: 441000, // 10s at 44.1kHz
        }
    }
}

/// Errors raised while building or running a pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Parse(ParseError),
    Bank(BankError),
    InvalidConfig(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Parse(e) => write!(f, "Parse error: {}", e),
            PipelineError::Bank(e) => write!(f, "Instrument error: {}", e),
            PipelineError::InvalidConfig(s) => write!(f, "Invalid pipeline config: {}", s),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Parse(e) => Some(e),
            PipelineError::Bank(e) => Some(e),
            PipelineError::InvalidConfig(_) => None,
        }
    }
}

impl From<ParseError> for PipelineError {
    fn from(e: ParseError) -> Self {
        PipelineError::Parse(e)
    }
}

impl From<BankError> for PipelineError {
    fn from(e: BankError) -> Self {
        PipelineError::Bank(e)
    }
}

/// Pipeline for playing a transcription on an instrument
pub struct Pipeline<I: Instrument> {
    config: PipelineConfig,
    instrument: I,
    events: Vec<TimedEvents>,
    /// Current event index
    event_index: usize,
    /// Ticks until next event
    ticks_to_next_event: usize,
    /// Whether there are more events to process
    has_more_events: bool,
    /// Ticks rendered since the last event was applied
    tail_ticks: usize,
}

impl<I: Instrument> Pipeline<I> {
    /// Create a new pipeline
    ///
    /// # Arguments
    /// * `config` - Pipeline configuration
    /// * `instrument` - Instrument to play, usually a fresh `StringBank`
    /// * `events` - Parsed events in chronological order
    ///
    /// # Errors
    /// Every key event is checked against the instrument up front, so an
    /// unknown symbol fails here with `BankError::UnsupportedSymbol`.
    pub fn new(
        config: PipelineConfig,
        instrument: I,
        events: Vec<TimedEvents>,
    ) -> Result<Self, PipelineError> {
        if config.frame_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "frame size must be at least 1".to_string(),
            ));
        }

        for event in events.iter().flat_map(|timed| timed.events.iter()) {
            if let Event::Key(symbol) = *event {
                if !instrument.has_symbol(symbol) {
                    return Err(BankError::UnsupportedSymbol(symbol).into());
                }
            }
        }

        let has_more_events = !events.is_empty();
        let ticks_to_next_event = if has_more_events {
            events[0].delta.saturating_mul(config.ticks_per_step)
        } else {
            0
        };

        debug!(
            "pipeline: {} event groups, {} ticks per step",
            events.len(),
            config.ticks_per_step
        );

        Ok(Self {
            config,
            instrument,
            events,
            event_index: 0,
            ticks_to_next_event,
            has_more_events,
            tail_ticks: 0,
        })
    }

    /// Parse a transcription and create a pipeline for it
    pub fn from_transcription(
        config: PipelineConfig,
        instrument: I,
        text: &str,
    ) -> Result<Self, PipelineError> {
        let events = parse_transcription(text)?;
        Self::new(config, instrument, events)
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    pub fn into_instrument(self) -> I {
        self.instrument
    }

    /// Check if there are more events or the instrument is still ringing
    pub fn is_active(&self) -> bool {
        self.has_more_events
            || (self.tail_ticks < self.config.max_tail_ticks
                && self.instrument.peak() >= self.config.silence_threshold)
    }

    fn apply(&mut self, event: Event) -> Result<(), BankError> {
        match event {
            Event::Key(symbol) => self.instrument.pluck_symbol(symbol),
            Event::Pitch(pitch) => {
                if !self.instrument.has_pitch(pitch) {
                    warn!("pitch {} is outside the instrument's range, ignored", pitch);
                }
                self.instrument.play_pitch(pitch);
                Ok(())
            }
        }
    }

    /// Process pending events at the current tick
    fn process_events(&mut self) -> Result<(), BankError> {
        while self.has_more_events && self.ticks_to_next_event == 0 {
            // Process all events at this step
            let events = std::mem::take(&mut self.events[self.event_index].events);
            for event in events {
                self.apply(event)?;
            }

            // Move to next event
            self.event_index += 1;
            self.tail_ticks = 0;

            if self.event_index >= self.events.len() {
                self.has_more_events = false;
            } else {
                self.ticks_to_next_event = self.events[self.event_index]
                    .delta
                    .saturating_mul(self.config.ticks_per_step);
            }
        }
        Ok(())
    }

    fn advance_time(&mut self) {
        if self.has_more_events {
            self.ticks_to_next_event = self.ticks_to_next_event.saturating_sub(1);
        } else {
            self.tail_ticks += 1;
        }
    }

    /// Process one frame of audio
    ///
    /// Each slot applies any events due at that tick, reads the mixed
    /// sample, then advances the instrument by one tick.
    pub fn process_frame(&mut self, buffer: &mut [f64]) -> Result<(), PipelineError> {
        for sample in buffer.iter_mut() {
            self.process_events()?;
            *sample = self.instrument.mix_sample();
            self.instrument.advance_all();
            self.advance_time();
        }
        Ok(())
    }

    /// Render the whole transcription
    ///
    /// Runs until every event has been applied and the instrument has decayed
    /// below the silence threshold, or `max_tail_ticks` have elapsed since the
    /// last event. The output length is a multiple of the frame size.
    pub fn render(&mut self) -> Result<Vec<f64>, PipelineError> {
        let mut samples = Vec::new();
        let mut frame_buffer = vec![0.0f64; self.config.frame_size];

        while self.is_active() {
            self.process_frame(&mut frame_buffer)?;
            samples.extend_from_slice(&frame_buffer);
        }

        debug!(
            "rendered {} samples over {} ticks",
            samples.len(),
            self.instrument.tick_count()
        );
        Ok(samples)
    }
}

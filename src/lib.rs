//! Plucked-string synthesis with the Karplus-Strong algorithm
//!
//! - [`generator`]: a single ring-buffer string and the tick-driven generator trait
//! - [`pipeline`]: the keyboard-mapped string bank and an offline score driver

pub mod generator;
pub mod pipeline;

pub use generator::{GeneratorState, GuitarString, SignalGenerator, StringError, StringParams};
pub use pipeline::{BankConfig, BankError, Instrument, StringBank};

use super::SignalGenerator;
use rand::Rng;

/// Longest ring a string may hold, about 24 s of delay at 44.1 kHz
pub const MAX_CAPACITY: usize = 1 << 20;

/// Parameters shared by every string of an instrument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringParams {
    /// Sample rate in Hz, only used to derive buffer capacity from frequency
    pub sample_rate: u32,
    /// Energy kept per tick (0 < decay_factor < 1, closer to 1 sustains longer)
    pub decay_factor: f64,
}

impl Default for StringParams {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            decay_factor: 0.996,
        }
    }
}

impl StringParams {
    fn validate(&self) -> Result<(), StringError> {
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(StringError::InvalidParameter(format!(
                "decay factor must lie in (0, 1), got {}",
                self.decay_factor
            )));
        }
        Ok(())
    }
}

/// Errors raised while constructing a string
#[derive(Debug, Clone, PartialEq)]
pub enum StringError {
    InvalidParameter(String),
}

impl std::fmt::Display for StringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StringError::InvalidParameter(s) => write!(f, "Invalid parameter: {}", s),
        }
    }
}

impl std::error::Error for StringError {}

/// A single vibrating string simulated with the Karplus-Strong algorithm
///
/// The string is a fixed-length ring of samples, oldest first. Each tick
/// drops the oldest sample and appends the decayed average of the two oldest
/// samples at the tail, which low-passes the initial noise burst and makes
/// it die away exponentially.
///
/// The ring is stored as a flat `Vec<f64>` with a moving head index, so a
/// tick is O(1) and never allocates.
#[derive(Debug, Clone)]
pub struct GuitarString {
    buffer: Vec<f64>,
    /// Index of the oldest sample
    head: usize,
    decay_factor: f64,
}

impl GuitarString {
    /// Create a silent string tuned to `frequency`
    ///
    /// Capacity is `round(sample_rate / frequency)`.
    ///
    /// # Errors
    /// `StringError::InvalidParameter` if the frequency is not a positive
    /// finite number, the derived capacity is below 2 or above
    /// [`MAX_CAPACITY`], or the decay factor is outside (0, 1).
    ///
    /// # Example
    /// ```
    /// use karplus::generator::{GuitarString, StringParams};
    ///
    /// let string = GuitarString::from_frequency(440.0, StringParams::default()).unwrap();
    /// assert_eq!(string.capacity(), 100); // round(44100 / 440)
    /// ```
    pub fn from_frequency(frequency: f64, params: StringParams) -> Result<Self, StringError> {
        if !(frequency > 0.0) || !frequency.is_finite() {
            return Err(StringError::InvalidParameter(format!(
                "frequency must be positive, got {}",
                frequency
            )));
        }
        params.validate()?;

        let capacity = (params.sample_rate as f64 / frequency).round();
        if !capacity.is_finite() || capacity < 2.0 {
            return Err(StringError::InvalidParameter(format!(
                "{} Hz at {} Hz sample rate gives capacity {}, need at least 2",
                frequency, params.sample_rate, capacity
            )));
        }
        if capacity > MAX_CAPACITY as f64 {
            return Err(StringError::InvalidParameter(format!(
                "{} Hz at {} Hz sample rate gives capacity {}, limit is {}",
                frequency, params.sample_rate, capacity, MAX_CAPACITY
            )));
        }

        Ok(Self {
            buffer: vec![0.0; capacity as usize],
            head: 0,
            decay_factor: params.decay_factor,
        })
    }

    /// Create a string whose ring holds `seed` in order, oldest first
    ///
    /// Capacity equals the seed length; the sample rate is not consulted.
    pub fn from_seed(seed: &[f64], params: StringParams) -> Result<Self, StringError> {
        if seed.len() < 2 {
            return Err(StringError::InvalidParameter(format!(
                "seed needs at least 2 samples, got {}",
                seed.len()
            )));
        }
        params.validate()?;

        Ok(Self {
            buffer: seed.to_vec(),
            head: 0,
            decay_factor: params.decay_factor,
        })
    }

    /// Pluck the string: replace every sample with uniform noise in [-0.5, 0.5)
    pub fn excite<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for sample in self.buffer.iter_mut() {
            *sample = rng.gen_range(-0.5..0.5);
        }
    }

    /// Number of samples in the ring
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn decay_factor(&self) -> f64 {
        self.decay_factor
    }

    /// Iterate over the ring from oldest to newest sample
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        let (newer, older) = self.buffer.split_at(self.head);
        older.iter().chain(newer.iter()).copied()
    }

    /// Silence the string without changing its tuning
    pub fn mute(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.head = 0;
    }
}

impl SignalGenerator for GuitarString {
    fn current_sample(&self) -> f64 {
        self.buffer[self.head]
    }

    fn advance(&mut self) {
        let capacity = self.buffer.len();
        let next = (self.head + 1) % capacity;
        let first = self.buffer[self.head];
        let second = self.buffer[next];

        // The slot freed by the oldest sample becomes the new tail
        self.buffer[self.head] = (first + second) / 2.0 * self.decay_factor;
        self.head = next;
    }

    fn peak(&self) -> f64 {
        self.buffer.iter().fold(0.0f64, |peak, s| peak.max(s.abs()))
    }
}

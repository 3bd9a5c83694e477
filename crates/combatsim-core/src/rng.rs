//! Deterministic random number service
//!
//! Uses a simple xorshift64 algorithm for reproducibility across platforms.
//! The same seed, rotation and static data always produce the same combat log.

use serde::{Deserialize, Serialize};

/// Source of uniform randoms for probabilistic rules (crit, proc, variance)
///
/// Every roll advances internal generator state; there is no I/O.
pub trait RandomSource {
    /// Generate a float in range [0, 1)
    fn next_float(&mut self) -> f64;

    /// Generate an integer in range [min, max] (inclusive)
    fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f64;
        let offset = (self.next_float() * span) as i64;
        min + offset.min(max - min)
    }

    /// Generate a bool with the given probability of `true` (0.0..=1.0)
    fn next_bool(&mut self, probability: f64) -> bool {
        self.next_float() < probability
    }
}

/// A deterministic random number generator
///
/// Uses xorshift64 for simplicity and reproducibility.
/// Never use thread-local or OS randomness in simulation logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRng {
    state: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        // Ensure non-zero state (xorshift requires this)
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Create an RNG from a saved state
    pub fn from_state(state: u64) -> Self {
        Self::new(state)
    }

    /// Get the current state (useful for saving/loading)
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Generate the next raw u64 value
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate a random f64 in range [min, max)
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_float() * (max - min)
    }
}

impl RandomSource for GameRng {
    fn next_float(&mut self) -> f64 {
        // 53 significant bits keep the result strictly below 1.0
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let range = (max - min) as u64 + 1;
        min + (self.next_u64() % range) as i64
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(12345)
    }
}

/// Replays a fixed sequence of floats, cycling when exhausted
///
/// Used to force outcomes (a guaranteed crit, a failed proc) when replaying
/// a recorded run or pinning down a single rule.
#[derive(Debug, Clone)]
pub struct SequenceRng {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRng {
    /// Create a sequence source; an empty list always yields 0.0
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values
            .into()
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { values, cursor: 0 }
    }

    /// A source that always rolls the same value
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// How many values have been consumed so far
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRng {
    fn next_float(&mut self) -> f64 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

/// Derive a per-iteration seed from a base seed and an iteration id
///
/// splitmix64 finalizer: stable across platforms and independent of which
/// worker runs the iteration.
pub fn derive_seed(base_seed: u64, stream: u64) -> u64 {
    let mut z = base_seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

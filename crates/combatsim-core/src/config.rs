//! Simulation configuration
//!
//! Every field has a serde default so encounter files only need to name the
//! values they override.

use crate::SimTime;
use serde::{Deserialize, Serialize};

/// Per-simulation tuning knobs
///
/// # Example
///
/// ```
/// use combatsim_core::SimConfig;
///
/// let config = SimConfig::default().with_duration(60_000).with_seed(7);
/// assert_eq!(config.duration_ms, 60_000);
/// assert_eq!(config.gcd_ms, 1_500);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Encounter length
    pub duration_ms: SimTime,
    /// Upper bound on how far the clock jumps when nothing is scheduled
    pub tick_ms: SimTime,
    /// Cascaded events allowed at one clock value before the run fails
    pub max_cascade_per_tick: usize,
    /// Multiplier applied once to critical damage and healing
    pub crit_multiplier: f64,
    /// Unhasted global cooldown
    pub gcd_ms: SimTime,
    /// Floor for the hasted global cooldown
    pub min_gcd_ms: SimTime,
    /// Interval of natural resource regeneration ticks
    pub regen_tick_ms: SimTime,
    /// Fraction of an aura's base duration carried over by a pandemic refresh
    pub pandemic_ratio: f64,
    /// Seed for the run's random source
    pub seed: u64,
    /// Keep the full event log in the report
    pub record_log: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration_ms: 300_000,
            tick_ms: 100,
            max_cascade_per_tick: 1_000,
            crit_multiplier: 2.0,
            gcd_ms: 1_500,
            min_gcd_ms: 750,
            regen_tick_ms: 1_000,
            pandemic_ratio: 0.3,
            seed: 12345,
            record_log: true,
        }
    }
}

impl SimConfig {
    /// Builder: set the encounter length
    pub fn with_duration(mut self, duration_ms: SimTime) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Builder: set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder: set the cascade limit
    pub fn with_cascade_limit(mut self, limit: usize) -> Self {
        self.max_cascade_per_tick = limit;
        self
    }

    /// Builder: toggle event log recording
    pub fn with_log(mut self, record: bool) -> Self {
        self.record_log = record;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.duration_ms, 300_000);
        assert_eq!(config.max_cascade_per_tick, 1_000);
        assert_eq!(config.pandemic_ratio, 0.3);
        assert!(config.record_log);
    }

    #[test]
    fn test_partial_ron() {
        let config: SimConfig = ron::from_str("(duration_ms: 5000, crit_multiplier: 1.5)").unwrap();
        assert_eq!(config.duration_ms, 5000);
        assert_eq!(config.crit_multiplier, 1.5);
        assert_eq!(config.tick_ms, 100);
    }
}

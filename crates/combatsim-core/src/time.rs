//! Virtual time for the simulation
//!
//! - `SimTime` - milliseconds since encounter start
//! - `Clock` - the simulation clock, owned by the sim driver

use serde::{Deserialize, Serialize};
use std::fmt;

/// Virtual time in milliseconds from encounter start
pub type SimTime = u64;

/// Convert seconds to `SimTime`, rounding to the nearest millisecond
pub fn from_secs(secs: f64) -> SimTime {
    (secs.max(0.0) * 1000.0).round() as SimTime
}

/// Convert `SimTime` to fractional seconds
pub fn as_secs(t: SimTime) -> f64 {
    t as f64 / 1000.0
}

/// Scale a duration by a haste percentage (`20.0` = 20% haste)
pub fn hasted(duration: SimTime, haste_pct: f64) -> SimTime {
    if haste_pct <= 0.0 {
        return duration;
    }
    (duration as f64 / (1.0 + haste_pct / 100.0)).round() as SimTime
}

/// Simulation clock state
///
/// Only moves forward. The sim driver advances it between event-processing
/// batches; handlers never observe it moving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    now: SimTime,
}

impl Clock {
    /// Create a clock at encounter start
    pub fn new() -> Self {
        Self { now: 0 }
    }

    /// Current time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Move the clock forward to `t`
    ///
    /// Returns false (and leaves the clock untouched) when `t` is in the past.
    pub fn advance_to(&mut self, t: SimTime) -> bool {
        if t < self.now {
            return false;
        }
        self.now = t;
        true
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", as_secs(self.now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_monotonic() {
        let mut clock = Clock::new();
        assert_eq!(clock.now(), 0);

        assert!(clock.advance_to(1500));
        assert_eq!(clock.now(), 1500);

        assert!(!clock.advance_to(1000));
        assert_eq!(clock.now(), 1500);

        assert!(clock.advance_to(1500));
        assert_eq!(clock.to_string(), "1.500s");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(from_secs(1.5), 1500);
        assert_eq!(from_secs(-2.0), 0);
        assert_eq!(as_secs(2500), 2.5);
    }

    #[test]
    fn test_hasted() {
        assert_eq!(hasted(1500, 0.0), 1500);
        assert_eq!(hasted(1500, 50.0), 1000);
        assert_eq!(hasted(2000, 100.0), 1000);
    }
}

//! Error types for combatsim-core

use crate::{ItemId, SimTime, SpellId, Subevent, UnitId};
use thiserror::Error;

/// Core error type
///
/// Cast validation failures are not errors: they are reported as
/// `SPELL_CAST_FAILED` events. Everything here either aborts the iteration
/// (see [`Error::is_fatal`]) or is recorded as a recovered handler fault.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown spell: {0}")]
    UnknownSpell(SpellId),

    #[error("Unknown aura: {0}")]
    UnknownAura(SpellId),

    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),

    #[error("Event storm: more than {limit} cascaded events at t={at}ms")]
    EventStorm { at: SimTime, limit: usize },

    #[error("Cannot schedule event at t={due}ms, clock is already at t={now}ms")]
    ScheduleInPast { now: SimTime, due: SimTime },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Handler '{handler}' failed on {subevent}: {message}")]
    HandlerFault {
        handler: String,
        subevent: Subevent,
        message: String,
    },

    #[error("Handler failure: {0}")]
    Handler(String),

    #[error("No rotation set")]
    NoRotation,

    #[error("Simulation already finished")]
    AlreadyFinished,
}

impl Error {
    /// Whether this error aborts the current iteration regardless of the
    /// criticality of the handler that raised it
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Handler(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::UnknownSpell(SpellId(1)).is_fatal());
        assert!(Error::EventStorm { at: 0, limit: 10 }.is_fatal());
        assert!(Error::InvariantViolation("x".into()).is_fatal());
        assert!(!Error::Handler("recoverable".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = Error::ScheduleInPast { now: 500, due: 100 };
        assert_eq!(
            err.to_string(),
            "Cannot schedule event at t=100ms, clock is already at t=500ms"
        );
    }
}

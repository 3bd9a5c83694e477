//! Run status and per-iteration report

use crate::{CombatLogEvent, HandlerFault, ResourceKind, SimTime, SpellId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a completed run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    DurationElapsed,
    TargetDied,
}

/// Lifecycle of one simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimStatus {
    Idle,
    Running,
    Completed(EndReason),
    Aborted(String),
}

impl SimStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, SimStatus::Completed(_) | SimStatus::Aborted(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SimStatus::Completed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, SimStatus::Aborted(_))
    }
}

impl fmt::Display for SimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimStatus::Idle => f.write_str("idle"),
            SimStatus::Running => f.write_str("running"),
            SimStatus::Completed(EndReason::DurationElapsed) => f.write_str("completed"),
            SimStatus::Completed(EndReason::TargetDied) => f.write_str("completed (target died)"),
            SimStatus::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// Per-spell totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellBreakdown {
    pub spell: SpellId,
    pub name: String,
    pub casts: u32,
    pub damage: f64,
}

/// Everything a finished (or aborted) run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub status: SimStatus,
    pub duration_ms: SimTime,
    pub total_damage: f64,
    pub total_healing: f64,
    pub dps: f64,
    pub casts: u32,
    pub failed_casts: u32,
    pub spells: Vec<SpellBreakdown>,
    pub resource_spent: IndexMap<ResourceKind, f64>,
    /// At least one handler fault was recovered
    pub degraded: bool,
    pub faults: Vec<HandlerFault>,
    pub error: Option<String>,
    pub log: Vec<CombatLogEvent>,
}

impl SimReport {
    /// Damage per second over the run length
    pub fn compute_dps(total_damage: f64, duration_ms: SimTime) -> f64 {
        if duration_ms == 0 {
            0.0
        } else {
            total_damage / (duration_ms as f64 / 1000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(!SimStatus::Idle.is_finished());
        assert!(SimStatus::Completed(EndReason::TargetDied).is_completed());
        assert!(SimStatus::Aborted("x".into()).is_finished());
        assert_eq!(
            SimStatus::Aborted("Unknown spell: spell:9".into()).to_string(),
            "aborted: Unknown spell: spell:9"
        );
    }

    #[test]
    fn test_dps() {
        assert_eq!(SimReport::compute_dps(3000.0, 1500), 2000.0);
        assert_eq!(SimReport::compute_dps(3000.0, 0), 0.0);
    }
}

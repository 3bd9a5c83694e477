//! Worker protocol
//!
//! The hub and its workers exchange these messages over channels:
//!
//! ```text
//! hub                         worker
//!  │── Init(WorkerInit) ───────▶│   once, before any batch
//!  │◀────────────────── Ready ──│
//!  │── Batch(SimBatch) ────────▶│   any number of times
//!  │◀───────── Batch(BatchReply)│
//!  │── Shutdown ───────────────▶│
//! ```
//!
//! A `Batch` before `Init`, or a second `Init`, is answered with
//! `ProtocolError` and otherwise ignored.

use combatsim_core::{
    Encounter, HandlerRegistry, RotationCatalog, SimConfig, SimReport, SimStatus, SimTime,
    StaticData,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Everything a worker needs to build simulations
///
/// Static data, handlers and rotations are shared read-only across workers.
#[derive(Clone)]
pub struct WorkerInit {
    /// Rotation identifier in `catalog`
    pub rotation: String,
    pub data: Arc<dyn StaticData>,
    pub registry: Arc<HandlerRegistry>,
    pub catalog: Arc<RotationCatalog>,
    pub encounter: Encounter,
    pub config: SimConfig,
    /// Per-iteration seeds are derived from this and the sim id
    pub base_seed: u64,
}

impl fmt::Debug for WorkerInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerInit")
            .field("rotation", &self.rotation)
            .field("units", &self.encounter.units.len())
            .field("config", &self.config)
            .field("base_seed", &self.base_seed)
            .finish()
    }
}

/// A slice of iterations for one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimBatch {
    pub batch_id: u64,
    pub duration_ms: SimTime,
    pub sim_ids: Vec<u64>,
}

/// Hub → worker
#[derive(Debug)]
pub enum WorkerMessage {
    Init(Box<WorkerInit>),
    Batch(SimBatch),
    Shutdown,
}

/// Outcome of a single iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    pub sim_id: u64,
    pub status: SimStatus,
    pub casts: u32,
    pub duration_ms: SimTime,
    pub total_damage: f64,
    pub dps: f64,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IterationResult {
    /// Summarize a finished simulation
    pub fn from_report(sim_id: u64, report: &SimReport) -> Self {
        Self {
            sim_id,
            status: report.status.clone(),
            casts: report.casts,
            duration_ms: report.duration_ms,
            total_damage: report.total_damage,
            dps: report.dps,
            degraded: report.degraded,
            error: report.error.clone(),
        }
    }

    /// An iteration that could not even be set up
    pub fn failed(sim_id: u64, error: impl fmt::Display) -> Self {
        let message = error.to_string();
        Self {
            sim_id,
            status: SimStatus::Aborted(message.clone()),
            casts: 0,
            duration_ms: 0,
            total_damage: 0.0,
            dps: 0.0,
            degraded: false,
            error: Some(message),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// Results for one batch, in `sim_ids` order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReply {
    pub batch_id: u64,
    pub worker: usize,
    pub results: Vec<IterationResult>,
}

/// Worker → hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkerReply {
    Ready { worker: usize },
    Batch(BatchReply),
    ProtocolError { worker: usize, message: String },
}

//! Combatsim Hub - parallel batch runner
//!
//! This crate runs many independent simulation iterations across worker
//! threads and aggregates their results.
//!
//! ## Architecture
//!
//! ```text
//! Hub (owns the worker pool)
//!  │
//!  ├── Worker 0 ── Simulation, Simulation, ...   (one thread each)
//!  ├── Worker 1 ── Simulation, ...
//!  │
//!  └── shared read-only: Arc<StaticData>, Arc<HandlerRegistry>, Arc<RotationCatalog>
//! ```
//!
//! ## Key Components
//!
//! - [`Hub`]: spawns workers, splits iterations into batches, collects replies
//! - [`Worker`]: protocol state machine owning simulation instances
//! - [`WorkerMessage`] / [`WorkerReply`]: the channel protocol
//! - [`BatchSummary`]: DPS and cast statistics across a run
//!
//! ## Design Principles
//!
//! 1. **Workers share nothing mutable** - communication is by message only
//! 2. **combatsim-core is standalone** - it does NOT know about combatsim-hub
//! 3. **Seeds follow sim ids** - results do not depend on worker assignment

mod config;
mod error;
mod hub;
mod protocol;
mod stats;
mod worker;

pub use config::{max_workers, HubConfig};
pub use error::{Error, Result};
pub use hub::{Hub, RunOutcome};
pub use protocol::{
    BatchReply, IterationResult, SimBatch, WorkerInit, WorkerMessage, WorkerReply,
};
pub use stats::BatchSummary;
pub use worker::{run_batch, run_iteration, spawn, CancelToken, Worker};

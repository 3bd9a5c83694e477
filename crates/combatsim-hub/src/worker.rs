//! Worker - owns simulation instances on one thread
//!
//! A [`Worker`] is a small state machine over the protocol messages. The
//! threaded loop in [`spawn`] only moves messages between channels; all the
//! protocol rules live in [`Worker::handle`], so they can be exercised
//! without threads.
//!
//! # Deterministic seeding
//!
//! Each iteration is seeded with `derive_seed(base_seed, sim_id)`, so a
//! result depends only on its sim id, never on which worker ran it.

use crate::protocol::{BatchReply, IterationResult, SimBatch, WorkerInit, WorkerMessage, WorkerReply};
use combatsim_core::{derive_seed, Simulation};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Shared cancellation flag
///
/// Workers check it before each iteration; an iteration already running is
/// not preempted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before the next run
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Protocol state of one worker
#[derive(Debug)]
pub struct Worker {
    id: usize,
    init: Option<WorkerInit>,
    cancel: CancelToken,
}

impl Worker {
    pub fn new(id: usize, cancel: CancelToken) -> Self {
        Self {
            id,
            init: None,
            cancel,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.init.is_some()
    }

    /// Handle one message; `None` means shut down
    pub fn handle(&mut self, message: WorkerMessage) -> Option<WorkerReply> {
        match message {
            WorkerMessage::Init(init) => {
                if self.init.is_some() {
                    return Some(self.protocol_error("received a second Init"));
                }
                debug!(worker = self.id, rotation = %init.rotation, "Worker initialized");
                self.init = Some(*init);
                Some(WorkerReply::Ready { worker: self.id })
            }
            WorkerMessage::Batch(batch) => {
                let Some(init) = &self.init else {
                    return Some(self.protocol_error("received a Batch before Init"));
                };
                Some(WorkerReply::Batch(run_batch(self.id, init, &batch, &self.cancel)))
            }
            WorkerMessage::Shutdown => None,
        }
    }

    fn protocol_error(&self, message: &str) -> WorkerReply {
        warn!(worker = self.id, message, "Protocol error");
        WorkerReply::ProtocolError {
            worker: self.id,
            message: message.to_string(),
        }
    }
}

/// Run every iteration of a batch until done or cancelled
pub fn run_batch(
    worker: usize,
    init: &WorkerInit,
    batch: &SimBatch,
    cancel: &CancelToken,
) -> BatchReply {
    let mut results = Vec::with_capacity(batch.sim_ids.len());
    for &sim_id in &batch.sim_ids {
        if cancel.is_cancelled() {
            debug!(worker, batch_id = batch.batch_id, "Batch cancelled");
            break;
        }
        results.push(run_iteration(init, sim_id, batch.duration_ms));
    }
    BatchReply {
        batch_id: batch.batch_id,
        worker,
        results,
    }
}

/// Build, seed and run one simulation
///
/// Setup failures and aborted runs both come back as results with `error`
/// set; neither stops the batch.
pub fn run_iteration(init: &WorkerInit, sim_id: u64, duration_ms: u64) -> IterationResult {
    let config = init
        .config
        .clone()
        .with_duration(duration_ms)
        .with_seed(derive_seed(init.base_seed, sim_id))
        .with_log(false);

    let mut sim = match Simulation::from_encounter(
        &init.encounter,
        config,
        Arc::clone(&init.data),
        Arc::clone(&init.registry),
    ) {
        Ok(sim) => sim,
        Err(err) => {
            error!(sim_id, error = %err, "Iteration setup failed");
            return IterationResult::failed(sim_id, err);
        }
    };

    let Some(rotation) = init.catalog.build(&init.rotation, sim_id) else {
        return IterationResult::failed(sim_id, format!("unknown rotation '{}'", init.rotation));
    };
    sim.set_rotation(rotation);

    match sim.run() {
        Ok(report) => {
            if report.status.is_aborted() {
                error!(sim_id, status = %report.status, "Iteration aborted");
            }
            IterationResult::from_report(sim_id, &report)
        }
        Err(err) => IterationResult::failed(sim_id, err),
    }
}

/// Spawn a worker thread
///
/// The thread exits on `Shutdown` or when either channel closes.
pub fn spawn(
    id: usize,
    cancel: CancelToken,
    inbox: Receiver<WorkerMessage>,
    outbox: Sender<WorkerReply>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("combatsim-worker-{}", id))
        .spawn(move || {
            let mut worker = Worker::new(id, cancel);
            while let Ok(message) = inbox.recv() {
                let Some(reply) = worker.handle(message) else {
                    break;
                };
                if outbox.send(reply).is_err() {
                    break;
                }
            }
            debug!(worker = id, "Worker stopped");
        })
}

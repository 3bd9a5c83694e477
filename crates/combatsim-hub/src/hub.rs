//! Hub - coordinator for batched simulation runs
//!
//! The hub spawns `worker_count` threads, initializes each with the shared
//! static data and encounter, then hands out iterations in batches. It never
//! touches a simulation directly: everything goes through the worker
//! protocol.
//!
//! ## Failure model
//!
//! - An aborted iteration is a result, not an error; the run continues.
//! - A batch that does not answer within `batch_timeout_ms` cancels the run
//!   and returns [`Error::Timeout`].
//! - [`Hub::cancel`] stops workers before their next iteration; the run then
//!   returns [`Error::Cancelled`].

use crate::config::HubConfig;
use crate::error::{Error, Result};
use crate::protocol::{IterationResult, SimBatch, WorkerInit, WorkerMessage, WorkerReply};
use crate::stats::BatchSummary;
use crate::worker::{self, CancelToken};
use combatsim_core::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Results of a full run, sorted by sim id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub results: Vec<IterationResult>,
    pub summary: BatchSummary,
}

struct WorkerHandle {
    id: usize,
    inbox: Sender<WorkerMessage>,
    thread: Option<JoinHandle<()>>,
}

/// Coordinator owning the worker pool
///
/// ```no_run
/// # use combatsim_hub::{Hub, HubConfig, WorkerInit};
/// # fn init() -> WorkerInit { unimplemented!() }
/// let mut hub = Hub::new(HubConfig::with_worker_count(4));
/// hub.start(init())?;
/// let outcome = hub.run(1_000, 300_000)?;
/// println!("mean dps {:.1}", outcome.summary.mean_dps);
/// # Ok::<(), combatsim_hub::Error>(())
/// ```
pub struct Hub {
    config: HubConfig,
    cancel: CancelToken,
    workers: Vec<WorkerHandle>,
    replies: Option<Receiver<WorkerReply>>,
    next_batch_id: u64,
}

impl Hub {
    /// Create a hub; no threads are spawned until [`Hub::start`]
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            workers: Vec::new(),
            replies: None,
            next_batch_id: 1,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Number of running workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_started(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Token that cancels the current run when triggered
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop workers before their next iteration
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Spawn the workers and send each its `Init`
    ///
    /// Returns once every worker has answered `Ready`.
    pub fn start(&mut self, init: WorkerInit) -> Result<()> {
        if self.is_started() {
            return Err(Error::AlreadyStarted);
        }
        if !init.catalog.contains(&init.rotation) {
            return Err(Error::UnknownRotation(init.rotation));
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        let count = self.config.worker_count();
        for id in 0..count {
            let (inbox, rx) = mpsc::channel();
            let thread = worker::spawn(id, self.cancel.clone(), rx, reply_tx.clone())?;
            inbox
                .send(WorkerMessage::Init(Box::new(init.clone())))
                .map_err(|_| Error::Disconnected)?;
            self.workers.push(WorkerHandle {
                id,
                inbox,
                thread: Some(thread),
            });
        }
        drop(reply_tx);

        let mut ready = 0;
        while ready < count {
            match reply_rx.recv_timeout(self.config.batch_timeout()) {
                Ok(WorkerReply::Ready { worker }) => {
                    debug!(worker, "Worker ready");
                    ready += 1;
                }
                Ok(WorkerReply::ProtocolError { worker, message }) => {
                    return Err(Error::Protocol { worker, message });
                }
                Ok(WorkerReply::Batch(reply)) => {
                    return Err(Error::Protocol {
                        worker: reply.worker,
                        message: format!("unexpected batch {} during startup", reply.batch_id),
                    });
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::StartupTimeout(self.config.batch_timeout_ms));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(Error::Disconnected),
            }
        }

        self.replies = Some(reply_rx);
        info!(workers = count, rotation = %init.rotation, "Hub started");
        Ok(())
    }

    /// Run iterations `1..=iterations`
    pub fn run(&mut self, iterations: u64, duration_ms: SimTime) -> Result<RunOutcome> {
        self.run_ids((1..=iterations).collect(), duration_ms)
    }

    /// Run the given iteration ids, split into batches across workers
    pub fn run_ids(&mut self, sim_ids: Vec<u64>, duration_ms: SimTime) -> Result<RunOutcome> {
        if !self.is_started() {
            return Err(Error::NotStarted);
        }
        self.cancel.reset();
        let expected = sim_ids.len();

        let mut pending = BTreeSet::new();
        for (i, chunk) in sim_ids.chunks(self.config.batch_size.max(1)).enumerate() {
            let batch_id = self.next_batch_id;
            self.next_batch_id += 1;
            let worker = &self.workers[i % self.workers.len()];
            worker
                .inbox
                .send(WorkerMessage::Batch(SimBatch {
                    batch_id,
                    duration_ms,
                    sim_ids: chunk.to_vec(),
                }))
                .map_err(|_| Error::Disconnected)?;
            debug!(batch_id, worker = worker.id, iterations = chunk.len(), "Batch sent");
            pending.insert(batch_id);
        }
        info!(iterations = expected, batches = pending.len(), "Run started");

        let replies = self.replies.as_ref().ok_or(Error::NotStarted)?;
        let mut results = Vec::with_capacity(expected);
        while let Some(&oldest) = pending.first() {
            match replies.recv_timeout(self.config.batch_timeout()) {
                Ok(WorkerReply::Batch(reply)) => {
                    if pending.remove(&reply.batch_id) {
                        debug!(batch_id = reply.batch_id, worker = reply.worker, "Batch finished");
                        results.extend(reply.results);
                    }
                }
                Ok(WorkerReply::ProtocolError { worker, message }) => {
                    self.cancel.cancel();
                    return Err(Error::Protocol { worker, message });
                }
                Ok(WorkerReply::Ready { worker }) => {
                    warn!(worker, "Unexpected Ready during run");
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.cancel.cancel();
                    warn!(batch_id = oldest, "Batch timed out");
                    return Err(Error::Timeout {
                        batch_id: oldest,
                        waited_ms: self.config.batch_timeout_ms,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(Error::Disconnected),
            }
        }

        if results.len() < expected && self.cancel.is_cancelled() {
            return Err(Error::Cancelled {
                missing: expected - results.len(),
            });
        }

        results.sort_by_key(|r| r.sim_id);
        let summary = BatchSummary::from_results(&results);
        info!(
            completed = summary.completed,
            aborted = summary.aborted,
            mean_dps = summary.mean_dps,
            "Run finished"
        );
        Ok(RunOutcome { results, summary })
    }

    /// Send `Shutdown` to every worker and join the threads
    pub fn shutdown(&mut self) {
        for worker in &self.workers {
            let _ = worker.inbox.send(WorkerMessage::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    warn!(worker = worker.id, "Worker thread panicked");
                }
            }
        }
        self.workers.clear();
        self.replies = None;
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_before_start() {
        let mut hub = Hub::default();
        assert!(matches!(hub.run(3, 1000), Err(Error::NotStarted)));
        assert!(!hub.is_started());
        assert_eq!(hub.worker_count(), 0);
    }

    #[test]
    fn test_shutdown_without_workers() {
        let mut hub = Hub::default();
        hub.shutdown();
        assert!(!hub.is_started());
    }
}

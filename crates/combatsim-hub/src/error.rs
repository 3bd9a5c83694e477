//! Error types for combatsim-hub
//!
//! Iteration failures are not hub errors: an aborted simulation is recorded
//! in its [`IterationResult`](crate::IterationResult) and the batch carries
//! on. These errors describe the coordinator itself failing.

use thiserror::Error;

/// Result type for combatsim-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in combatsim-hub
#[derive(Debug, Error)]
pub enum Error {
    /// The hub was asked to run before workers were started
    #[error("hub has no running workers")]
    NotStarted,

    /// Workers were started twice
    #[error("hub workers already started")]
    AlreadyStarted,

    /// The requested rotation is not in the catalog
    #[error("unknown rotation '{0}'")]
    UnknownRotation(String),

    /// A worker answered out of protocol
    #[error("worker {worker} protocol error: {message}")]
    Protocol { worker: usize, message: String },

    /// A worker thread hung up
    #[error("worker channel disconnected")]
    Disconnected,

    /// A batch did not answer in time
    #[error("batch {batch_id} timed out after {waited_ms}ms")]
    Timeout { batch_id: u64, waited_ms: u64 },

    /// Workers did not report ready in time
    #[error("workers did not report ready within {0}ms")]
    StartupTimeout(u64),

    /// The run was cancelled before every iteration finished
    #[error("run cancelled with {missing} iterations not run")]
    Cancelled { missing: usize },

    /// A worker thread could not be spawned
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] combatsim_core::Error),
}

// Compile-time check that Error is Send + Sync for thread-safe error propagation.
// This function is never called but will fail to compile if the bound is not satisfied.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}

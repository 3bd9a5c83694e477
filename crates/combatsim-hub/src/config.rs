//! Hub Configuration - worker count and batching
//!
//! `worker_count` is the number of OS threads the hub spawns; each worker
//! owns its simulation instances end to end. Iterations are handed out in
//! batches of `batch_size`, and a batch that does not answer within
//! `batch_timeout_ms` fails the run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for Hub execution
///
/// # Example
///
/// ```
/// use combatsim_hub::HubConfig;
///
/// // Single worker (default)
/// let config = HubConfig::default();
/// assert!(config.is_single_worker());
/// assert_eq!(config.batch_size, 100);
///
/// // Configure for 4 workers (clamped to available cores)
/// let config = HubConfig::with_worker_count(4);
/// assert_eq!(config.worker_count(), 4.min(combatsim_hub::max_workers()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Number of worker threads
    ///
    /// This value is clamped to `[1, max_workers()]`.
    worker_count: usize,
    /// Iterations per batch message
    pub batch_size: usize,
    /// How long the hub waits for a batch reply
    pub batch_timeout_ms: u64,
}

impl HubConfig {
    /// Create a configuration with the specified worker count
    ///
    /// The worker count is clamped to `[1, max_workers()]`.
    ///
    /// # Example
    ///
    /// ```
    /// use combatsim_hub::HubConfig;
    ///
    /// let config = HubConfig::with_worker_count(0);
    /// assert_eq!(config.worker_count(), 1);
    /// ```
    pub fn with_worker_count(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.clamp(1, max_workers()),
            ..Self::default()
        }
    }

    /// Builder: set the batch size (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Builder: set the per-batch timeout
    pub fn with_batch_timeout_ms(mut self, ms: u64) -> Self {
        self.batch_timeout_ms = ms;
        self
    }

    /// Get the configured worker count
    ///
    /// Deserialized configs are clamped here as well, since serde bypasses
    /// the constructors.
    pub fn worker_count(&self) -> usize {
        self.worker_count.clamp(1, max_workers())
    }

    /// Set the number of workers
    ///
    /// The value is clamped to `[1, max_workers()]`.
    pub fn set_worker_count(&mut self, n: usize) {
        self.worker_count = n.clamp(1, max_workers());
    }

    /// Check if configured for a single worker
    pub fn is_single_worker(&self) -> bool {
        self.worker_count() == 1
    }

    /// Per-batch timeout as a `Duration`
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            batch_size: 100,
            batch_timeout_ms: 60_000,
        }
    }
}

/// Get the maximum number of workers on this system
///
/// This uses the `num_cpus` crate to detect the number of logical CPUs.
///
/// # Example
///
/// ```
/// use combatsim_hub::max_workers;
///
/// assert!(max_workers() >= 1);
/// ```
pub fn max_workers() -> usize {
    num_cpus::get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_single_worker() {
        let config = HubConfig::default();
        assert!(config.is_single_worker());
        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.batch_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_worker_count_clamped() {
        assert_eq!(HubConfig::with_worker_count(0).worker_count(), 1);
        assert_eq!(HubConfig::with_worker_count(10_000).worker_count(), max_workers());
        assert_eq!(HubConfig::with_worker_count(4).worker_count(), 4.min(max_workers()));
    }

    #[test]
    fn test_set_worker_count() {
        let mut config = HubConfig::default();
        config.set_worker_count(4);
        let expected = 4.min(max_workers());
        assert_eq!(config.worker_count(), expected);
        assert_eq!(config.is_single_worker(), expected == 1);

        config.set_worker_count(1);
        assert!(config.is_single_worker());
    }

    #[test]
    fn test_batch_size_floor() {
        let config = HubConfig::default().with_batch_size(0);
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_deserialized_count_is_clamped() {
        let config = HubConfig {
            worker_count: 0,
            ..HubConfig::default()
        };
        assert_eq!(config.worker_count(), 1);
    }
}

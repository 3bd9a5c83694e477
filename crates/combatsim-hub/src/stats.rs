//! Statistics across a batch of iterations

use crate::protocol::IterationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate over every iteration of a run
///
/// DPS figures cover completed iterations only; aborted iterations are
/// counted and their errors listed by sim id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub iterations: usize,
    pub completed: usize,
    pub aborted: usize,
    pub degraded: usize,
    pub mean_dps: f64,
    pub min_dps: f64,
    pub max_dps: f64,
    /// Population standard deviation
    pub std_dev_dps: f64,
    pub mean_casts: f64,
    pub errors: BTreeMap<u64, String>,
}

impl BatchSummary {
    pub fn from_results(results: &[IterationResult]) -> Self {
        let mut summary = BatchSummary {
            iterations: results.len(),
            ..Default::default()
        };

        let mut dps = Vec::with_capacity(results.len());
        let mut casts = 0u64;
        for result in results {
            if result.degraded {
                summary.degraded += 1;
            }
            if result.is_completed() {
                summary.completed += 1;
                dps.push(result.dps);
                casts += u64::from(result.casts);
            } else {
                summary.aborted += 1;
                summary.errors.insert(
                    result.sim_id,
                    result.error.clone().unwrap_or_else(|| result.status.to_string()),
                );
            }
        }

        if dps.is_empty() {
            return summary;
        }
        let n = dps.len() as f64;
        summary.mean_dps = dps.iter().sum::<f64>() / n;
        summary.min_dps = dps.iter().copied().fold(f64::INFINITY, f64::min);
        summary.max_dps = dps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        summary.std_dev_dps = (dps
            .iter()
            .map(|d| (d - summary.mean_dps).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();
        summary.mean_casts = casts as f64 / n;
        summary
    }
}

//! Progress reporting for running batches.

use crate::output::BatchStats;
use log::info;
use std::time::Duration;

/// Receives progress updates while a batch runs.
///
/// `report` is called from every worker on every loop iteration, so
/// implementations should be cheap.
pub trait ProgressSink: Send + Sync {
    /// `pending` tasks are queued, `elapsed` since the batch started.
    fn report(&self, pending: usize, elapsed: Duration);

    /// Called once after all workers joined and results were merged.
    fn finished(&self, stats: &BatchStats);
}

/// Writes progress through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, pending: usize, elapsed: Duration) {
        info!("::{:.2} seconds:: >> {} requests left", elapsed.as_secs_f64(), pending);
    }

    fn finished(&self, stats: &BatchStats) {
        info!(
            "::{:.2} seconds:: >> DONE ({} succeeded, {} failed, {} attempts, {} workers)",
            stats.elapsed.as_secs_f64(),
            stats.succeeded,
            stats.failed,
            stats.total_attempts,
            stats.workers
        );
    }
}

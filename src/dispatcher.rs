//! Batch entry points: validate, seed, fan out, join, merge.

use crate::batch::{HttpBatch, ProbeBatch};
use crate::config::BoostConfig;
use crate::error::BoostError;
use crate::output::{self, BatchOutput};
use crate::progress::{LogProgress, ProgressSink};
use crate::queue::TaskQueue;
use crate::task::Target;
use crate::transport::{NetworkTransport, Transport};
use crate::worker::{RunContext, Worker};

use futures::future;
use log::{error, info};
use std::sync::Arc;

/// Runs batches of targets over a bounded pool of workers.
pub struct Dispatcher<T: Transport> {
    config: BoostConfig,
    transport: Arc<T>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Dispatcher<NetworkTransport> {
    /// Create a dispatcher using the built-in HTTP and proxy probe strategies.
    pub fn from_config(config: BoostConfig) -> Result<Self, BoostError> {
        config.validate()?;
        let transport = NetworkTransport::from_config(&config)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher with a custom transport.
    pub fn new(config: BoostConfig, transport: T) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            progress: None,
        }
    }

    /// Send progress to `sink` instead of the log. Takes effect regardless
    /// of `verbose`.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// The configuration every batch is run with.
    pub fn config(&self) -> &BoostConfig {
        &self.config
    }

    /// Run every target to completion and return results in input order.
    ///
    /// Fails only on invalid configuration or a batch mixing target kinds;
    /// per-target failures are reported in the returned slots.
    pub async fn dispatch(&self, targets: Vec<Target>) -> Result<BatchOutput, BoostError> {
        self.config.validate()?;
        check_uniform(&targets)?;

        let total = targets.len();
        let progress = self.progress.clone().or_else(|| {
            self.config
                .verbose
                .then(|| Arc::new(LogProgress) as Arc<dyn ProgressSink>)
        });
        let ctx = Arc::new(RunContext::new(&self.config, progress));

        if total == 0 {
            return Ok(output::aggregate(0, Vec::new(), 0, ctx.started.elapsed()));
        }

        let queue = Arc::new(TaskQueue::seeded(targets));
        let pool_size = self.config.worker_count.min(total);
        info!("Dispatching {} tasks over {} workers", total, pool_size);

        let handles: Vec<_> = (0..pool_size)
            .map(|id| {
                let worker = Worker::new(id, Arc::clone(&queue), Arc::clone(&self.transport), Arc::clone(&ctx));
                tokio::spawn(worker.run())
            })
            .collect();

        // join barrier: result maps are only read once every worker stopped
        let mut results = Vec::with_capacity(pool_size);
        for (id, joined) in future::join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(map) => results.push(map),
                Err(e) => error!("Worker {} aborted, its results are lost: {}", id, e),
            }
        }

        let output = output::aggregate(total, results, pool_size, ctx.started.elapsed());
        if let Some(sink) = ctx.progress() {
            sink.finished(output.stats());
        }
        Ok(output)
    }
}

fn check_uniform(targets: &[Target]) -> Result<(), BoostError> {
    if let Some(first) = targets.first() {
        if let Some(index) = targets.iter().position(|t| !t.same_shape(first)) {
            return Err(BoostError::MixedTargets { index });
        }
    }
    Ok(())
}

/// Send every request in `batch` and return the responses in order.
pub async fn boosted_requests(batch: HttpBatch, config: BoostConfig) -> Result<BatchOutput, BoostError> {
    let targets = batch.into_targets()?;
    Dispatcher::from_config(config)?.dispatch(targets).await
}

/// Probe the batch domain through every proxy and return the results in order.
pub async fn probe_proxies(batch: ProbeBatch, config: BoostConfig) -> Result<BatchOutput, BoostError> {
    let targets = batch.into_targets()?;
    Dispatcher::from_config(config)?.dispatch(targets).await
}

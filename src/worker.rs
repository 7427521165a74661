//! Worker loop: pop, attempt, record or requeue.

use crate::config::BoostConfig;
use crate::output::Slot;
use crate::progress::ProgressSink;
use crate::queue::TaskQueue;
use crate::task::Task;
use crate::transport::{Outcome, Transport};

use anyhow::anyhow;
use futures::FutureExt;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use log::{debug, warn};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

type AttemptLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// State shared by every worker of one batch.
pub(crate) struct RunContext {
    pub(crate) started: Instant,
    pub(crate) max_tries: u32,
    pub(crate) timeout: Duration,
    progress: Option<Arc<dyn ProgressSink>>,
    limiter: Option<AttemptLimiter>,
}

impl RunContext {
    pub(crate) fn new(config: &BoostConfig, progress: Option<Arc<dyn ProgressSink>>) -> Self {
        let limiter = config
            .max_requests_per_second
            .and_then(quota)
            .map(RateLimiter::direct);

        Self {
            started: Instant::now(),
            max_tries: config.max_tries,
            timeout: config.timeout,
            progress,
            limiter,
        }
    }

    pub(crate) fn progress(&self) -> Option<&Arc<dyn ProgressSink>> {
        self.progress.as_ref()
    }

    fn report(&self, pending: usize) {
        if let Some(sink) = &self.progress {
            sink.report(pending, self.started.elapsed());
        }
    }
}

fn quota(rps: f64) -> Option<Quota> {
    if rps >= 1.0 {
        NonZeroU32::new(rps.ceil() as u32).map(Quota::per_second)
    } else if rps > 0.0 {
        Duration::try_from_secs_f64(1.0 / rps)
            .ok()
            .and_then(Quota::with_period)
    } else {
        None
    }
}

/// One member of the pool. Holds at most one task at a time and keeps its
/// results private until it returns them.
pub(crate) struct Worker<T: Transport> {
    id: usize,
    queue: Arc<TaskQueue>,
    transport: Arc<T>,
    ctx: Arc<RunContext>,
    results: HashMap<usize, Slot>,
}

impl<T: Transport> Worker<T> {
    pub(crate) fn new(id: usize, queue: Arc<TaskQueue>, transport: Arc<T>, ctx: Arc<RunContext>) -> Self {
        Self {
            id,
            queue,
            transport,
            ctx,
            results: HashMap::new(),
        }
    }

    /// Drain the queue until it is empty, then hand back the result map.
    pub(crate) async fn run(mut self) -> HashMap<usize, Slot> {
        loop {
            self.ctx.report(self.queue.pending_count());
            let Some(task) = self.queue.try_pop() else {
                break;
            };
            self.process(task).await;
        }
        debug!("Worker {} stopping, resolved {} tasks", self.id, self.results.len());
        self.results
    }

    async fn process(&mut self, mut task: Task) {
        if let Some(limiter) = &self.ctx.limiter {
            limiter.until_ready().await;
        }

        match self.attempt(&task).await {
            Outcome::Success(payload) => {
                self.results.insert(
                    task.index,
                    Slot::Done {
                        payload,
                        attempts: task.retry_count + 1,
                    },
                );
            }
            Outcome::Terminal(cause) => {
                warn!(
                    "Task {} ({}) rejected on attempt {}: {:#}",
                    task.index,
                    task.target.describe(),
                    task.retry_count + 1,
                    cause
                );
                self.results.insert(
                    task.index,
                    Slot::Rejected {
                        attempts: task.retry_count + 1,
                        error: format!("{:#}", cause),
                    },
                );
            }
            Outcome::Transient(cause) => {
                task.retry_count += 1;
                if task.retry_count < self.ctx.max_tries {
                    debug!(
                        "Task {} failed (attempt {}), requeueing: {:#}",
                        task.index, task.retry_count, cause
                    );
                    self.queue.push(task);
                } else {
                    warn!(
                        "Task {} ({}) gave up after {} attempts: {:#}",
                        task.index,
                        task.target.describe(),
                        task.retry_count,
                        cause
                    );
                    self.results.insert(
                        task.index,
                        Slot::Exhausted {
                            attempts: task.retry_count,
                            last_error: format!("{:#}", cause),
                        },
                    );
                }
            }
        }
    }

    /// Run the strategy once under the per-attempt timeout. Panics and
    /// timeouts become transient failures.
    async fn attempt(&self, task: &Task) -> Outcome {
        let timeout = self.ctx.timeout;
        let attempt = AssertUnwindSafe(self.transport.attempt(&task.target, timeout)).catch_unwind();

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Outcome::Transient(anyhow!("transport panicked: {}", message))
            }
            Err(_) => Outcome::Transient(anyhow!("attempt timed out after {:?}", timeout)),
        }
    }
}

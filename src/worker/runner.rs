//! Worker loop - resolves, submits and tracks one task at a time

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::WorkerConfig;
use super::limiter::RateLimiter;
use super::retry::{RetryError, RetryPolicy};
use crate::engine::{DownloadEngine, EngineError, JobOptions, JobStatus};
use crate::observability::Metrics;
use crate::source::{ResolveError, UriResolver};
use crate::task::{Task, TaskError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("submitting {path} failed: {source}")]
    Submit {
        path: String,
        #[source]
        source: EngineError,
    },

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

pub(crate) type SharedReceiver = Arc<Mutex<mpsc::Receiver<Arc<Task>>>>;

/// Everything a worker needs, shared by the whole pool
pub struct WorkerContext {
    pub resolver: Arc<dyn UriResolver>,
    pub engine: Arc<dyn DownloadEngine>,
    pub limiter: RateLimiter,
    pub resolve_retry: RetryPolicy,
    pub config: WorkerConfig,
    pub metrics: Arc<Metrics>,
    pub cancel: CancellationToken,
}

pub struct Worker {
    id: usize,
    ctx: Arc<WorkerContext>,
    intake: SharedReceiver,
}

impl Worker {
    pub(crate) fn new(id: usize, ctx: Arc<WorkerContext>, intake: SharedReceiver) -> Self {
        Self { id, ctx, intake }
    }

    /// Drain the intake until it closes or the run is cancelled.
    ///
    /// A submission failure is fatal: the worker cancels the run and returns
    /// the error. The task that failed is left pending.
    pub async fn run(self) -> Result<()> {
        debug!(worker = self.id, "Worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => None,
                task = async { self.intake.lock().await.recv().await } => task,
            };
            let Some(task) = next else {
                break;
            };

            if let Err(err) = self.process(&task).await {
                error!(worker = self.id, error = %err, "Submission failed, stopping dispatch");
                self.ctx.cancel.cancel();
                return Err(err);
            }
        }

        debug!(worker = self.id, "Worker exiting");
        Ok(())
    }

    async fn process(&self, task: &Task) -> Result<()> {
        let ctx = &self.ctx;
        let path = task.relative_path();

        if !ctx.limiter.acquire(&ctx.cancel).await {
            return Ok(());
        }

        let resolver = &ctx.resolver;
        let file = task.file();
        let resolved = ctx
            .resolve_retry
            .run(&ctx.cancel, "resolve_uris", move |_attempt| async move {
                let uris = resolver.resolve_uris(file).await?;
                if uris.is_empty() {
                    return Err(ResolveError::NoUris);
                }
                Ok::<_, ResolveError>(uris)
            })
            .await;

        let uris = match resolved {
            Ok(uris) => uris,
            Err(RetryError::Cancelled) => return Ok(()),
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(worker = self.id, path = %path, attempts, error = %last, "Could not resolve download uris");
                ctx.metrics.task_failed();
                task.set_done(Some(TaskError::Resolve {
                    attempts,
                    source: last,
                }));
                return Ok(());
            }
        };

        let job_id = ctx
            .engine
            .submit(uris.into_values().collect(), self.job_options(&path))
            .await
            .map_err(|source| DispatchError::Submit {
                path: path.clone(),
                source,
            })?;

        task.set_job_id(job_id.clone());
        ctx.metrics.task_submitted();
        info!(worker = self.id, path = %path, job_id = %job_id, "Job submitted");

        if let Some(outcome) = self.await_job(&path, &job_id).await {
            task.set_done(outcome);
        }
        Ok(())
    }

    fn job_options(&self, path: &str) -> JobOptions {
        let config = &self.ctx.config;
        let options = JobOptions::new()
            .directory(config.output_dir.to_string_lossy())
            .output(path);

        match &config.user_agent {
            Some(user_agent) => options.user_agent(user_agent.as_str()),
            None => options,
        }
    }

    /// Poll until the job reaches a definitive outcome.
    ///
    /// Returns `None` when cancelled; the task must then stay pending.
    async fn await_job(&self, path: &str, job_id: &str) -> Option<Option<TaskError>> {
        let ctx = &self.ctx;
        let period = ctx.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    debug!(worker = self.id, path, job_id, "Stopped polling on cancellation");
                    return None;
                }
                _ = ticker.tick() => {}
            }

            let report = match ctx.engine.poll(job_id).await {
                Ok(report) => report,
                Err(err) => {
                    debug!(worker = self.id, path, job_id, error = %err, "Job unknown to engine, treating as removed");
                    ctx.metrics.task_removed();
                    return Some(None);
                }
            };

            match report.status {
                JobStatus::Complete => {
                    info!(worker = self.id, path, job_id, "Download complete");
                    ctx.metrics.task_completed();
                    return Some(None);
                }
                JobStatus::Removed => {
                    info!(worker = self.id, path, job_id, "Job removed from engine");
                    ctx.metrics.task_removed();
                    return Some(None);
                }
                JobStatus::Error => {
                    let message = report
                        .error_message
                        .unwrap_or_else(|| "engine reported an error".to_string());
                    warn!(worker = self.id, path, job_id, error = %message, "Download failed");
                    ctx.metrics.task_failed();
                    return Some(Some(TaskError::Engine(message)));
                }
                status @ (JobStatus::Active | JobStatus::Waiting | JobStatus::Paused) => {
                    trace!(worker = self.id, path, job_id, %status, "Job still running");
                }
            }
        }
    }
}

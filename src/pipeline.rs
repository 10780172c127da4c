//! End-to-end run over every configured root

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{Config, ValidationError};
use crate::engine::DownloadEngine;
use crate::observability::{Metrics, MetricsSnapshot};
use crate::queue::Dispatcher;
use crate::source::{ShareWalker, UriResolver};
use crate::walk::{RootError, RootReport, WalkCoordinator};
use crate::worker::{DispatchError, RateLimiter, WorkerContext};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Root(#[from] RootError),
}

/// What a completed run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub roots: Vec<RootReport>,
    pub metrics: MetricsSnapshot,
}

/// Walks every configured root in order through one shared worker pool.
pub struct Pipeline {
    config: Arc<Config>,
    walker: Arc<dyn ShareWalker>,
    resolver: Arc<dyn UriResolver>,
    engine: Arc<dyn DownloadEngine>,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        config: Arc<Config>,
        walker: Arc<dyn ShareWalker>,
        resolver: Arc<dyn UriResolver>,
        engine: Arc<dyn DownloadEngine>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            walker,
            resolver,
            engine,
            metrics: Arc::new(Metrics::new()),
            cancel,
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Process every root, then shut the worker pool down.
    ///
    /// Configuration is validated before anything is spawned. A fatal worker
    /// error takes precedence over the root error its cancellation causes.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        self.config.validate()?;

        let config = &self.config;
        let run_token = self.cancel.child_token();

        let ctx = WorkerContext {
            resolver: self.resolver.clone(),
            engine: self.engine.clone(),
            limiter: RateLimiter::per_second(config.dispatch.resolve_rate_per_sec),
            resolve_retry: config.resolve_retry.policy(),
            config: config.worker_config(),
            metrics: self.metrics.clone(),
            cancel: run_token.clone(),
        };
        let dispatcher = Dispatcher::start(
            ctx,
            config.dispatch.concurrency,
            config.dispatch.worker_count(),
        );

        let coordinator = WalkCoordinator::new(
            self.walker.clone(),
            config.walk.retry.policy(),
            self.metrics.clone(),
            run_token.clone(),
        )
        .with_max_rewalks(config.walk.max_rewalks);

        let mut reports = Vec::with_capacity(config.roots.len());
        let mut root_error = None;
        for root in &config.roots {
            match coordinator.process_root(dispatcher.intake(), root).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(root = %root, error = %err, "Root failed");
                    root_error = Some(err);
                    run_token.cancel();
                    break;
                }
            }
        }

        dispatcher.shutdown().await?;
        if let Some(err) = root_error {
            return Err(err.into());
        }

        let summary = RunSummary {
            roots: reports,
            metrics: self.metrics.snapshot(),
        };
        info!(
            roots = summary.roots.len(),
            completed = summary.metrics.tasks_completed,
            failed = summary.metrics.tasks_failed,
            removed = summary.metrics.tasks_removed,
            rewalks = summary.metrics.rewalks,
            discovered = %summary.metrics.bytes_discovered,
            "Run finished"
        );
        Ok(summary)
    }
}

//! Per-root walk driver and the abort/re-walk protocol

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::signal::RewalkSignal;
use crate::observability::Metrics;
use crate::queue::{Enqueued, Intake};
use crate::source::{FileRef, ShareWalker, WalkControl, WalkError, WalkVisitor, join_path};
use crate::task::{Task, TaskHook};
use crate::tracker::CompletionTracker;
use crate::worker::RetryPolicy;

#[derive(Debug, Error)]
pub enum RootError {
    #[error("walking {root} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        root: String,
        attempts: u32,
        last: WalkError,
    },

    #[error("{root} still had failures after {limit} re-walks")]
    RewalkLimit { root: String, limit: u32 },

    #[error("dispatch queue closed while walking {root}")]
    DispatcherClosed { root: String },

    #[error("cancelled while processing {root}")]
    Cancelled { root: String },
}

/// How a finished root went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootReport {
    pub root: String,
    pub walks: u32,
    pub rewalks: u32,
    /// Paths that finished successfully
    pub completed: usize,
}

/// Drives the walker over one root at a time and feeds the dispatcher.
///
/// Per root:
/// - files already in the root's [`CompletionTracker`] are skipped;
/// - every other file becomes a [`Task`] whose hook records success or raises
///   the root's [`RewalkSignal`] on failure;
/// - a walk stuck on a full queue while a re-walk is pending is abandoned and
///   restarted right away;
/// - after a clean walk the coordinator waits for the root's tasks to settle
///   and walks again if any of them failed;
/// - transient walk errors are retried with backoff, and the root fails once
///   the retry budget is spent.
pub struct WalkCoordinator {
    walker: Arc<dyn ShareWalker>,
    retry: RetryPolicy,
    max_rewalks: Option<u32>,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
}

impl WalkCoordinator {
    pub fn new(
        walker: Arc<dyn ShareWalker>,
        retry: RetryPolicy,
        metrics: Arc<Metrics>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            walker,
            retry,
            max_rewalks: None,
            metrics,
            cancel,
        }
    }

    /// Fail a root once it needs more than `limit` re-walks. Unbounded by default.
    pub fn with_max_rewalks(mut self, limit: Option<u32>) -> Self {
        self.max_rewalks = limit;
        self
    }

    pub async fn process_root(&self, intake: &Intake, root: &str) -> Result<RootReport, RootError> {
        let tracker = Arc::new(CompletionTracker::new());
        let signal = Arc::new(RewalkSignal::new());
        let mut pending: Vec<Arc<Task>> = Vec::new();

        let mut walks = 0u32;
        let mut rewalks = 0u32;
        let mut failures = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RootError::Cancelled { root: root.to_string() });
            }

            walks += 1;
            info!(root, walk = walks, tracked = tracker.len(), "Walking root");

            let mut visitor = RootVisitor {
                root,
                tracker: &tracker,
                signal: &signal,
                intake,
                metrics: &self.metrics,
                pending: &mut pending,
                halted: None,
            };
            let result = self.walker.walk(root, &mut visitor).await;
            let halted = visitor.halted;

            match result {
                Ok(()) => {
                    failures = 0;
                    self.settle(root, &mut pending).await?;

                    if !signal.consume() {
                        info!(root, walks, rewalks, completed = tracker.len(), "Root finished");
                        return Ok(RootReport {
                            root: root.to_string(),
                            walks,
                            rewalks,
                            completed: tracker.len(),
                        });
                    }
                    info!(root, "Some tasks failed, walking root again");
                }
                Err(WalkError::Aborted) => {
                    match halted {
                        Some(Enqueued::Cancelled) => {
                            return Err(RootError::Cancelled { root: root.to_string() });
                        }
                        Some(Enqueued::Closed) => {
                            return Err(RootError::DispatcherClosed { root: root.to_string() });
                        }
                        _ => {}
                    }
                    failures = 0;
                    signal.consume();
                    debug!(root, queued = intake.queued(), "Walk aborted with a re-walk pending, restarting");
                }
                Err(err @ WalkError::Transient(_)) => {
                    failures += 1;
                    let Some(delay) = self.retry.delay_for(failures) else {
                        warn!(root, attempts = failures, error = %err, "Giving up on root");
                        return Err(RootError::RetriesExhausted {
                            root: root.to_string(),
                            attempts: failures,
                            last: err,
                        });
                    };

                    warn!(
                        root,
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Walk failed, retrying"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            return Err(RootError::Cancelled { root: root.to_string() });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
            }

            rewalks += 1;
            self.metrics.rewalk();
            if let Some(limit) = self.max_rewalks {
                if rewalks > limit {
                    warn!(root, limit, "Re-walk limit reached");
                    return Err(RootError::RewalkLimit {
                        root: root.to_string(),
                        limit,
                    });
                }
            }
        }
    }

    /// Wait for every task dispatched for this root to be finalized
    async fn settle(&self, root: &str, pending: &mut Vec<Arc<Task>>) -> Result<(), RootError> {
        pending.retain(|task| !task.is_done());
        if !pending.is_empty() {
            debug!(root, in_flight = pending.len(), "Waiting for tasks to settle");
        }

        for task in pending.drain(..) {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(RootError::Cancelled { root: root.to_string() });
                }
                _ = task.wait_done() => {}
            }
        }
        Ok(())
    }
}

struct RootVisitor<'a> {
    root: &'a str,
    tracker: &'a Arc<CompletionTracker>,
    signal: &'a Arc<RewalkSignal>,
    intake: &'a Intake,
    metrics: &'a Arc<Metrics>,
    pending: &'a mut Vec<Arc<Task>>,
    halted: Option<Enqueued>,
}

impl<'a> RootVisitor<'a> {
    fn build_task(&self, path_prefix: &str, file: &FileRef) -> Arc<Task> {
        let tracker = Arc::clone(self.tracker);
        let signal = Arc::clone(self.signal);
        let root = self.root.to_string();

        let hook: TaskHook = Box::new(move |task: &Task| {
            let path = task.relative_path();
            match task.error() {
                None => {
                    if !tracker.record(path.clone()) {
                        debug!(root = %root, path = %path, "Path was already recorded");
                    }
                }
                Some(err) => {
                    let requested = signal.raise();
                    debug!(root = %root, path = %path, error = %err, requested, "Task failed, re-walk requested");
                }
            }
        });

        Arc::new(Task::new(file.clone(), path_prefix, vec![hook]))
    }
}

#[async_trait]
impl<'a> WalkVisitor for RootVisitor<'a> {
    async fn visit(&mut self, path_prefix: &str, file: &FileRef) -> WalkControl {
        let path = join_path(path_prefix, &file.name);
        if self.tracker.contains(&path) {
            self.metrics.file_skipped();
            trace!(root = self.root, path = %path, "Already finished, skipping");
            return WalkControl::Continue;
        }

        self.metrics.file_discovered(file.size_bytes());
        let task = self.build_task(path_prefix, file);

        match self.intake.enqueue(task.clone(), self.signal.raised()).await {
            Enqueued::Queued => {
                debug!(root = self.root, path = %path, "Task queued");
                self.pending.retain(|task| !task.is_done());
                self.pending.push(task);
                WalkControl::Continue
            }
            Enqueued::Aborted => {
                debug!(root = self.root, path = %path, "Queue full with a re-walk pending, stopping walk");
                WalkControl::Stop
            }
            halted @ (Enqueued::Cancelled | Enqueued::Closed) => {
                self.halted = Some(halted);
                WalkControl::Stop
            }
        }
    }
}

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::observability::Metrics;
use crate::task::Task;
use crate::worker::{DispatchError, Worker, WorkerContext};

/// Outcome of [`Intake::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// A slot was free and the task is queued
    Queued,
    /// The abort future resolved before a slot freed up
    Aborted,
    /// The run was cancelled while waiting
    Cancelled,
    /// Every worker has exited; nothing will drain the queue
    Closed,
}

/// Producer side of the bounded task queue
pub struct Intake {
    tx: mpsc::Sender<Arc<Task>>,
    cancel: CancellationToken,
    metrics: Arc<Metrics>,
}

impl Intake {
    /// Queue a task, waiting for capacity.
    ///
    /// Waiting ends on whichever comes first: a free slot, cancellation, or
    /// `abort` resolving. A free slot wins over an abort that is already
    /// ready, so the abort only matters when the queue is actually full.
    pub async fn enqueue<F>(&self, task: Arc<Task>, abort: F) -> Enqueued
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Enqueued::Cancelled,
            permit = self.tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(task);
                    self.metrics.task_queued();
                    Enqueued::Queued
                }
                Err(_) => Enqueued::Closed,
            },
            _ = abort => Enqueued::Aborted,
        }
    }

    /// Tasks waiting in the queue, not yet picked up by a worker
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Bounded task queue plus a fixed pool of workers draining it.
///
/// The queue holds at most `concurrency` tasks and each worker holds at most
/// one, so no more than `concurrency + workers` tasks are ever queued but not
/// finalized. A full queue blocks [`Intake::enqueue`], which is what slows
/// the walk down.
pub struct Dispatcher {
    intake: Intake,
    workers: JoinSet<Result<(), DispatchError>>,
    worker_count: usize,
}

impl Dispatcher {
    /// Spawn `workers` workers behind a queue of capacity `concurrency`.
    ///
    /// Both values are expected to be validated as non-zero; zero is bumped to one.
    pub fn start(ctx: WorkerContext, concurrency: usize, workers: usize) -> Self {
        let concurrency = concurrency.max(1);
        let worker_count = workers.max(1);
        info!(concurrency, workers = worker_count, "Starting dispatcher");

        let (tx, rx) = mpsc::channel(concurrency);
        let rx = Arc::new(Mutex::new(rx));

        let intake = Intake {
            tx,
            cancel: ctx.cancel.clone(),
            metrics: ctx.metrics.clone(),
        };

        let ctx = Arc::new(ctx);
        let mut join_set = JoinSet::new();
        for id in 0..worker_count {
            let worker = Worker::new(id, ctx.clone(), rx.clone());
            join_set.spawn(worker.run());
            debug!(worker = id, "Spawned worker");
        }

        Self {
            intake,
            workers: join_set,
            worker_count,
        }
    }

    pub fn intake(&self) -> &Intake {
        &self.intake
    }

    pub async fn enqueue<F>(&self, task: Arc<Task>, abort: F) -> Enqueued
    where
        F: Future<Output = ()>,
    {
        self.intake.enqueue(task, abort).await
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Close the queue and wait for every worker to exit.
    ///
    /// Without cancellation the workers finish what is already queued first.
    /// Returns the first fatal worker error, if any.
    pub async fn shutdown(self) -> Result<(), DispatchError> {
        let Self {
            intake, mut workers, ..
        } = self;
        drop(intake);

        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let err = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(join_err) => {
                    error!(error = %join_err, "Worker task failed to join");
                    DispatchError::WorkerPanicked(join_err.to_string())
                }
            };
            first_error.get_or_insert(err);
        }

        info!("Dispatcher stopped");
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

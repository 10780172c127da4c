//! Dispatch tasks and their one-shot completion

use crate::source::{FileRef, ResolveError, join_path};
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;

/// Terminal failure of a task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("uri resolution failed after {attempts} attempts: {source}")]
    Resolve {
        attempts: u32,
        #[source]
        source: ResolveError,
    },

    #[error("engine reported failure: {0}")]
    Engine(String),
}

/// Completion hook, run synchronously inside [`Task::set_done`]. Must not block.
pub type TaskHook = Box<dyn Fn(&Task) + Send + Sync>;

/// One file's journey from discovery to a terminal outcome.
///
/// The walk side builds the task with its hooks; a worker assigns the job id
/// and finalizes it. Finalization happens exactly once: the first
/// [`set_done`](Task::set_done) wins a compare-and-swap, stores the outcome,
/// releases waiters and runs the hooks. Later calls are no-ops.
pub struct Task {
    file: FileRef,
    path_prefix: String,
    job_id: OnceLock<String>,
    finalized: AtomicBool,
    outcome: OnceLock<Option<TaskError>>,
    done: watch::Sender<bool>,
    hooks: Vec<TaskHook>,
}

impl Task {
    pub fn new(file: FileRef, path_prefix: impl Into<String>, hooks: Vec<TaskHook>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            file,
            path_prefix: path_prefix.into(),
            job_id: OnceLock::new(),
            finalized: AtomicBool::new(false),
            outcome: OnceLock::new(),
            done,
            hooks,
        }
    }

    pub fn file(&self) -> &FileRef {
        &self.file
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Prefix joined with the file name; the key used for completion tracking
    pub fn relative_path(&self) -> String {
        join_path(&self.path_prefix, &self.file.name)
    }

    /// Record the engine job id. Only the first assignment sticks.
    pub fn set_job_id(&self, job_id: impl Into<String>) -> bool {
        self.job_id.set(job_id.into()).is_ok()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.get().map(String::as_str)
    }

    pub fn is_done(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Terminal error, `None` while pending or after a clean finish
    pub fn error(&self) -> Option<&TaskError> {
        self.outcome.get().and_then(Option::as_ref)
    }

    /// Finalize the task. Returns `true` for the call that actually finalized.
    pub fn set_done(&self, error: Option<TaskError>) -> bool {
        if self
            .finalized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // Only the CAS winner reaches this point, so the cell is empty.
        let _ = self.outcome.set(error);
        self.done.send_replace(true);

        for hook in &self.hooks {
            hook(self);
        }
        true
    }

    /// Wait until the task has been finalized
    pub async fn wait_done(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("path", &self.relative_path())
            .field("job_id", &self.job_id())
            .field("done", &self.is_done())
            .field("error", &self.error())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

//! Dispatch workers
//!
//! Each worker drains the shared intake queue: pace the resolution call,
//! resolve URIs under retry, submit to the engine, then poll the job until it
//! reaches a definitive outcome.

pub mod limiter;
pub mod retry;
pub mod runner;

pub use limiter::RateLimiter;
pub use retry::{RetryError, RetryPolicy};
pub use runner::{DispatchError, Worker, WorkerContext};

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    /// Destination directory handed to the engine with every job
    pub output_dir: PathBuf,
    pub user_agent: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            output_dir: PathBuf::from("."),
            user_agent: None,
        }
    }
}

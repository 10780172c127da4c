use async_trait::async_trait;
use thiserror::Error;

use super::types::{JobOptions, JobReport};

/// Download engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown job: {0}")]
    UnknownJob(String),
    #[error("job rejected: {0}")]
    Rejected(String),
}

/// External job queue that performs the actual downloads.
///
/// A `poll` error means the engine no longer knows the job; callers treat it
/// as removed rather than failed.
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Queue a job fetching from any of `uris`; returns the engine's job id
    async fn submit(&self, uris: Vec<String>, options: JobOptions) -> Result<String, EngineError>;

    async fn poll(&self, job_id: &str) -> Result<JobReport, EngineError>;
}

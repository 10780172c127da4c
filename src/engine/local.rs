//! In-process engine that copies local files

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::traits::{DownloadEngine, EngineError};
use super::types::{JobOptions, JobReport, JobStatus};

const FILE_SCHEME: &str = "file://";

/// Copies the first `file://` URI of a job into `<dir>/<out>`.
///
/// Jobs move `waiting -> active -> complete | error` on a spawned tokio task.
/// Finished jobs stay queryable until [`forget`](CopyEngine::forget) is called.
#[derive(Debug, Clone, Default)]
pub struct CopyEngine {
    jobs: Arc<Mutex<HashMap<String, JobReport>>>,
}

impl CopyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a job as removed, as an operator would from the engine side
    pub fn remove(&self, job_id: &str) -> bool {
        match self.jobs.lock().get_mut(job_id) {
            Some(report) => {
                *report = JobReport::new(JobStatus::Removed);
                true
            }
            None => false,
        }
    }

    /// Drop a job from the engine entirely; later polls report it unknown
    pub fn forget(&self, job_id: &str) -> bool {
        self.jobs.lock().remove(job_id).is_some()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().len()
    }

    fn set_status(&self, job_id: &str, report: JobReport) {
        let mut jobs = self.jobs.lock();
        // A removed job stays removed even if the copy finishes afterwards.
        if let Some(current) = jobs.get_mut(job_id) {
            if current.status != JobStatus::Removed {
                *current = report;
            }
        }
    }
}

async fn copy_file(source: &Path, target: &Path) -> std::io::Result<u64> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, target).await
}

#[async_trait]
impl DownloadEngine for CopyEngine {
    async fn submit(&self, uris: Vec<String>, options: JobOptions) -> Result<String, EngineError> {
        let source = uris
            .iter()
            .find_map(|uri| uri.strip_prefix(FILE_SCHEME))
            .map(PathBuf::from)
            .ok_or_else(|| EngineError::Rejected(format!("no {} uri in {:?}", FILE_SCHEME, uris)))?;

        let out = options
            .get(JobOptions::OUT)
            .ok_or_else(|| EngineError::Rejected("missing 'out' option".to_string()))?;
        let dir = PathBuf::from(options.get(JobOptions::DIR).unwrap_or("."));
        let target = dir.join(out);

        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .lock()
            .insert(job_id.clone(), JobReport::new(JobStatus::Waiting));
        debug!(job_id, source = %source.display(), target = %target.display(), "Copy job queued");

        let engine = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            engine.set_status(&id, JobReport::new(JobStatus::Active));

            match copy_file(&source, &target).await {
                Ok(bytes) => {
                    debug!(job_id = id, bytes, "Copy job complete");
                    engine.set_status(&id, JobReport::new(JobStatus::Complete));
                }
                Err(e) => {
                    warn!(job_id = id, error = %e, "Copy job failed");
                    engine.set_status(&id, JobReport::failed(format!("{}: {}", source.display(), e)));
                }
            }
        });

        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobReport, EngineError> {
        self.jobs
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownJob(job_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn wait_terminal(engine: &CopyEngine, job_id: &str) -> JobReport {
        for _ in 0..200 {
            let report = engine.poll(job_id).await.unwrap();
            if report.status.is_terminal() {
                return report;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never finished", job_id);
    }

    #[tokio::test]
    async fn test_copy_job_completes() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        std::fs::write(&source, b"payload").unwrap();
        let out_dir = temp_dir.path().join("out");

        let engine = CopyEngine::new();
        let job_id = engine
            .submit(
                vec![
                    "https://mirror.invalid/source.txt".to_string(),
                    format!("file://{}", source.display()),
                ],
                JobOptions::new()
                    .output("R/sub/copy.txt")
                    .directory(out_dir.display().to_string()),
            )
            .await
            .unwrap();

        let report = wait_terminal(&engine, &job_id).await;
        assert_eq!(report.status, JobStatus::Complete);
        assert_eq!(
            std::fs::read(out_dir.join("R/sub/copy.txt")).unwrap(),
            b"payload"
        );
    }

    #[tokio::test]
    async fn test_missing_source_reports_error() {
        let temp_dir = TempDir::new().unwrap();
        let engine = CopyEngine::new();

        let job_id = engine
            .submit(
                vec![format!("file://{}", temp_dir.path().join("missing").display())],
                JobOptions::new()
                    .output("x")
                    .directory(temp_dir.path().display().to_string()),
            )
            .await
            .unwrap();

        let report = wait_terminal(&engine, &job_id).await;
        assert_eq!(report.status, JobStatus::Error);
        assert!(report.error_message.is_some());
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_input() {
        let engine = CopyEngine::new();

        let result = engine
            .submit(vec!["https://example.com/a".to_string()], JobOptions::new().output("a"))
            .await;
        assert!(matches!(result, Err(EngineError::Rejected(_))));

        let result = engine
            .submit(vec!["file:///tmp/a".to_string()], JobOptions::new())
            .await;
        assert!(matches!(result, Err(EngineError::Rejected(_))));
        assert_eq!(engine.job_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_and_forget() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a");
        std::fs::write(&source, b"a").unwrap();

        let engine = CopyEngine::new();
        let job_id = engine
            .submit(
                vec![format!("file://{}", source.display())],
                JobOptions::new()
                    .output("b")
                    .directory(temp_dir.path().display().to_string()),
            )
            .await
            .unwrap();

        assert!(engine.remove(&job_id));
        assert_eq!(engine.poll(&job_id).await.unwrap().status, JobStatus::Removed);

        assert!(engine.forget(&job_id));
        assert_eq!(
            engine.poll(&job_id).await,
            Err(EngineError::UnknownJob(job_id.clone()))
        );
        assert!(!engine.remove("nope"));
    }
}

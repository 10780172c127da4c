//! Scripted collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sharefetch::Pipeline;
use sharefetch::config::{Config, RetryConfig};
use sharefetch::engine::{DownloadEngine, EngineError, JobOptions, JobReport, JobStatus};
use sharefetch::source::{
    FileRef, ResolveError, ShareWalker, UriResolver, WalkControl, WalkError, WalkVisitor,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Walker over fixed, in-memory trees
#[derive(Default)]
pub struct ScriptedWalker {
    trees: HashMap<String, Vec<(String, FileRef)>>,
    transient_failures: AtomicU32,
    walks: AtomicU32,
}

impl ScriptedWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files as `(prefix, name)` pairs, visited in the given order
    pub fn with_root(mut self, root: &str, files: &[(&str, &str)]) -> Self {
        let entries = files
            .iter()
            .map(|(prefix, name)| {
                let id = format!("{}:{}/{}", root, prefix, name);
                (prefix.to_string(), FileRef::new(id, *name).with_size("1 KB"))
            })
            .collect();
        self.trees.insert(root.to_string(), entries);
        self
    }

    /// Fail the next `count` walks with a transient error
    pub fn failing_first(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn walks(&self) -> u32 {
        self.walks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShareWalker for ScriptedWalker {
    async fn walk(&self, root_id: &str, visitor: &mut dyn WalkVisitor) -> Result<(), WalkError> {
        self.walks.fetch_add(1, Ordering::SeqCst);

        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(WalkError::Transient("listing unavailable".to_string()));
        }

        let files = self
            .trees
            .get(root_id)
            .ok_or_else(|| WalkError::Transient(format!("unknown root {}", root_id)))?;

        for (prefix, file) in files {
            if visitor.visit(prefix, file).await == WalkControl::Stop {
                return Err(WalkError::Aborted);
            }
        }
        Ok(())
    }
}

/// Resolves every file to one fake URI, optionally coming back empty a few times first
#[derive(Default)]
pub struct FakeResolver {
    empty_first: Mutex<HashMap<String, u32>>,
    calls: AtomicU32,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty_first(self, name: &str, times: u32) -> Self {
        self.empty_first.lock().insert(name.to_string(), times);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UriResolver for FakeResolver {
    async fn resolve_uris(&self, file: &FileRef) -> Result<BTreeMap<String, String>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(remaining) = self.empty_first.lock().get_mut(&file.name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(BTreeMap::new());
            }
        }

        let mut uris = BTreeMap::new();
        uris.insert("primary".to_string(), format!("fake://{}", file.id));
        Ok(uris)
    }
}

/// What the fake engine reports for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Fail(String),
    /// Polling the job fails as if the engine never heard of it
    Unknown,
    Removed,
    /// Active until [`FakeEngine::release`] is called, then complete
    Hold,
}

/// Engine whose job outcomes are scripted per output path
#[derive(Default)]
pub struct FakeEngine {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    default_outcome: Mutex<Option<Outcome>>,
    rejected: Mutex<HashSet<String>>,
    jobs: Mutex<HashMap<String, (String, Outcome)>>,
    submissions: Mutex<Vec<String>>,
    successes: Mutex<Vec<String>>,
    options: Mutex<Vec<JobOptions>>,
    released: AtomicBool,
    next_id: AtomicU64,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes for successive submissions of `path`; later ones complete
    pub fn script(self, path: &str, outcomes: Vec<Outcome>) -> Self {
        self.scripts.lock().insert(path.to_string(), outcomes.into());
        self
    }

    /// Outcome for anything without a script
    pub fn by_default(self, outcome: Outcome) -> Self {
        *self.default_outcome.lock() = Some(outcome);
        self
    }

    pub fn reject(self, path: &str) -> Self {
        self.rejected.lock().insert(path.to_string());
        self
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submissions.lock().clone()
    }

    pub fn submissions_of(&self, path: &str) -> usize {
        self.submissions.lock().iter().filter(|p| *p == path).count()
    }

    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().clone()
    }

    pub fn submitted_options(&self) -> Vec<JobOptions> {
        self.options.lock().clone()
    }
}

#[async_trait]
impl DownloadEngine for FakeEngine {
    async fn submit(&self, uris: Vec<String>, options: JobOptions) -> Result<String, EngineError> {
        let path = options
            .get(JobOptions::OUT)
            .ok_or_else(|| EngineError::Rejected("missing out".to_string()))?
            .to_string();
        if uris.is_empty() || self.rejected.lock().contains(&path) {
            return Err(EngineError::Rejected(path));
        }

        let outcome = self
            .scripts
            .lock()
            .get_mut(&path)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.default_outcome.lock().clone())
            .unwrap_or(Outcome::Complete);

        let job_id = format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.jobs.lock().insert(job_id.clone(), (path.clone(), outcome));
        self.submissions.lock().push(path);
        self.options.lock().push(options);
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobReport, EngineError> {
        let (path, outcome) = self
            .jobs
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownJob(job_id.to_string()))?;

        match outcome {
            Outcome::Complete => {
                self.successes.lock().push(path);
                Ok(JobReport::new(JobStatus::Complete))
            }
            Outcome::Fail(message) => Ok(JobReport::failed(message)),
            Outcome::Unknown => Err(EngineError::UnknownJob(job_id.to_string())),
            Outcome::Removed => Ok(JobReport::new(JobStatus::Removed)),
            Outcome::Hold => {
                if self.released.load(Ordering::SeqCst) {
                    self.successes.lock().push(path);
                    Ok(JobReport::new(JobStatus::Complete))
                } else {
                    Ok(JobReport::new(JobStatus::Active))
                }
            }
        }
    }
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay_ms: 1,
        max_delay_ms: 5,
    }
}

/// Config with short timings suitable for tests
pub fn test_config(roots: &[&str], concurrency: usize, workers: usize) -> Config {
    let mut config = Config {
        roots: roots.iter().map(|r| r.to_string()).collect(),
        ..Default::default()
    };
    config.dispatch.concurrency = concurrency;
    config.dispatch.workers = Some(workers);
    config.dispatch.poll_interval_ms = 5;
    config.dispatch.resolve_rate_per_sec = 10_000;
    config.resolve_retry = fast_retry(3);
    config.walk.retry = fast_retry(3);
    config.output.directory = PathBuf::from("/downloads");
    config
}

pub fn pipeline(
    config: Config,
    walker: &Arc<ScriptedWalker>,
    resolver: &Arc<FakeResolver>,
    engine: &Arc<FakeEngine>,
) -> Pipeline {
    Pipeline::new(
        Arc::new(config),
        walker.clone(),
        resolver.clone(),
        engine.clone(),
        CancellationToken::new(),
    )
}

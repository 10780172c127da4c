use crate::worker::{RetryPolicy, WorkerConfig};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Root identifiers, walked in order
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub resolve_retry: RetryConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Queue and worker pool sizing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Intake queue capacity
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Worker count, defaults to `concurrency`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_resolve_rate_per_sec")]
    pub resolve_rate_per_sec: u32,
}

impl DispatchConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or(self.concurrency)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            workers: None,
            poll_interval_ms: default_poll_interval_ms(),
            resolve_rate_per_sec: default_resolve_rate_per_sec(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_resolve_rate_per_sec() -> u32 {
    30
}

/// Backoff settings; `max_attempts` includes the first call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_resolve_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .build()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_resolve_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_resolve_attempts() -> u32 {
    4
}

fn default_walk_attempts() -> u32 {
    11
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_walk_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: default_walk_attempts(),
        ..RetryConfig::default()
    }
}

/// A retry table as written, before defaults are filled in
#[derive(Deserialize)]
struct PartialRetryConfig {
    max_attempts: Option<u32>,
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

/// Fields left out of `[walk.retry]` fall back to the walk defaults, not the
/// resolve ones.
fn deserialize_walk_retry<'de, D>(deserializer: D) -> Result<RetryConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let partial = PartialRetryConfig::deserialize(deserializer)?;
    let defaults = default_walk_retry();
    Ok(RetryConfig {
        max_attempts: partial.max_attempts.unwrap_or(defaults.max_attempts),
        initial_delay_ms: partial.initial_delay_ms.unwrap_or(defaults.initial_delay_ms),
        max_delay_ms: partial.max_delay_ms.unwrap_or(defaults.max_delay_ms),
    })
}

/// Walk behaviour per root
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WalkConfig {
    /// Re-walks allowed per root before giving up; unbounded when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rewalks: Option<u32>,
    #[serde(
        default = "default_walk_retry",
        deserialize_with = "deserialize_walk_retry"
    )]
    pub retry: RetryConfig,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_rewalks: None,
            retry: default_walk_retry(),
        }
    }
}

/// Where and how finished downloads land
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            user_agent: None,
        }
    }
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_interval: self.dispatch.poll_interval(),
            output_dir: self.output.directory.clone(),
            user_agent: self.output.user_agent.clone(),
        }
    }
}

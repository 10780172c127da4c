use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Engine-side job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Waiting,
    Paused,
    Error,
    Complete,
    Removed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Waiting => "waiting",
            JobStatus::Paused => "paused",
            JobStatus::Error => "error",
            JobStatus::Complete => "complete",
            JobStatus::Removed => "removed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Error | JobStatus::Complete | JobStatus::Removed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of polling a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            error_message: Some(message.into()),
        }
    }
}

/// Submission options, passed to the engine as string pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions(BTreeMap<String, String>);

impl JobOptions {
    pub const OUT: &'static str = "out";
    pub const DIR: &'static str = "dir";
    pub const USER_AGENT: &'static str = "user-agent";

    pub fn new() -> Self {
        Self::default()
    }

    /// Output file name, relative to the destination directory
    pub fn output(self, out: impl Into<String>) -> Self {
        self.custom(Self::OUT, out)
    }

    pub fn directory(self, dir: impl Into<String>) -> Self {
        self.custom(Self::DIR, dir)
    }

    pub fn user_agent(self, user_agent: impl Into<String>) -> Self {
        self.custom(Self::USER_AGENT, user_agent)
    }

    pub fn custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

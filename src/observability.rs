//! Logging setup and run counters

use crate::humanize::ByteSize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `info` or
/// `sharefetch=debug`) is used.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Counters for a single run
#[derive(Debug, Default)]
pub struct Metrics {
    files_discovered: AtomicU64,
    files_skipped: AtomicU64,
    bytes_discovered: AtomicU64,
    tasks_queued: AtomicU64,
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_removed: AtomicU64,
    rewalks: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_discovered(&self, size: Option<ByteSize>) {
        self.files_discovered.fetch_add(1, Ordering::Relaxed);
        if let Some(size) = size {
            self.bytes_discovered.fetch_add(size.as_u64(), Ordering::Relaxed);
        }
    }

    pub fn file_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_queued(&self) {
        self.tasks_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_submitted", "Metric incremented");
    }

    pub fn task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_completed", "Metric incremented");
    }

    pub fn task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_failed", "Metric incremented");
    }

    pub fn task_removed(&self) {
        self.tasks_removed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_removed", "Metric incremented");
    }

    pub fn rewalk(&self) {
        self.rewalks.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "rewalks", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            bytes_discovered: ByteSize(self.bytes_discovered.load(Ordering::Relaxed)),
            tasks_queued: self.tasks_queued.load(Ordering::Relaxed),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_removed: self.tasks_removed.load(Ordering::Relaxed),
            rewalks: self.rewalks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_discovered: u64,
    pub files_skipped: u64,
    pub bytes_discovered: ByteSize,
    pub tasks_queued: u64,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_removed: u64,
    pub rewalks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = Metrics::new();
        metrics.file_discovered(Some(ByteSize(1024)));
        metrics.file_discovered(None);
        metrics.file_skipped();
        metrics.task_queued();
        metrics.task_submitted();
        metrics.task_completed();
        metrics.task_failed();
        metrics.task_removed();
        metrics.rewalk();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_discovered, 2);
        assert_eq!(snapshot.bytes_discovered, ByteSize(1024));
        assert_eq!(snapshot.files_skipped, 1);
        assert_eq!(snapshot.tasks_queued, 1);
        assert_eq!(snapshot.tasks_submitted, 1);
        assert_eq!(snapshot.tasks_completed, 1);
        assert_eq!(snapshot.tasks_failed, 1);
        assert_eq!(snapshot.tasks_removed, 1);
        assert_eq!(snapshot.rewalks, 1);
    }
}

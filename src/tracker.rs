use parking_lot::RwLock;
use std::collections::HashSet;

/// Relative paths of a root that finished successfully.
///
/// Read by the walk before a file becomes a task, written by completion hooks
/// running on worker tasks.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    finished: RwLock<HashSet<String>>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.finished.read().contains(path)
    }

    /// Returns `false` if the path was already recorded
    pub fn record(&self, path: impl Into<String>) -> bool {
        self.finished.write().insert(path.into())
    }

    pub fn len(&self) -> usize {
        self.finished.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.finished.read().is_empty()
    }
}

pub mod config;
pub mod engine;
pub mod humanize;
pub mod observability;
pub mod pipeline;
pub mod queue;
pub mod source;
pub mod task;
pub mod tracker;
pub mod walk;
pub mod worker;

pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use task::{Task, TaskError, TaskHook};
pub use tracker::CompletionTracker;

//! Download engine boundary
//!
//! Workers submit resolved URIs through [`DownloadEngine`] and poll the
//! returned job id until it reaches a terminal [`JobStatus`].

pub mod local;
pub mod traits;
pub mod types;

pub use local::CopyEngine;
pub use traits::{DownloadEngine, EngineError};
pub use types::{JobOptions, JobReport, JobStatus};

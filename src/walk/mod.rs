//! Walk coordination

pub mod coordinator;
pub mod signal;

pub use coordinator::{RootError, RootReport, WalkCoordinator};
pub use signal::RewalkSignal;

//! Bounded intake queue and the worker pool behind it

pub mod dispatcher;

pub use dispatcher::{Dispatcher, Enqueued, Intake};

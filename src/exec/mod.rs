//! # Execution abstractions.
//!
//! This module provides the executor seam between the scheduler and whatever
//! actually runs task bodies:
//! - [`Executor`] - trait for a sequential job runner
//! - [`Job`] - boxed one-shot unit of work
//! - [`SerialExecutor`] - provided single-worker implementation

mod executor;
mod serial;

pub use executor::{Executor, Job};
pub use serial::SerialExecutor;

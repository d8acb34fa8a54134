//! # Task tagging types.
//!
//! This module provides the types callers attach to a unit of work:
//! - [`TaskId`] - opaque semantic tag, used only for logging/metrics
//! - [`Priority`] - dispatch class deciding lane placement and gating

mod priority;

pub use priority::{Priority, TaskId};

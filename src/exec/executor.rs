//! # Executor contract consumed by the scheduler.
//!
//! The queue does not create threads of its own. Every task body and all
//! wrapper bookkeeping are dispatched as [`Job`]s onto a caller-supplied
//! [`Executor`].
//!
//! ## Contract
//! - `submit` must not block; it hands the job off and returns.
//! - Jobs must eventually run, **in submission order, one at a time**. The
//!   scheduler's accounting (`current_task`, the drain pump) assumes a
//!   sequential worker; a concurrent executor violates the queue's ordering
//!   guarantees.

use futures::future::BoxFuture;

/// A one-shot unit of work handed to an [`Executor`].
pub type Job = BoxFuture<'static, ()>;

/// Sequential executor abstraction.
///
/// Implementations must run submitted jobs eventually, preserving submission
/// order and never running two jobs concurrently. See
/// [`SerialExecutor`](crate::SerialExecutor) for the provided implementation.
pub trait Executor: Send + Sync + 'static {
    /// Hands a job off for eventual execution. Must not block.
    fn submit(&self, job: Job);
}

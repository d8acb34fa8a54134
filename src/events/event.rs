//! # Diagnostic events emitted by the task queue.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Task lifecycle**: queued, started, finished, dropped, timeout races
//! - **Queue lifecycle**: reset requested/completed, re-initialization
//! - **Recovery**: starvation-triggered force-unblock (internal error)
//!
//! The [`Event`] struct carries metadata such as timestamps, the task tag,
//! priority, queue depth, and the measured queueing/execution durations.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskgate::{Event, EventKind, Priority, TaskId};
//!
//! let ev = Event::new(EventKind::TaskFinished)
//!     .with_task(TaskId(7), Priority::UserFacing)
//!     .with_queue_delay(Duration::from_millis(12))
//!     .with_execution(Duration::from_millis(3));
//!
//! assert_eq!(ev.kind, EventKind::TaskFinished);
//! assert_eq!(ev.task_id, Some(TaskId(7)));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::tasks::{Priority, TaskId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle ===
    /// Task was appended to a lane (queue was delayed or backlogged).
    ///
    /// Sets:
    /// - `task_id`, `priority`
    /// - `depth`: lane depth after the append
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskQueued,

    /// Task body is about to run on the executor.
    ///
    /// Sets:
    /// - `task_id`, `priority`
    /// - `queue_delay_ms`: time spent between submission and start
    /// - `at`, `seq`
    TaskStarted,

    /// Task body finished; the completion report required of every task.
    ///
    /// Sets:
    /// - `task_id`, `priority`
    /// - `queue_delay_ms`: time spent between submission and start
    /// - `execution_ms`: time spent running the body
    /// - `at`, `seq`
    TaskFinished,

    /// A duplicate head-invalidate submission was dropped.
    ///
    /// Sets:
    /// - `task_id`: the dropped submission's tag
    /// - `reason`: anomaly label
    /// - `at`, `seq`
    TaskDropped,

    /// A task's timeout fired before the task started; the fallback ran
    /// instead.
    ///
    /// Sets:
    /// - `task_id`, `priority`
    /// - `at`, `seq`
    TaskTimedOut,

    /// A task attempted to start after losing the single-flight race to its
    /// timeout (or vice versa); it became a no-op.
    ///
    /// Sets:
    /// - `task_id`, `priority`
    /// - `reason`: which side lost
    /// - `at`, `seq`
    TaskPreempted,

    // === Queue lifecycle ===
    /// `initialize` was called on an already-initialized queue. The
    /// initializer still runs.
    ///
    /// Sets:
    /// - `task_id`
    /// - `reason`: anomaly label
    /// - `at`, `seq`
    ReinitializeWarned,

    /// `reset` discarded all queued work and flipped the queue into its
    /// delayed, uninitialized state.
    ///
    /// Sets:
    /// - `depth`: number of queued tasks discarded
    /// - `at`, `seq`
    QueueReset,

    /// `complete_reset` marked the queue initialized again.
    ///
    /// Sets:
    /// - `at`, `seq`
    ResetCompleted,

    // === Recovery ===
    /// The watchdog observed no task completions past the starvation timeout
    /// and force-unblocked the queue. This is the internal-error
    /// observability hook; the queue self-heals.
    ///
    /// Sets:
    /// - `reason`: anomaly message with the stall duration
    /// - `at`, `seq`
    StarvationRecovered,
}

/// Queue event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Tag of the task this event concerns, if any.
    pub task_id: Option<TaskId>,
    /// Priority of the task this event concerns, if any.
    pub priority: Option<Priority>,
    /// Time between submission and start, in milliseconds (compact).
    pub queue_delay_ms: Option<u32>,
    /// Time spent running the task body, in milliseconds (compact).
    pub execution_ms: Option<u32>,
    /// Lane depth (after enqueue) or discarded-task count (on reset).
    pub depth: Option<usize>,
    /// Human-readable reason (anomaly labels, race outcomes, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task_id: None,
            priority: None,
            queue_delay_ms: None,
            execution_ms: None,
            depth: None,
            reason: None,
        }
    }

    /// Attaches the task tag and priority.
    #[inline]
    pub fn with_task(mut self, id: TaskId, priority: Priority) -> Self {
        self.task_id = Some(id);
        self.priority = Some(priority);
        self
    }

    /// Attaches only a task tag (for events with no meaningful priority).
    #[inline]
    pub fn with_task_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches the queueing delay (stored as milliseconds).
    #[inline]
    pub fn with_queue_delay(mut self, d: Duration) -> Self {
        self.queue_delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches the execution duration (stored as milliseconds).
    #[inline]
    pub fn with_execution(mut self, d: Duration) -> Self {
        self.execution_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a lane depth or discard count.
    #[inline]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for the starvation internal-error event.
    #[inline]
    pub fn is_internal_error(&self) -> bool {
        matches!(self.kind, EventKind::StarvationRecovered)
    }
}

/// Saturating millisecond conversion into the compact `u32` event fields.
#[inline]
fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TaskQueued);
        let b = Event::new(EventKind::TaskQueued);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_compact_ms_saturates() {
        let huge = Duration::from_secs(u64::MAX / 2);
        let ev = Event::new(EventKind::TaskFinished).with_execution(huge);
        assert_eq!(ev.execution_ms, Some(u32::MAX));
    }
}

//! # Queued-task entries and wrapper variants.
//!
//! A submitted unit of work travels through the queue as an [`Entry`]: the
//! boxed body plus its tag, priority, submission timestamp, and wrapper
//! variant. The variants are a tagged enum, [`TaskKind`]; the scheduler keys
//! its pre/post hooks off the tag instead of virtual dispatch.
//!
//! ## Wrapper variants
//! ```text
//! Plain          pre: -                          post: -
//! Init           pre: -                          post: initialized = true
//! HeadInvalidate pre: waiting_for_head_reset=true post: start watchdog
//! HeadReset      pre: -                          post: clear wait, maybe
//!                                                      cancel watchdog
//! ```
//!
//! ## Timeout guard
//! An entry may carry a [`TimeoutGuard`]: a single-flight `started` flag
//! shared with a timer task, plus the timer's cancellation token. Exactly one
//! of {work, timeout fallback} ever runs; whichever side flips the flag first
//! wins, and cancel-after-fire is a safe no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::exec::Job;
use crate::tasks::{Priority, TaskId};

/// Wrapper variant, keyed by how the task interacts with queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    /// No hooks.
    Plain,
    /// Completion marks the queue initialized.
    Init,
    /// Start marks the head state invalid; completion arms the watchdog.
    HeadInvalidate,
    /// Completion clears the head-reset wait and disarms the watchdog when
    /// the queue is no longer delayed.
    HeadReset,
}

impl TaskKind {
    /// Maps a submission priority to its wrapper variant.
    ///
    /// `Init` is never produced here; only
    /// [`TaskQueue::initialize`](crate::TaskQueue::initialize) creates it.
    pub(crate) fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::HeadInvalidate => TaskKind::HeadInvalidate,
            Priority::HeadReset => TaskKind::HeadReset,
            _ => TaskKind::Plain,
        }
    }
}

/// Single-flight guard shared between a queued entry and its timeout timer.
#[derive(Clone)]
pub(crate) struct TimeoutGuard {
    /// Flipped by whichever of {work, timeout} fires first.
    pub started: Arc<AtomicBool>,
    /// Cancels the pending timer; idempotent, safe after the timer fired.
    pub timer: CancellationToken,
}

impl TimeoutGuard {
    pub(crate) fn new() -> Self {
        Self {
            started: Arc::new(AtomicBool::new(false)),
            timer: CancellationToken::new(),
        }
    }

    /// Attempts to claim the single flight. Returns true for the winner.
    pub(crate) fn claim(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    /// True once the flight has been claimed (or the guard defused): the
    /// entry's work can no longer run.
    pub(crate) fn is_spent(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Marks the guard spent and cancels the timer, so neither side can run.
    /// Used when a queued entry is discarded before starting.
    pub(crate) fn defuse(&self) {
        self.started.store(true, Ordering::SeqCst);
        self.timer.cancel();
    }
}

/// A queued (or about-to-dispatch) unit of work.
pub(crate) struct Entry {
    /// Semantic tag, for logging/metrics only.
    pub id: TaskId,
    /// Dispatch class; decides lane placement and gating.
    pub priority: Priority,
    /// Wrapper variant; decides pre/post hooks.
    pub kind: TaskKind,
    /// Monotonic submission timestamp, for queueing-delay metrics.
    pub submitted_at: Instant,
    /// The task body.
    pub work: Job,
    /// Present when the submission carried a timeout fallback.
    pub guard: Option<TimeoutGuard>,
}

impl Entry {
    pub(crate) fn new(id: TaskId, priority: Priority, kind: TaskKind, work: Job) -> Self {
        Self {
            id,
            priority,
            kind,
            submitted_at: Instant::now(),
            work,
            guard: None,
        }
    }

    pub(crate) fn with_guard(mut self, guard: TimeoutGuard) -> Self {
        self.guard = Some(guard);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_maps_to_kind() {
        assert_eq!(TaskKind::for_priority(Priority::Immediate), TaskKind::Plain);
        assert_eq!(TaskKind::for_priority(Priority::UserFacing), TaskKind::Plain);
        assert_eq!(TaskKind::for_priority(Priority::Background), TaskKind::Plain);
        assert_eq!(
            TaskKind::for_priority(Priority::HeadInvalidate),
            TaskKind::HeadInvalidate
        );
        assert_eq!(TaskKind::for_priority(Priority::HeadReset), TaskKind::HeadReset);
    }

    #[test]
    fn test_claim_is_single_flight() {
        let guard = TimeoutGuard::new();
        assert!(guard.claim());
        assert!(!guard.claim());
        assert!(!guard.claim());
    }

    #[test]
    fn test_defuse_blocks_both_sides() {
        let guard = TimeoutGuard::new();
        guard.defuse();
        assert!(!guard.claim());
        assert!(guard.timer.is_cancelled());
        // Cancel-after-fire stays a no-op.
        guard.timer.cancel();
    }
}

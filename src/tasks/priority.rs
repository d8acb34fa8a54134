//! # Task tags: identity and dispatch class.
//!
//! [`TaskId`] identifies a task's semantic kind for logs and metrics only;
//! the scheduler never branches on it. [`Priority`] decides which lane a
//! task waits in and when that lane may drain.
//!
//! ## Lanes
//! ```text
//! Immediate ───────┐
//! HeadInvalidate ──┼──► immediate lane   (drains even while delayed)
//! HeadReset ───────┘
//! UserFacing ─────────► user lane        (drains only when not delayed)
//! Background ─────────► background lane  (drains only when not delayed,
//!                                         after the other lanes are empty)
//! ```

use std::fmt;

/// Opaque tag identifying a task's semantic kind.
///
/// Used only for logging and metrics; the scheduler never inspects it for
/// dispatch decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Dispatch class of a submitted task.
///
/// Ordering across classes is strict: the immediate lane drains before the
/// user lane, which drains before the background lane. Within a lane, tasks
/// run in FIFO order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Runs as soon as no task is executing, even while the queue is delayed.
    Immediate,
    /// Immediate-class task that marks the protected head state invalid.
    /// Deduplicated: a second head-invalidate while one is queued is dropped.
    HeadInvalidate,
    /// Immediate-class task that completes a head rebuild; pairs with a
    /// prior [`Priority::HeadInvalidate`].
    HeadReset,
    /// Work a user is waiting on. Gated by the delayed flag.
    UserFacing,
    /// Deferrable work. Gated by the delayed flag; drained last.
    Background,
}

impl Priority {
    /// True for the three priorities that share the immediate lane.
    #[inline]
    pub fn is_immediate_class(self) -> bool {
        matches!(
            self,
            Priority::Immediate | Priority::HeadInvalidate | Priority::HeadReset
        )
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            Priority::Immediate => "immediate",
            Priority::HeadInvalidate => "head_invalidate",
            Priority::HeadReset => "head_reset",
            Priority::UserFacing => "user_facing",
            Priority::Background => "background",
        }
    }

    /// Stable index for per-priority counters, matching the order of
    /// [`QueueStats::submitted`](crate::QueueStats::submitted).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Priority::Immediate => 0,
            Priority::HeadInvalidate => 1,
            Priority::HeadReset => 2,
            Priority::UserFacing => 3,
            Priority::Background => 4,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_class_membership() {
        assert!(Priority::Immediate.is_immediate_class());
        assert!(Priority::HeadInvalidate.is_immediate_class());
        assert!(Priority::HeadReset.is_immediate_class());
        assert!(!Priority::UserFacing.is_immediate_class());
        assert!(!Priority::Background.is_immediate_class());
    }

    #[test]
    fn test_indexes_are_distinct() {
        let all = [
            Priority::Immediate,
            Priority::HeadInvalidate,
            Priority::HeadReset,
            Priority::UserFacing,
            Priority::Background,
        ];
        let mut seen = [false; 5];
        for p in all {
            assert!(!seen[p.index()]);
            seen[p.index()] = true;
        }
    }
}

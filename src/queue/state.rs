//! # Scheduler state: lanes, gating flags, and diagnostic counters.
//!
//! [`QueueState`] is the single mutual-exclusion domain of the queue. Every
//! mutation - enqueue, dequeue, flag flips, counters, watchdog handle - goes
//! through one `std::sync::Mutex<QueueState>` held briefly; wrapper hooks
//! mutate it from executor context while query methods read it from any
//! thread.
//!
//! ## Rules
//! - `delayed == !initialized || waiting_for_head_reset`
//! - The immediate lane holds `Immediate`, `HeadInvalidate`, and `HeadReset`
//!   tasks together, in FIFO order.
//! - The user and background lanes only drain while not delayed.
//! - `inflight` counts jobs handed to the executor but not yet completed;
//!   the drain pump is suppressed while it is non-zero.

use std::collections::VecDeque;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::tasks::{Priority, TaskId};

use super::entry::Entry;

/// Snapshot of the queue's diagnostic counters.
///
/// Purely observational; nothing in the scheduler branches on these.
#[derive(Clone, Debug, Default)]
pub struct QueueStats {
    /// Submissions per priority, indexed by [`Priority::index`] order:
    /// immediate, head-invalidate, head-reset, user-facing, background.
    pub submitted: [u64; 5],
    /// Highest depth the immediate lane has reached.
    pub max_immediate_depth: usize,
    /// Highest depth the user lane has reached.
    pub max_user_depth: usize,
    /// Highest depth the background lane has reached.
    pub max_background_depth: usize,
    /// Queued tasks discarded by `reset`.
    pub discarded: u64,
    /// Duplicate head-invalidate submissions dropped.
    pub duplicates_dropped: u64,
    /// Times the watchdog force-unblocked a starved queue.
    pub starvation_recoveries: u64,
}

/// Mutable scheduler state. Lives inside the queue's mutex.
pub(crate) struct QueueState {
    /// Immediate-class lane (Immediate, HeadInvalidate, HeadReset).
    pub immediate: VecDeque<Entry>,
    /// User-facing lane.
    pub user: VecDeque<Entry>,
    /// Background lane.
    pub background: VecDeque<Entry>,

    /// False until the one-time initialization task completes.
    pub initialized: bool,
    /// True between a head-invalidate starting and its paired head-reset
    /// completing.
    pub waiting_for_head_reset: bool,

    /// Jobs dispatched to the executor and not yet completed.
    pub inflight: usize,
    /// Tag of the most recently dispatched task, for `is_idle` and logs.
    pub current_task: Option<(TaskId, Priority)>,

    /// Updated on every drain invocation and task completion; the watchdog
    /// compares against it to detect starvation.
    pub last_task_finished_at: Instant,
    /// Present exactly while a watchdog loop is scheduled.
    pub watchdog: Option<CancellationToken>,

    /// Diagnostic counters.
    pub stats: QueueStats,
}

impl QueueState {
    pub(crate) fn new() -> Self {
        Self {
            immediate: VecDeque::new(),
            user: VecDeque::new(),
            background: VecDeque::new(),
            initialized: false,
            waiting_for_head_reset: false,
            inflight: 0,
            current_task: None,
            last_task_finished_at: Instant::now(),
            watchdog: None,
            stats: QueueStats::default(),
        }
    }

    /// Only immediate-class tasks may run while this is true.
    #[inline]
    pub(crate) fn is_delayed(&self) -> bool {
        !self.initialized || self.waiting_for_head_reset
    }

    /// Any queued (not yet dispatched) task across the three lanes.
    #[inline]
    pub(crate) fn has_backlog(&self) -> bool {
        !self.immediate.is_empty() || !self.user.is_empty() || !self.background.is_empty()
    }

    /// True when a head-invalidate submission is already waiting in the
    /// immediate lane.
    ///
    /// An entry whose timeout guard is spent can no longer run; it must not
    /// suppress a fresh invalidation signal.
    pub(crate) fn has_queued_head_invalidate(&self) -> bool {
        self.immediate.iter().any(|e| {
            e.priority == Priority::HeadInvalidate
                && e.guard.as_ref().map_or(true, |g| !g.is_spent())
        })
    }

    /// Appends the entry to its lane and returns that lane's new depth.
    pub(crate) fn enqueue(&mut self, entry: Entry) -> usize {
        let lane = match entry.priority {
            p if p.is_immediate_class() => &mut self.immediate,
            Priority::UserFacing => &mut self.user,
            _ => &mut self.background,
        };
        lane.push_back(entry);
        let depth = lane.len();

        self.stats.max_immediate_depth = self.stats.max_immediate_depth.max(self.immediate.len());
        self.stats.max_user_depth = self.stats.max_user_depth.max(self.user.len());
        self.stats.max_background_depth =
            self.stats.max_background_depth.max(self.background.len());
        depth
    }

    /// Picks the next runnable entry per the drain rule: the immediate lane
    /// unconditionally, then the user and background lanes only while not
    /// delayed.
    pub(crate) fn pop_next(&mut self) -> Option<Entry> {
        if let Some(e) = self.immediate.pop_front() {
            return Some(e);
        }
        if self.is_delayed() {
            return None;
        }
        self.user.pop_front().or_else(|| self.background.pop_front())
    }

    /// Discards all queued entries, returning them so the caller can defuse
    /// any pending timeout guards outside the lock.
    pub(crate) fn clear_lanes(&mut self) -> Vec<Entry> {
        let mut dropped =
            Vec::with_capacity(self.immediate.len() + self.user.len() + self.background.len());
        dropped.extend(self.immediate.drain(..));
        dropped.extend(self.user.drain(..));
        dropped.extend(self.background.drain(..));
        self.stats.discarded += dropped.len() as u64;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::entry::{TaskKind, TimeoutGuard};

    fn entry(priority: Priority) -> Entry {
        Entry::new(
            TaskId(0),
            priority,
            TaskKind::for_priority(priority),
            Box::pin(async {}),
        )
    }

    #[tokio::test]
    async fn test_delay_gates_user_and_background_lanes() {
        let mut st = QueueState::new();
        st.enqueue(entry(Priority::UserFacing));
        st.enqueue(entry(Priority::Background));
        assert!(st.is_delayed());
        assert!(st.pop_next().is_none());

        st.initialized = true;
        assert_eq!(st.pop_next().unwrap().priority, Priority::UserFacing);
        assert_eq!(st.pop_next().unwrap().priority, Priority::Background);
        assert!(st.pop_next().is_none());
    }

    #[tokio::test]
    async fn test_immediate_lane_drains_while_delayed() {
        let mut st = QueueState::new();
        st.enqueue(entry(Priority::UserFacing));
        st.enqueue(entry(Priority::HeadReset));
        assert!(st.is_delayed());
        assert_eq!(st.pop_next().unwrap().priority, Priority::HeadReset);
        assert!(st.pop_next().is_none());
    }

    #[tokio::test]
    async fn test_max_depth_counters_track_high_water_marks() {
        let mut st = QueueState::new();
        st.enqueue(entry(Priority::Background));
        st.enqueue(entry(Priority::Background));
        st.enqueue(entry(Priority::Immediate));
        assert_eq!(st.stats.max_background_depth, 2);
        assert_eq!(st.stats.max_immediate_depth, 1);

        st.initialized = true;
        while st.pop_next().is_some() {}
        assert_eq!(st.stats.max_background_depth, 2);
    }

    #[tokio::test]
    async fn test_spent_guard_entry_is_not_a_duplicate() {
        let mut st = QueueState::new();
        let guard = TimeoutGuard::new();
        let e = Entry::new(
            TaskId(1),
            Priority::HeadInvalidate,
            TaskKind::HeadInvalidate,
            Box::pin(async {}),
        )
        .with_guard(guard.clone());
        st.enqueue(e);
        assert!(st.has_queued_head_invalidate());

        // The timer side wins the race; the queued entry is a husk now.
        guard.claim();
        assert!(!st.has_queued_head_invalidate());
    }

    #[tokio::test]
    async fn test_clear_lanes_counts_discards() {
        let mut st = QueueState::new();
        st.enqueue(entry(Priority::Immediate));
        st.enqueue(entry(Priority::UserFacing));
        st.enqueue(entry(Priority::Background));
        let dropped = st.clear_lanes();
        assert_eq!(dropped.len(), 3);
        assert_eq!(st.stats.discarded, 3);
        assert!(!st.has_backlog());
    }
}

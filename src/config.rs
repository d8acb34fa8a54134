//! # Queue configuration.
//!
//! Provides [`QueueConfig`], the settings consumed by
//! [`TaskQueue::new`](crate::TaskQueue::new).
//!
//! ## Field semantics
//! - `starvation_check_period`: interval between watchdog ticks while the
//!   queue is delayed or backlogged
//! - `starvation_timeout`: how long the queue may go without a task
//!   completion before the watchdog force-unblocks it
//! - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)

use std::time::Duration;

/// Configuration for a [`TaskQueue`](crate::TaskQueue).
///
/// Defines:
/// - **Starvation recovery**: check period and timeout for the watchdog
/// - **Event system**: bus capacity for diagnostic event delivery
///
/// ## Notes
/// `starvation_timeout` should be a small multiple of
/// `starvation_check_period`; the watchdog can only observe starvation at
/// tick granularity, so recovery fires within one check period of the
/// timeout elapsing.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Interval between starvation watchdog ticks.
    ///
    /// The watchdog runs only while the queue is delayed or has backlog;
    /// it self-cancels once neither holds.
    pub starvation_check_period: Duration,

    /// Maximum time without a task completion before the watchdog
    /// force-unblocks the queue.
    ///
    /// On force-unblock the queue sets `initialized = true`, clears the
    /// head-reset wait, publishes an internal-error event, and resumes
    /// draining. This is self-healing, never fatal.
    pub starvation_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// will receive `Lagged` and skip older items. Minimum value is 1
    /// (enforced by the bus).
    pub bus_capacity: usize,
}

impl QueueConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `starvation_check_period = 6s`
    /// - `starvation_timeout = 15s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            starvation_check_period: Duration::from_secs(6),
            starvation_timeout: Duration::from_secs(15),
            bus_capacity: 1024,
        }
    }
}

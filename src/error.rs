//! Error types used for queue diagnostics.
//!
//! The queue never returns errors to callers: every anomaly is either a logged
//! no-op (duplicate head-invalidate, double initialization) or self-healing
//! (starvation). [`QueueError`] exists so those anomalies have a typed,
//! stable shape when they are attached to diagnostic events.
//!
//! Helper methods (`as_label`, `as_message`) mirror the label/message split
//! used for logs and metrics.

use std::time::Duration;

use thiserror::Error;

/// # Anomalies observed by the task queue.
///
/// None of these abort scheduling. They are published on the event bus as
/// `reason` strings and, for [`QueueError::Starved`], as a distinct
/// internal-error event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// No task completed for at least the starvation timeout while the queue
    /// was delayed; the queue force-unblocked itself.
    #[error("no task finished for {stalled:?}; forcing queue unblock")]
    Starved {
        /// How long the queue went without a task completion.
        stalled: Duration,
    },

    /// A head-invalidate task was submitted while another one was still
    /// queued. The duplicate is dropped.
    #[error("head-invalidate already queued; duplicate dropped")]
    DuplicateHeadInvalidate,

    /// `initialize` was called after the queue was already initialized.
    /// The task still runs.
    #[error("queue already initialized; running initializer anyway")]
    AlreadyInitialized,

    /// A task and its timeout raced; the named side lost and became a no-op.
    #[error("timeout race lost by {loser}")]
    TimeoutRaceLost {
        /// Which side lost: `"work"` or `"timeout"`.
        loser: &'static str,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use taskgate::QueueError;
    ///
    /// let err = QueueError::Starved { stalled: Duration::from_secs(15) };
    /// assert_eq!(err.as_label(), "queue_starved");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Starved { .. } => "queue_starved",
            QueueError::DuplicateHeadInvalidate => "duplicate_head_invalidate",
            QueueError::AlreadyInitialized => "already_initialized",
            QueueError::TimeoutRaceLost { .. } => "timeout_race_lost",
        }
    }

    /// Returns a human-readable message with details about the anomaly.
    pub fn as_message(&self) -> String {
        match self {
            QueueError::Starved { stalled } => format!("starved for {stalled:?}"),
            QueueError::DuplicateHeadInvalidate => "duplicate head-invalidate".to_string(),
            QueueError::AlreadyInitialized => "already initialized".to_string(),
            QueueError::TimeoutRaceLost { loser } => format!("timeout race lost by {loser}"),
        }
    }
}

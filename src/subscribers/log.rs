//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [queued] task#3 priority=background depth=2
//! [finished] task#3 priority=background queue_delay=12ms execution=3ms
//! [dropped] task#5 reason="duplicate head-invalidate"
//! [starvation-recovered] reason="starved for 15s"
//! [reset] discarded=4
//! ```
//!
//! Not intended for production use - implement a custom
//! [`Subscribe`](crate::Subscribe) for structured logging or metrics.

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let id = e.task_id.map(|t| t.to_string()).unwrap_or_default();
        match e.kind {
            EventKind::TaskQueued => {
                println!(
                    "[queued] {id} priority={:?} depth={:?}",
                    e.priority.map(|p| p.as_label()),
                    e.depth
                );
            }
            EventKind::TaskStarted => {
                println!(
                    "[started] {id} priority={:?} queue_delay={:?}ms",
                    e.priority.map(|p| p.as_label()),
                    e.queue_delay_ms
                );
            }
            EventKind::TaskFinished => {
                println!(
                    "[finished] {id} priority={:?} queue_delay={:?}ms execution={:?}ms",
                    e.priority.map(|p| p.as_label()),
                    e.queue_delay_ms,
                    e.execution_ms
                );
            }
            EventKind::TaskDropped => {
                println!("[dropped] {id} reason={:?}", e.reason);
            }
            EventKind::TaskTimedOut => {
                println!("[timed-out] {id} priority={:?}", e.priority.map(|p| p.as_label()));
            }
            EventKind::TaskPreempted => {
                println!("[preempted] {id} reason={:?}", e.reason);
            }
            EventKind::ReinitializeWarned => {
                println!("[reinitialize] {id} reason={:?}", e.reason);
            }
            EventKind::QueueReset => {
                println!("[reset] discarded={:?}", e.depth);
            }
            EventKind::ResetCompleted => {
                println!("[reset-completed]");
            }
            EventKind::StarvationRecovered => {
                println!("[starvation-recovered] reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}

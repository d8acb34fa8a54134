//! # taskgate
//!
//! **Taskgate** is a priority task queue for sequencing background work over
//! a single sequential executor. It provides three priority lanes, a
//! delay/backlog gate tied to a head-invalidate/head-reset protocol, optional
//! per-task start-deadline fallbacks, and a starvation-recovery watchdog.
//! The crate is designed as a building block for session managers that must
//! serialize work against a piece of state that can be invalidated and
//! rebuilt out of band.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  execute(id, priority, work)        initialize / reset / complete_reset
//!            │                                       │
//!            ▼                                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskQueue                                                        │
//! │  - three FIFO lanes (immediate / user / background)               │
//! │  - gating flags (initialized, waiting_for_head_reset)             │
//! │  - drain pump (strict priority, FIFO within a lane)               │
//! │  - starvation watchdog (force-unblock after a stall)              │
//! └──────────────┬──────────────────────────────┬─────────────────────┘
//!                │ jobs, in order               │ Events
//!                ▼                              ▼
//!      ┌──────────────────┐           ┌──────────────────────┐
//!      │ Executor          │           │ Bus (broadcast chan) │
//!      │ (SerialExecutor:  │           └──────────┬───────────┘
//!      │  one worker task) │                      ▼
//!      └──────────────────┘              SubscriberSet ─► on_event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! TaskQueue::new()            → uninitialized, delayed
//! initialize(work)            → work runs immediate-class; completion
//!                               flips initialized, gated lanes drain
//! execute(.., HeadInvalidate) → waiting_for_head_reset = true before the
//!                               body runs; completion arms the watchdog
//! execute(.., HeadReset)      → completion clears the wait, disarms the
//!                               watchdog, gated lanes drain
//! reset()                     → queued work discarded, queue delayed,
//!                               watchdog armed
//! complete_reset()            → initialized again, draining resumes
//! (starvation)                → watchdog force-unblocks, publishes an
//!                               internal-error event, draining resumes
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types / traits            |
//! |-----------------|---------------------------------------------------------|-------------------------------|
//! | **Scheduling**  | Priority lanes, delay gating, FIFO drain.               | [`TaskQueue`], [`Priority`]   |
//! | **Execution**   | Sequential executor seam and provided implementation.   | [`Executor`], [`SerialExecutor`] |
//! | **Timeouts**    | Start-deadline fallbacks with single-flight resolution. | [`TaskQueue::execute_with_timeout`] |
//! | **Diagnostics** | Per-task timing reports and anomaly events.             | [`Event`], [`EventKind`], [`Bus`] |
//! | **Subscribers** | Hook into queue events (logging, metrics, alerts).      | [`Subscribe`], [`SubscriberSet`] |
//! | **Errors**      | Typed anomaly descriptions for logs/metrics.            | [`QueueError`]                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskgate::{Priority, QueueConfig, SerialExecutor, TaskId, TaskQueue};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let queue = TaskQueue::new(QueueConfig::default(), SerialExecutor::spawn());
//!
//!     // One-time initialization; gated lanes drain once it completes.
//!     queue.initialize(TaskId(0), async {
//!         // load session state...
//!     });
//!
//!     // User-facing work, with a fallback if it cannot start in time.
//!     queue.execute_with_timeout(
//!         TaskId(1),
//!         Priority::UserFacing,
//!         async { /* refresh content... */ },
//!         async { /* show cached content instead */ },
//!         Duration::from_millis(500),
//!     );
//!
//!     // Deferred cleanup runs after everything else.
//!     queue.execute(TaskId(2), Priority::Background, async {
//!         // trim caches...
//!     });
//! }
//! ```

mod config;
mod error;
mod events;
mod exec;
mod queue;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::QueueConfig;
pub use error::QueueError;
pub use events::{Bus, Event, EventKind};
pub use exec::{Executor, Job, SerialExecutor};
pub use queue::{QueueStats, TaskQueue};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Priority, TaskId};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

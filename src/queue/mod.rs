//! Scheduler core: lanes, gating, wrappers, and starvation recovery.
//!
//! The only public API from this module is [`TaskQueue`] (plus the
//! [`QueueStats`] snapshot it exposes).
//!
//! Internal modules:
//! - [`scheduler`]: the queue itself - submission, dispatch, drain, hooks;
//! - [`state`]: the mutex-guarded lanes, flags, and counters;
//! - [`entry`]: queued-task entries, wrapper variants, timeout guard;
//! - [`watchdog`]: the starvation recovery loop.

mod entry;
mod scheduler;
mod state;
mod watchdog;

pub use scheduler::TaskQueue;
pub use state::QueueStats;

//! Queue diagnostics: event types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to diagnostic events emitted by the scheduler, its
//! wrapper hooks, and the starvation watchdog.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: [`TaskQueue`](crate::TaskQueue) (enqueue/dispatch/reset
//!   paths, wrapper completion hooks, starvation watchdog).
//! - **Consumers**: the listener spawned by
//!   [`TaskQueue::attach_subscribers`](crate::TaskQueue::attach_subscribers),
//!   which fans out to a [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

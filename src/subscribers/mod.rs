//! # Event subscribers for queue diagnostics.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used to deliver [`Event`](crate::events::Event)s emitted by the
//! queue.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   TaskQueue ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                            │
//!                                                  ┌─────────┼─────────┐
//!                                                  ▼         ▼         ▼
//!                                              LogWriter   Metrics   Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```rust
//! use async_trait::async_trait;
//! use taskgate::{Event, EventKind, Subscribe};
//!
//! struct StarvationAlert;
//!
//! #[async_trait]
//! impl Subscribe for StarvationAlert {
//!     async fn on_event(&self, event: &Event) {
//!         if event.is_internal_error() {
//!             // page someone...
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "starvation_alert" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

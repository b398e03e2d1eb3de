//! # Event subscribers for the faultvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//!   runner / recovery / ledger ── publish(Event) ──► Bus ──► SubscriberSet::emit
//!                                                               │
//!                                                     ┌─────────┼─────────┐
//!                                                     ▼         ▼         ▼
//!                                                 LogWriter  Metrics   Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use faultvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct FaultCounter;
//!
//! #[async_trait]
//! impl Subscribe for FaultCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::FaultInjected {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "fault-counter"
//!     }
//! }
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the supervision loop,
//! the recovery controller, the checkpoint ledger and the output relays.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`OutputStream`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `core::runner`, `core::recovery`, `Supervisor`, `CheckpointLedger`,
//!   output relays.
//! - **Consumers**: the supervisor's bus listener, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, OutputStream};

//! Runtime core: supervision, recovery and termination.
//!
//! The public API of this module is [`Supervisor`] (built through
//! [`SupervisorBuilder`]) and [`Termination`].
//!
//! Internal modules:
//! - [`runner`]: supervises one process instance (checkpoint and fault timers);
//! - [`recovery`]: restores from the newest usable checkpoint until a clean exit;
//! - [`supervisor`]: wires the bus, ledger and backends, races the run against termination;
//! - [`lifecycle`]: OS signals and the run deadline.

mod builder;
mod lifecycle;
mod recovery;
mod runner;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use lifecycle::{Termination, wait_for_shutdown_signal, wait_for_termination};
pub use supervisor::Supervisor;

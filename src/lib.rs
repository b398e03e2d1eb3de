//! # faultvisor
//!
//! **Faultvisor** runs a single program under checkpoint/restart supervision
//! while injecting transient faults into it, and recovers from abnormal exits
//! by resuming the newest usable checkpoint.
//!
//! Checkpointing and fault injection are delegated to external facilities
//! ([`CheckpointBackend`], [`FaultInjector`]); the crate only orchestrates
//! them and accounts for their overhead.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                       ┌──────────────────────────┐
//!                       │  Launch (CommandSpec)    │
//!                       └────────────┬─────────────┘
//!                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Bus (broadcast events)                                         │
//! │  - CheckpointLedger (bounded, owns artifact deletion)             │
//! │  - CheckpointBackend / FaultInjector                              │
//! │  - termination watcher (OS signal, deadline)                      │
//! └──────┬────────────────────────────────────────────────────┬───────┘
//!        ▼                                                    │
//!   RecoveryController (restore loop)                         │
//!        │                                                    │
//!        ▼                                                    │
//!   supervise(process)                                        │
//!     ├─ CheckpointTimer (fixed rate) ─► backend.checkpoint   │
//!     ├─ PoissonTimer (exponential)   ─► injector.inject      │
//!     └─ process exit                                         │
//!        │ Publishes Events                                   │
//!        ▼                                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                  (capacity: Config::bus_capacity)                 │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                            SubscriberSet ──► LogWriter, custom subscribers
//! ```
//!
//! ### Recovery
//! ```text
//! launch ──► supervise ── clean exit ──► Success (drain ledger)
//!                │
//!                └─ abnormal exit
//!                     ├─ newest record retries < limit ─► retries += 1, restore, supervise
//!                     ├─ newest record retries = limit ─► evict, try next-older
//!                     └─ ledger empty                  ─► Failure (drain ledger)
//! ```
//!
//! ## Features
//! | Area               | Description                                                   | Key types / traits                              |
//! |--------------------|---------------------------------------------------------------|-------------------------------------------------|
//! | **Supervision**    | Run a program to a verdict with checkpoints and restores.     | [`Supervisor`], [`Launch`], [`CommandSpec`]     |
//! | **Backends**       | External checkpoint/restore and fault-injection facilities.   | [`CheckpointBackend`], [`FaultInjector`]        |
//! | **Timers**         | Fixed-rate checkpoints, Poisson-distributed faults.           | [`CheckpointTimer`], [`PoissonTimer`]           |
//! | **Subscriber API** | Hook into runtime events (logging, metrics, custom sinks).    | [`Subscribe`], [`LogWriter`]                    |
//! | **Errors**         | Typed errors for the runtime, backends and processes.         | [`RuntimeError`], [`AbortedRun`], [`BackendError`], [`ProcessError`] |
//! | **Reporting**      | Attempts, counters and overhead of a finished run.            | [`RunReport`], [`Verdict`]                      |
//! | **Configuration**  | Centralize run settings.                                      | [`Config`]                                      |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use faultvisor::{BlcrBackend, CommandSpec, Config, KfiInjector, LogWriter, Subscribe, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         checkpoint_interval: Duration::from_secs(30),
//!         retention: 3,
//!         retry_limit: 2,
//!         fault_interval: Duration::from_secs(120),
//!         ..Config::default()
//!     };
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let sup = Supervisor::builder(cfg, Arc::new(BlcrBackend::new()))
//!         .with_injector(Arc::new(KfiInjector::new()))
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let program = CommandSpec::new("./simulation --steps 100000")
//!         .with_preload(BlcrBackend::DEFAULT_PRELOAD);
//!     let report = sup.run(&program).await?;
//!     println!("verdict: {:?}, faults: {}", report.verdict, report.faults);
//!     sup.close().await;
//!     Ok(())
//! }
//! ```
mod backends;
mod config;
mod core;
mod error;
mod events;
mod ledger;
mod process;
mod stats;
mod subscribers;
mod timers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use backends::{BlcrBackend, CheckpointBackend, FaultInjector, KfiInjector};
pub use config::{Config, RestoreFailurePolicy};
pub use crate::core::{Supervisor, SupervisorBuilder, Termination, wait_for_shutdown_signal, wait_for_termination};
pub use error::{AbortedRun, BackendError, ProcessError, RuntimeError};
pub use events::{Bus, Event, EventKind, OutputStream};
pub use ledger::{Artifact, CheckpointLedger, CheckpointRecord, EvictReason};
pub use process::{CommandSpec, Launch, RunningProcess, Spawner};
pub use stats::{RunReport, Stats, Verdict};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use timers::{CheckpointTimer, ExponentialDelay, PoissonTimer};

//! # Supervisor: one supervised run, raced against early termination.
//!
//! The [`Supervisor`] owns the event bus, the [`CheckpointLedger`] and the
//! backends. [`Supervisor::run`] launches the program and hands it to the
//! recovery controller, while a termination watcher waits for an OS signal or
//! the run deadline.
//!
//! ## High-level architecture
//! ```text
//! run(program)
//!   ├─ probe injector (once) ── Err ─► FaultInjectionDisabled, no fault timer
//!   └─ select (biased) {
//!        RecoveryController::run(program) ─► verdict (ledger already drained)
//!        wait_for_termination(deadline)    ─► controller dropped (child killed)
//!                                              ├─► ShutdownRequested | DeadlineExceeded
//!                                              ├─► ledger.drain_all(Terminated)
//!                                              └─► Verdict::Terminated
//!      }
//!
//! Event flow:
//!   runner / recovery / ledger ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//! ```
//!
//! Whichever side finishes first cancels the other, so cleanup runs exactly once.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use faultvisor::{BlcrBackend, CommandSpec, Config, LogWriter, Subscribe, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         checkpoint_interval: Duration::from_secs(60),
//!         retention: 2,
//!         ..Config::default()
//!     };
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let sup = Supervisor::builder(cfg, Arc::new(BlcrBackend::new()))
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let program = CommandSpec::new("./solver").with_preload(BlcrBackend::DEFAULT_PRELOAD);
//!     let report = sup.run(&program).await?;
//!     println!("{:?} after {} attempts", report.verdict, report.attempts);
//!     sup.close().await;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    builder::SupervisorBuilder,
    lifecycle::{Termination, wait_for_termination},
    recovery::RecoveryController,
};
use crate::{
    backends::{CheckpointBackend, FaultInjector},
    config::Config,
    error::AbortedRun,
    events::{Bus, Event, EventKind},
    ledger::{CheckpointLedger, EvictReason},
    process::{Launch, Spawner},
    stats::{RunReport, Stats, Verdict},
};

pub(super) struct Listener {
    pub stop: CancellationToken,
    pub handle: JoinHandle<()>,
}

/// Runs a program under checkpoint/restore supervision.
pub struct Supervisor {
    pub(super) cfg: Config,
    pub(super) bus: Bus,
    pub(super) ledger: Arc<CheckpointLedger>,
    pub(super) backend: Arc<dyn CheckpointBackend>,
    pub(super) injector: Option<Arc<dyn FaultInjector>>,
    pub(super) spawner: Spawner,
    pub(super) listener: Listener,
}

impl Supervisor {
    /// Starts building a supervisor that checkpoints through `backend`.
    pub fn builder(cfg: Config, backend: Arc<dyn CheckpointBackend>) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, backend)
    }

    /// Runs `program` until a verdict, an OS termination signal or the
    /// configured deadline.
    ///
    /// An aborted run still carries its report in [`AbortedRun::report`].
    pub async fn run(&self, program: &dyn Launch) -> Result<RunReport, AbortedRun> {
        self.run_until(program, wait_for_termination(self.cfg.run_deadline()))
            .await
    }

    /// Runs `program` until a verdict or until `terminate` completes.
    ///
    /// On termination the running instance is killed and every checkpoint is
    /// deleted before returning [`Verdict::Terminated`].
    pub async fn run_until<F>(
        &self,
        program: &dyn Launch,
        terminate: F,
    ) -> Result<RunReport, AbortedRun>
    where
        F: Future<Output = Termination>,
    {
        let injector = self.usable_injector().await;
        let mut stats = Stats::start();
        let controller = RecoveryController {
            cfg: &self.cfg,
            ledger: &self.ledger,
            backend: &self.backend,
            injector: injector.as_ref(),
            spawner: &self.spawner,
            bus: &self.bus,
        };

        let outcome = tokio::select! {
            biased;
            res = controller.run(program, &mut stats) => res,
            why = terminate => {
                self.terminate(&why).await;
                Ok(Verdict::Terminated(why))
            }
        };
        match outcome {
            Ok(verdict) => Ok(stats.finish(verdict)),
            Err(error) => Err(AbortedRun {
                error,
                report: stats.finish(Verdict::Failure),
            }),
        }
    }

    /// Stops the bus listener after delivering every published event to the subscribers.
    pub async fn close(self) {
        self.listener.stop.cancel();
        let _ = self.listener.handle.await;
    }

    /// Live checkpoints of the current run.
    pub fn ledger(&self) -> &Arc<CheckpointLedger> {
        &self.ledger
    }

    /// Event bus of this supervisor.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Returns the injector when fault injection is configured and the facility is usable.
    async fn usable_injector(&self) -> Option<Arc<dyn FaultInjector>> {
        self.cfg.fault_mean()?;
        let injector = self.injector.as_ref()?;
        match injector.probe().await {
            Ok(()) => Some(Arc::clone(injector)),
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::FaultInjectionDisabled).with_reason(e.to_string()),
                );
                None
            }
        }
    }

    async fn terminate(&self, why: &Termination) {
        let ev = match why {
            Termination::Signal(name) => {
                Event::new(EventKind::ShutdownRequested).with_reason(*name)
            }
            Termination::Deadline(d) => Event::new(EventKind::DeadlineExceeded).with_elapsed(*d),
        };
        self.bus.publish(ev);
        self.ledger.drain_all(EvictReason::Terminated).await;
    }
}

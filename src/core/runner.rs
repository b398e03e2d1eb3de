//! # Supervise one process instance from start to exit.
//!
//! [`supervise`] multiplexes three event sources for exactly one
//! [`RunningProcess`] and services one event per wake:
//!
//! ```text
//! loop {
//!   select (biased) {
//!     process exit      ─► stop fault timer, return outcome       (only exit)
//!     checkpoint tick   ─► backend.checkpoint(pid, "<seq>.<pid>")
//!                            ├─ Ok  ─► ledger.append (capacity eviction), backups += 1
//!                            └─ Err ─► log, keep running
//!                          record elapsed, rearm timer at now + period
//!     fault tick        ─► injector.inject(pid)
//!                            ├─ Ok  ─► faults += 1, log description
//!                            └─ Err ─► log
//!                          record elapsed (timer renews itself)
//!   }
//! }
//! ```
//!
//! ## Rules
//! - Backend calls are awaited inline: checkpoint and fault operations never overlap,
//!   and a slow call delays observation of exit and of the other timer.
//! - Exit is polled first, so a tick that is ready when the process has already
//!   exited is not serviced.
//! - Backend errors are published as events and never returned.
//! - A fresh checkpoint timer is armed per call; the fault timer is stopped on return.

use tokio::select;
use tokio::time::Instant;

use crate::{
    backends::{CheckpointBackend, FaultInjector},
    config::Config,
    error::ProcessError,
    events::{Bus, Event, EventKind},
    ledger::CheckpointLedger,
    process::RunningProcess,
    stats::Stats,
    timers::{CheckpointTimer, PoissonTimer},
};

/// Collaborators of one supervision attempt.
pub(crate) struct AttemptContext<'a> {
    pub cfg: &'a Config,
    pub ledger: &'a CheckpointLedger,
    pub backend: &'a dyn CheckpointBackend,
    /// `None` when fault injection is disabled for the run.
    pub injector: Option<&'a dyn FaultInjector>,
    pub bus: &'a Bus,
}

/// Supervises `process` until it exits and returns its outcome.
///
/// `restored_from` is the checkpoint the instance was resumed from, if any.
pub(crate) async fn supervise(
    mut process: RunningProcess,
    restored_from: Option<u64>,
    ctx: &AttemptContext<'_>,
    stats: &mut Stats,
) -> Result<(), ProcessError> {
    let pid = process.pid();
    let attempt = stats.begin_attempt();

    let mut started = Event::new(EventKind::ProcessStarted)
        .with_pid(pid)
        .with_attempt(attempt);
    if let Some(seq) = restored_from {
        started = started.with_checkpoint(seq);
    }
    ctx.bus.publish(started);

    let mut checkpoints = CheckpointTimer::arm(ctx.cfg.checkpoint_period());
    let mut faults = PoissonTimer::start(ctx.injector.and(ctx.cfg.fault_mean()));

    let outcome = loop {
        select! {
            biased;
            outcome = process.wait() => break outcome,
            _ = checkpoints.tick() => {
                take_checkpoint(ctx, pid, stats).await;
                checkpoints.rearm();
            }
            _ = faults.fired() => {
                if let Some(injector) = ctx.injector {
                    inject_fault(injector, ctx.bus, pid, stats).await;
                }
            }
        }
    };
    faults.stop();

    let ev = match &outcome {
        Ok(()) => Event::new(EventKind::ProcessExited),
        Err(e) => Event::new(EventKind::ProcessFailed).with_reason(e.to_string()),
    };
    ctx.bus.publish(ev.with_pid(pid).with_attempt(attempt));
    outcome
}

async fn take_checkpoint(ctx: &AttemptContext<'_>, pid: u32, stats: &mut Stats) {
    let began = Instant::now();
    let artifact = ctx.ledger.reserve(&ctx.cfg.checkpoint_dir, pid).await;

    match ctx.backend.checkpoint(pid, &artifact).await {
        Ok(()) => {
            let name = artifact.to_string();
            let record = ctx.ledger.append(artifact).await;
            let elapsed = began.elapsed();
            stats.record_checkpoint(elapsed, true);
            ctx.bus.publish(
                Event::new(EventKind::CheckpointTaken)
                    .with_pid(pid)
                    .with_checkpoint(record.sequence())
                    .with_artifact(name)
                    .with_elapsed(elapsed),
            );
        }
        Err(err) => {
            ctx.ledger.release(&artifact).await;
            let elapsed = began.elapsed();
            stats.record_checkpoint(elapsed, false);
            ctx.bus.publish(
                Event::new(EventKind::CheckpointFailed)
                    .with_pid(pid)
                    .with_reason(err.to_string())
                    .with_elapsed(elapsed),
            );
        }
    }
}

async fn inject_fault(injector: &dyn FaultInjector, bus: &Bus, pid: u32, stats: &mut Stats) {
    let began = Instant::now();
    let res = injector.inject(pid).await;
    let elapsed = began.elapsed();
    stats.record_fault(elapsed, res.is_ok());

    let ev = match res {
        Ok(description) => Event::new(EventKind::FaultInjected).with_reason(description),
        Err(err) => Event::new(EventKind::FaultFailed).with_reason(err.to_string()),
    };
    bus.publish(ev.with_pid(pid).with_elapsed(elapsed));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeInjector, fake_process};
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        cfg: Config,
        ledger: CheckpointLedger,
        backend: Arc<FakeBackend>,
        injector: Arc<FakeInjector>,
        bus: Bus,
    }

    impl Harness {
        fn new(cfg: Config) -> Self {
            let bus = Bus::new(256);
            let backend = Arc::new(FakeBackend::new());
            let ledger = CheckpointLedger::new(cfg.retention_clamped(), backend.clone(), bus.clone());
            Self {
                cfg,
                ledger,
                backend,
                injector: Arc::new(FakeInjector::new()),
                bus,
            }
        }

        fn ctx(&self, faults: bool) -> AttemptContext<'_> {
            AttemptContext {
                cfg: &self.cfg,
                ledger: &self.ledger,
                backend: self.backend.as_ref(),
                injector: if faults {
                    Some(self.injector.as_ref() as &dyn FaultInjector)
                } else {
                    None
                },
                bus: &self.bus,
            }
        }
    }

    fn cfg(checkpoint_secs: u64, fault_secs: u64, retention: usize) -> Config {
        Config {
            checkpoint_interval: Duration::from_secs(checkpoint_secs),
            fault_interval: Duration::from_secs(fault_secs),
            retention,
            ..Config::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn checkpoints_at_fixed_rate_until_exit() {
        let h = Harness::new(cfg(10, 0, 5));
        let mut stats = Stats::start();
        let proc = fake_process(77, Duration::from_secs(35), true);

        let out = supervise(proc, None, &h.ctx(false), &mut stats).await;
        assert!(out.is_ok());
        assert_eq!(stats.checkpoints(), 3);
        let seqs: Vec<u64> = h.ledger.records().await.iter().map(|r| r.sequence()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(h.backend.checkpoint_pids(), vec![77, 77, 77]);
        assert_eq!(h.backend.live(), vec!["./1.77", "./2.77", "./3.77"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_checkpoint_does_not_stop_the_process() {
        let h = Harness::new(cfg(10, 0, 5));
        h.backend.fail_checkpoints(true);
        let mut stats = Stats::start();
        let proc = fake_process(5, Duration::from_secs(25), true);

        assert!(supervise(proc, None, &h.ctx(false), &mut stats).await.is_ok());
        assert_eq!(stats.checkpoints(), 0);
        assert!(h.ledger.is_empty().await);
        assert_eq!(h.backend.checkpoint_pids().len(), 2);

        let report = stats.finish(crate::Verdict::Success);
        assert_eq!(report.checkpoint_samples.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_at_exit_instant_is_not_serviced() {
        let h = Harness::new(cfg(10, 0, 5));
        let mut stats = Stats::start();
        let proc = fake_process(5, Duration::from_secs(20), false);

        let out = supervise(proc, None, &h.ctx(false), &mut stats).await;
        assert!(out.is_err());
        assert_eq!(stats.checkpoints(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn faults_are_injected_and_counted() {
        let h = Harness::new(cfg(0, 1, 1));
        let mut stats = Stats::start();
        let proc = fake_process(9, Duration::from_secs(600), true);

        assert!(supervise(proc, None, &h.ctx(true), &mut stats).await.is_ok());
        let calls = h.injector.calls();
        assert!(calls > 100, "only {calls} faults in 600 mean intervals");
        assert_eq!(stats.faults(), u64::from(calls));
        assert!(h.ledger.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_injection_is_sampled_but_not_counted() {
        let h = Harness::new(cfg(0, 1, 1));
        h.injector.fail(true);
        let mut stats = Stats::start();
        let proc = fake_process(9, Duration::from_secs(100), true);

        assert!(supervise(proc, None, &h.ctx(true), &mut stats).await.is_ok());
        assert_eq!(stats.faults(), 0);
        let report = stats.finish(crate::Verdict::Success);
        assert_eq!(report.fault_samples.len() as u32, h.injector.calls());
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_injection_never_calls_backend() {
        let h = Harness::new(cfg(0, 1, 1));
        let mut stats = Stats::start();
        let proc = fake_process(9, Duration::from_secs(100), true);

        assert!(supervise(proc, None, &h.ctx(false), &mut stats).await.is_ok());
        assert_eq!(h.injector.calls(), 0);
        assert_eq!(stats.faults(), 0);
    }
}

//! # Overhead accounting.
//!
//! [`Stats`] observes every checkpoint and fault-injection call across all
//! supervision attempts of a run. The samples are used for reporting only,
//! never for control decisions. [`Stats::finish`] freezes them into a [`RunReport`].

use std::time::Duration;

use tokio::time::Instant;

use crate::core::Termination;

/// Final verdict of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Some supervision attempt ended with a clean exit.
    Success,
    /// The process kept failing until no usable checkpoint was left.
    Failure,
    /// A signal or the deadline ended the run before a verdict was reached.
    Terminated(Termination),
}

impl Verdict {
    /// True for [`Verdict::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }
}

/// Run-wide counters and timing samples.
#[derive(Debug)]
pub struct Stats {
    started: Instant,
    attempts: u32,
    checkpoints: u64,
    faults: u64,
    checkpoint_samples: Vec<Duration>,
    fault_samples: Vec<Duration>,
}

impl Stats {
    /// Starts the wall clock.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            attempts: 0,
            checkpoints: 0,
            faults: 0,
            checkpoint_samples: Vec::new(),
            fault_samples: Vec::new(),
        }
    }

    /// Counts one supervision attempt and returns its number (1-based).
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Records one checkpoint call; only successful ones are counted as backups.
    pub fn record_checkpoint(&mut self, elapsed: Duration, succeeded: bool) {
        self.checkpoint_samples.push(elapsed);
        if succeeded {
            self.checkpoints += 1;
        }
    }

    /// Records one fault-injection call; only successful ones are counted as faults.
    pub fn record_fault(&mut self, elapsed: Duration, succeeded: bool) {
        self.fault_samples.push(elapsed);
        if succeeded {
            self.faults += 1;
        }
    }

    /// Supervision attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Checkpoints taken so far.
    pub fn checkpoints(&self) -> u64 {
        self.checkpoints
    }

    /// Faults injected so far.
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Stops the wall clock and aggregates the samples.
    pub fn finish(self, verdict: Verdict) -> RunReport {
        RunReport {
            verdict,
            total: self.started.elapsed(),
            attempts: self.attempts,
            checkpoints: self.checkpoints,
            faults: self.faults,
            checkpoint_time: self.checkpoint_samples.iter().sum(),
            fault_time: self.fault_samples.iter().sum(),
            checkpoint_samples: self.checkpoint_samples,
            fault_samples: self.fault_samples,
        }
    }
}

/// Outcome of a run with its overhead figures.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Final verdict.
    pub verdict: Verdict,
    /// Total wall-clock duration.
    pub total: Duration,
    /// Number of supervision attempts (1 = no recovery needed).
    pub attempts: u32,
    /// Checkpoints taken.
    pub checkpoints: u64,
    /// Faults injected.
    pub faults: u64,
    /// Cumulative time spent in checkpoint calls.
    pub checkpoint_time: Duration,
    /// Cumulative time spent in fault-injection calls.
    pub fault_time: Duration,
    /// Duration of each checkpoint call.
    pub checkpoint_samples: Vec<Duration>,
    /// Duration of each fault-injection call.
    pub fault_samples: Vec<Duration>,
}

impl RunReport {
    /// Wall-clock time not spent in checkpoint or fault-injection calls.
    pub fn running_time(&self) -> Duration {
        self.total
            .saturating_sub(self.checkpoint_time)
            .saturating_sub(self.fault_time)
    }

    /// Checkpoint time as a percentage of total time.
    pub fn checkpoint_share(&self) -> f64 {
        percent(self.checkpoint_time, self.total)
    }

    /// Fault-injection time as a percentage of total time.
    pub fn fault_share(&self) -> f64 {
        percent(self.fault_time, self.total)
    }
}

fn percent(part: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        0.0
    } else {
        part.as_secs_f64() / total.as_secs_f64() * 100.0
    }
}

//! # Run configuration.
//!
//! Provides [`Config`], the knobs consumed by the recovery controller and the
//! supervision loop.
//!
//! ## Sentinel values
//! - `checkpoint_interval = 0s` → checkpointing disabled (the checkpoint timer never fires)
//! - `fault_interval = 0s` → fault injection disabled (the fault timer never fires)
//! - `deadline = 0s` → no deadline (only an OS signal ends the run early)
//! - `retention = 0` → clamped to 1

use std::path::PathBuf;
use std::time::Duration;

/// What to do when the checkpoint backend cannot restore a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestoreFailurePolicy {
    /// Abort the whole run (default).
    #[default]
    Abort,
    /// Evict the record and continue with the next-older one.
    Fallback,
}

/// Configuration for a supervised run.
///
/// ## Field semantics
/// - `checkpoint_interval`: Fixed period between checkpoints (`0s` = disabled)
/// - `retention`: Maximum number of live checkpoints (min 1)
/// - `retry_limit`: How many times one checkpoint may be used for recovery
/// - `fault_interval`: Mean time between injected faults (`0s` = disabled)
/// - `deadline`: Overall run deadline (`0s` = none)
/// - `checkpoint_dir`: Directory where artifacts are written
/// - `restore_failure`: Reaction to a failed restore
/// - `bus_capacity`: Event bus ring buffer size (min 1)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid sprinkling
/// sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Period of the fixed-rate checkpoint timer.
    pub checkpoint_interval: Duration,

    /// Capacity of the checkpoint ledger.
    ///
    /// When a new checkpoint pushes the ledger over this size the oldest record
    /// is evicted and its artifact deleted.
    pub retention: usize,

    /// Retry budget of a single checkpoint record.
    ///
    /// A record whose retry count has reached this value is evicted instead of
    /// being restored again.
    pub retry_limit: u32,

    /// Mean inter-arrival time of injected faults (exponentially distributed).
    pub fault_interval: Duration,

    /// Maximum wall-clock duration of the whole run.
    pub deadline: Duration,

    /// Directory for `<seq>.<pid>` checkpoint artifacts.
    pub checkpoint_dir: PathBuf,

    /// Reaction to a restore call that fails.
    pub restore_failure: RestoreFailurePolicy,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the checkpoint period, `None` when checkpointing is disabled.
    #[inline]
    pub fn checkpoint_period(&self) -> Option<Duration> {
        non_zero(self.checkpoint_interval)
    }

    /// Returns the mean fault interval, `None` when fault injection is disabled.
    #[inline]
    pub fn fault_mean(&self) -> Option<Duration> {
        non_zero(self.fault_interval)
    }

    /// Returns the run deadline, `None` when the run is unbounded.
    #[inline]
    pub fn run_deadline(&self) -> Option<Duration> {
        non_zero(self.deadline)
    }

    /// Returns the ledger capacity clamped to a minimum of 1.
    #[inline]
    pub fn retention_clamped(&self) -> usize {
        self.retention.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    if d == Duration::ZERO { None } else { Some(d) }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - checkpointing and fault injection disabled
    /// - `retention = 1`, `retry_limit = 1`
    /// - no deadline
    /// - artifacts in the current directory
    /// - abort on restore failure
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            checkpoint_interval: Duration::ZERO,
            retention: 1,
            retry_limit: 1,
            fault_interval: Duration::ZERO,
            deadline: Duration::ZERO,
            checkpoint_dir: PathBuf::from("."),
            restore_failure: RestoreFailurePolicy::default(),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_durations_disable_features() {
        let cfg = Config::default();
        assert_eq!(cfg.checkpoint_period(), None);
        assert_eq!(cfg.fault_mean(), None);
        assert_eq!(cfg.run_deadline(), None);
    }

    #[test]
    fn retention_and_bus_are_clamped() {
        let cfg = Config {
            retention: 0,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.retention_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn non_zero_intervals_are_exposed() {
        let cfg = Config {
            checkpoint_interval: Duration::from_secs(60),
            fault_interval: Duration::from_millis(250),
            deadline: Duration::from_secs(3600),
            ..Config::default()
        };
        assert_eq!(cfg.checkpoint_period(), Some(Duration::from_secs(60)));
        assert_eq!(cfg.fault_mean(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.run_deadline(), Some(Duration::from_secs(3600)));
    }
}

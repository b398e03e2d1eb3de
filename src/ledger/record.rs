//! # Checkpoint records and artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

/// Backend artifact holding one checkpoint, named `<sequence>.<pid>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Artifact {
    path: PathBuf,
    pid: u32,
}

impl Artifact {
    /// Builds the artifact path for checkpoint `sequence` of process `pid` inside `dir`.
    ///
    /// # Example
    /// ```
    /// use std::path::Path;
    /// use faultvisor::Artifact;
    ///
    /// let a = Artifact::new("/var/ckpt", 3, 4242);
    /// assert_eq!(a.path(), Path::new("/var/ckpt/3.4242"));
    /// assert_eq!(a.pid(), 4242);
    /// ```
    pub fn new(dir: impl AsRef<Path>, sequence: u64, pid: u32) -> Self {
        Self {
            path: dir.as_ref().join(format!("{sequence}.{pid}")),
            pid,
        }
    }

    /// Filesystem location of the artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Process the checkpoint was taken from.
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// One live checkpoint in the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub(super) sequence: u64,
    pub(super) artifact: Artifact,
    pub(super) retries: u32,
}

impl CheckpointRecord {
    /// Run-wide sequence number (starts at 1, never reused).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Artifact holding the snapshot.
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// How many times this record was chosen for restoration.
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// Why a record left the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictReason {
    /// A newer checkpoint pushed the ledger over capacity.
    Capacity,
    /// The record used up its retry budget.
    RetriesExhausted,
    /// The backend could not restore the record.
    RestoreFailed,
    /// End of run cleanup.
    Drain,
    /// Emergency cleanup after a signal or deadline.
    Terminated,
}

impl EvictReason {
    /// Short label used in events.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictReason::Capacity => "capacity",
            EvictReason::RetriesExhausted => "retries_exhausted",
            EvictReason::RestoreFailed => "restore_failed",
            EvictReason::Drain => "drain",
            EvictReason::Terminated => "terminated",
        }
    }
}

//! # External checkpoint/restore and fault-injection facilities.
//!
//! The runtime only orchestrates these facilities; it never snapshots or
//! perturbs a process itself.
//!
//! - [`CheckpointBackend`] snapshot a process to an [`Artifact`], resume from it, delete it
//! - [`FaultInjector`] perturb a running process by pid
//!
//! Built-in implementations:
//! - [`BlcrBackend`] drives the BLCR `cr_checkpoint` / `cr_restart` tools
//! - [`KfiInjector`] talks to the kfi kernel module through `/proc/kfi`

mod blcr;
mod kfi;

pub use blcr::BlcrBackend;
pub use kfi::KfiInjector;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::ledger::Artifact;
use crate::process::{RunningProcess, Spawner};

/// Checkpoint/restore facility.
///
/// Calls are made from the supervision loop one at a time; none of them is
/// interrupted by process exit or by the fault timer.
#[async_trait]
pub trait CheckpointBackend: Send + Sync + 'static {
    /// Snapshots process `pid` into `artifact`.
    async fn checkpoint(&self, pid: u32, artifact: &Artifact) -> Result<(), BackendError>;

    /// Resumes a process from `artifact`. Output of the resumed process should be
    /// relayed through `spawner`.
    async fn restore(
        &self,
        artifact: &Artifact,
        spawner: &Spawner,
    ) -> Result<RunningProcess, BackendError>;

    /// Deletes `artifact`. An artifact that is already gone is not an error.
    async fn discard(&self, artifact: &Artifact) -> Result<(), BackendError>;
}

/// Fault-injection facility.
#[async_trait]
pub trait FaultInjector: Send + Sync + 'static {
    /// Checks once per run that the facility is usable.
    ///
    /// An error disables fault injection for the whole run.
    async fn probe(&self) -> Result<(), BackendError>;

    /// Perturbs process `pid` and returns the backend's description of the fault.
    async fn inject(&self, pid: u32) -> Result<String, BackendError>;
}

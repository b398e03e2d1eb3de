//! In-memory backends and programs for unit tests.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::backends::{CheckpointBackend, FaultInjector};
use crate::error::{BackendError, ProcessError};
use crate::ledger::Artifact;
use crate::process::{Launch, RunningProcess, Spawner};

/// Scripted behavior of one launched or restored instance.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Plan {
    Run { after: Duration, ok: bool },
    RestoreError,
    LaunchError,
}

impl Plan {
    pub fn succeed_after(secs: u64) -> Self {
        Plan::Run {
            after: Duration::from_secs(secs),
            ok: true,
        }
    }

    pub fn fail_after(secs: u64) -> Self {
        Plan::Run {
            after: Duration::from_secs(secs),
            ok: false,
        }
    }
}

/// Process that exits after `after`, cleanly when `ok`.
pub(crate) fn fake_process(pid: u32, after: Duration, ok: bool) -> RunningProcess {
    RunningProcess::from_future(pid, async move {
        tokio::time::sleep(after).await;
        if ok {
            Ok(())
        } else {
            Err(ProcessError::Exited {
                code: Some(1),
                signal: None,
            })
        }
    })
}

#[derive(Default)]
struct BackendState {
    live: BTreeSet<String>,
    discarded: Vec<String>,
    remove_errors: usize,
    checkpoint_pids: Vec<u32>,
    restores: Vec<String>,
    script: VecDeque<Plan>,
    fail_checkpoints: bool,
    checkpoint_delay: Duration,
}

/// Checkpoint backend that tracks artifacts by path.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut BackendState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Marks `artifact` as existing on disk.
    pub fn materialize(&self, artifact: &Artifact) {
        self.with(|s| s.live.insert(artifact.to_string()));
    }

    pub fn discarded(&self) -> Vec<String> {
        self.with(|s| s.discarded.clone())
    }

    pub fn live(&self) -> Vec<String> {
        self.with(|s| s.live.iter().cloned().collect())
    }

    pub fn remove_errors(&self) -> usize {
        self.with(|s| s.remove_errors)
    }

    pub fn fail_checkpoints(&self, fail: bool) {
        self.with(|s| s.fail_checkpoints = fail);
    }

    /// Makes each checkpoint write its artifact and then take `delay` to finish.
    pub fn checkpoint_delay(&self, delay: Duration) {
        self.with(|s| s.checkpoint_delay = delay);
    }

    pub fn checkpoint_pids(&self) -> Vec<u32> {
        self.with(|s| s.checkpoint_pids.clone())
    }

    pub fn restores(&self) -> Vec<String> {
        self.with(|s| s.restores.clone())
    }

    /// Queues the behavior of subsequent restores; an empty queue restores a
    /// process that exits cleanly at once.
    pub fn script_restores(&self, plans: impl IntoIterator<Item = Plan>) {
        self.with(|s| s.script.extend(plans));
    }
}

#[async_trait]
impl CheckpointBackend for FakeBackend {
    async fn checkpoint(&self, pid: u32, artifact: &Artifact) -> Result<(), BackendError> {
        let delay = self.with(|s| {
            s.checkpoint_pids.push(pid);
            if s.fail_checkpoints {
                return Err(BackendError::Checkpoint {
                    reason: "scripted failure".into(),
                });
            }
            s.live.insert(artifact.to_string());
            Ok(s.checkpoint_delay)
        })?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn restore(
        &self,
        artifact: &Artifact,
        _spawner: &Spawner,
    ) -> Result<RunningProcess, BackendError> {
        let plan = self.with(|s| {
            s.restores.push(artifact.to_string());
            s.script.pop_front()
        });
        match plan.unwrap_or(Plan::succeed_after(0)) {
            Plan::Run { after, ok } => Ok(fake_process(artifact.pid(), after, ok)),
            Plan::RestoreError | Plan::LaunchError => Err(BackendError::Restore {
                reason: "scripted failure".into(),
            }),
        }
    }

    async fn discard(&self, artifact: &Artifact) -> Result<(), BackendError> {
        let name = artifact.to_string();
        self.with(|s| {
            if s.live.remove(&name) {
                s.discarded.push(name);
                Ok(())
            } else {
                s.remove_errors += 1;
                Err(BackendError::Remove {
                    artifact: name,
                    reason: "not materialized".into(),
                })
            }
        })
    }
}

/// Fault injector that counts its calls.
pub(crate) struct FakeInjector {
    calls: AtomicU32,
    fail: AtomicBool,
    available: AtomicBool,
}

impl FakeInjector {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail: AtomicBool::new(false),
            available: AtomicBool::new(true),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::Relaxed);
        self
    }
}

#[async_trait]
impl FaultInjector for FakeInjector {
    async fn probe(&self) -> Result<(), BackendError> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(BackendError::Unavailable {
                reason: "no injector".into(),
            })
        }
    }

    async fn inject(&self, pid: u32) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail.load(Ordering::Relaxed) {
            Err(BackendError::Inject {
                reason: "scripted failure".into(),
            })
        } else {
            Ok(format!("flipped a bit in {pid}"))
        }
    }
}

/// Program whose first instance follows `plan`.
pub(crate) struct FakeLauncher {
    pid: u32,
    plan: Plan,
}

impl FakeLauncher {
    pub fn new(pid: u32, plan: Plan) -> Self {
        Self { pid, plan }
    }
}

#[async_trait]
impl Launch for FakeLauncher {
    async fn launch(&self, _spawner: &Spawner) -> Result<RunningProcess, ProcessError> {
        match self.plan {
            Plan::Run { after, ok } => Ok(fake_process(self.pid, after, ok)),
            Plan::RestoreError | Plan::LaunchError => Err(ProcessError::Spawn {
                reason: "scripted failure".into(),
            }),
        }
    }
}

//! # Launching the original program.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use super::{RunningProcess, Spawner};
use crate::error::ProcessError;

/// Starts the first instance of the supervised program.
#[async_trait]
pub trait Launch: Send + Sync {
    /// Starts the program; output should be relayed through `spawner`.
    async fn launch(&self, spawner: &Spawner) -> Result<RunningProcess, ProcessError>;
}

/// Shell command line run through `bash -c`, optionally with a preload library.
///
/// # Example
/// ```
/// use faultvisor::CommandSpec;
///
/// let spec = CommandSpec::new("./solver --size 64").with_preload("/usr/local/lib/libcr_run.so.0");
/// assert_eq!(spec.script(), "env LD_PRELOAD=/usr/local/lib/libcr_run.so.0 ./solver --size 64");
/// ```
#[derive(Clone, Debug)]
pub struct CommandSpec {
    command_line: String,
    preload: Option<PathBuf>,
}

impl CommandSpec {
    /// Runs `command_line` as is.
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            preload: None,
        }
    }

    /// Runs the command with `LD_PRELOAD` set to `library`.
    pub fn with_preload(mut self, library: impl Into<PathBuf>) -> Self {
        self.preload = Some(library.into());
        self
    }

    /// Script handed to `bash -c`.
    pub fn script(&self) -> String {
        match &self.preload {
            Some(lib) => format!("env LD_PRELOAD={} {}", lib.display(), self.command_line),
            None => self.command_line.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(self.script());
        cmd
    }
}

#[async_trait]
impl Launch for CommandSpec {
    async fn launch(&self, spawner: &Spawner) -> Result<RunningProcess, ProcessError> {
        spawner.spawn(self.command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;

    #[test]
    fn script_without_preload_is_verbatim() {
        assert_eq!(CommandSpec::new("echo hi").script(), "echo hi");
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn launches_through_bash() {
        let spawner = Spawner::new(Bus::new(16));
        let mut p = CommandSpec::new("exit 0").launch(&spawner).await.unwrap();
        assert_eq!(p.wait().await, Ok(()));

        let mut p = CommandSpec::new("exit 5").launch(&spawner).await.unwrap();
        assert!(matches!(p.wait().await, Err(ProcessError::Exited { code: Some(5), .. })));
    }
}

//! # kfi fault injector.
//!
//! The kfi kernel module exposes a proc entry. Writing a pid to it flips a
//! random bit in a random register of that process; reading it back returns
//! a description of what was changed.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::FaultInjector;
use crate::error::BackendError;

/// Fault injector backed by the kfi proc entry.
#[derive(Clone, Debug)]
pub struct KfiInjector {
    entry: PathBuf,
}

impl Default for KfiInjector {
    fn default() -> Self {
        Self {
            entry: PathBuf::from(Self::DEFAULT_ENTRY),
        }
    }
}

impl KfiInjector {
    /// Default proc entry of the kfi module.
    pub const DEFAULT_ENTRY: &'static str = "/proc/kfi";

    /// Uses [`DEFAULT_ENTRY`](Self::DEFAULT_ENTRY).
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom proc entry.
    pub fn at(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
        }
    }

    async fn ensure_present(&self) -> Result<(), BackendError> {
        match tokio::fs::try_exists(&self.entry).await {
            Ok(true) => Ok(()),
            _ => Err(BackendError::Unavailable {
                reason: format!(
                    "{} not found, please ensure the kfi module has been inserted",
                    self.entry.display()
                ),
            }),
        }
    }
}

#[async_trait]
impl FaultInjector for KfiInjector {
    async fn probe(&self) -> Result<(), BackendError> {
        self.ensure_present().await
    }

    async fn inject(&self, pid: u32) -> Result<String, BackendError> {
        self.ensure_present().await?;

        let mut entry = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.entry)
            .await
            .map_err(|e| BackendError::Inject {
                reason: format!("error opening {}: {e}", self.entry.display()),
            })?;

        entry
            .write_all(pid.to_string().as_bytes())
            .await
            .map_err(|e| BackendError::Inject {
                reason: format!("error writing to {} ({e}), see dmesg for details", self.entry.display()),
            })?;

        let mut description = String::new();
        entry
            .read_to_string(&mut description)
            .await
            .map_err(|e| BackendError::Inject {
                reason: format!("error reading from {} ({e}), see dmesg for details", self.entry.display()),
            })?;

        Ok(description.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_entry_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let kfi = KfiInjector::at(dir.path().join("kfi"));

        let err = kfi.probe().await.unwrap_err();
        assert_eq!(err.as_label(), "backend_unavailable");
        let err = kfi.inject(1).await.unwrap_err();
        assert_eq!(err.as_label(), "backend_unavailable");
    }

    #[tokio::test]
    async fn writes_decimal_pid_to_entry() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("kfi");
        std::fs::write(&entry, b"").unwrap();

        let kfi = KfiInjector::at(&entry);
        kfi.probe().await.unwrap();
        // a plain file has nothing to read back after the write
        assert_eq!(kfi.inject(4242).await.unwrap(), "");
        assert_eq!(std::fs::read_to_string(&entry).unwrap(), "4242");
    }
}

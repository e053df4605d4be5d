//! Error types for lifecycle commands.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::{RegistryError, ShutdownError, StdioError};

/// Errors raised while executing lifecycle commands.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A live supervisor already owns the PID record.
    #[error("{name} is already running (pid: {pid})")]
    AlreadyRunning {
        /// Application name.
        name: String,
        /// Recorded supervisor PID.
        pid: u32,
    },
    /// The PID record could not be read or updated.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Stopping the supervisor failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// Output redirection files could not be opened.
    #[error(transparent)]
    Stdio(#[from] StdioError),
    /// The path of the running executable could not be determined.
    #[error("failed to locate the supervise executable: {source}")]
    CurrentExe {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The supervisor process could not be launched.
    #[error("failed to launch supervisor '{binary}': {source}")]
    LaunchSupervisor {
        /// Executable path.
        binary: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The supervisor exited before claiming the PID record.
    #[error("{name} failed to start (supervisor exit status: {exit_status:?})")]
    StartupFailed {
        /// Application name.
        name: String,
        /// Supervisor exit code, when it exited normally.
        exit_status: Option<i32>,
    },
    /// The supervisor did not claim the PID record in time.
    #[error("timed out after {timeout_ms} ms waiting for {name} to record its pid in {pid_path:?}")]
    StartupTimeout {
        /// Application name.
        name: String,
        /// Expected record location.
        pid_path: PathBuf,
        /// Configured timeout.
        timeout_ms: u64,
    },
    /// Polling the launched supervisor failed.
    #[error("failed to monitor supervisor launch: {source}")]
    MonitorChild {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing command output failed.
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}

impl LifecycleError {
    /// Process exit code reported for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Registry(_) | Self::Shutdown(ShutdownError::Registry(_)) => 255,
            Self::LaunchSupervisor { .. } => 127,
            Self::StartupFailed {
                exit_status: Some(code),
                ..
            } => u8::try_from(*code)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

//! Error surface for the PID record, signal delivery, and supervision.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::stdio::StdioError;

/// Errors raised while delivering a signal.
#[derive(Debug, Error)]
pub enum SignalError {
    /// The PID cannot name a signalable process.
    #[error("pid {pid} cannot be signalled")]
    InvalidPid {
        /// Rejected PID.
        pid: u32,
    },
    /// The kernel refused the signal.
    #[error("failed to send {signal} to pid {pid}: {source}")]
    Deliver {
        /// Target PID.
        pid: u32,
        /// Signal name.
        signal: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Signals are not available on this platform.
    #[error("process signals are not supported on this platform")]
    UnsupportedPlatform,
}

/// Errors raised while reading or updating the PID record.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading the record failed.
    #[error("failed to read pid record '{path}': {source}")]
    Read {
        /// Record path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the record failed.
    #[error("failed to write pid record '{path}': {source}")]
    Write {
        /// Record path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Deleting the record failed.
    #[error("failed to remove pid record '{path}': {source}")]
    Remove {
        /// Record path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while stopping a process.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The PID record could not be consulted or cleared.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A stop signal could not be delivered.
    #[error(transparent)]
    Signal(#[from] SignalError),
    /// Polling a child for its exit status failed.
    #[error("failed to poll process {pid} for exit: {source}")]
    Wait {
        /// Child PID.
        pid: u32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors that end a supervision run.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A live supervisor already owns the PID record.
    #[error("already running with pid {pid}")]
    AlreadyRunning {
        /// PID named by the existing record.
        pid: u32,
    },
    /// The PID record could not be consulted or updated.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    SignalInstall {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Output redirection files could not be opened.
    #[error(transparent)]
    Stdio(#[from] StdioError),
    /// The target program could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program path.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Stopping or polling the target failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

impl SupervisorError {
    /// Process exit code reported for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Spawn { .. } => 127,
            Self::Registry(_) | Self::Shutdown(ShutdownError::Registry(_)) => 255,
            Self::AlreadyRunning { .. }
            | Self::SignalInstall { .. }
            | Self::Stdio(_)
            | Self::Shutdown(_) => 1,
        }
    }
}

//! Lifecycle command types and output abstractions.

use std::fmt;
use std::io::Write;
use std::path::Path;

use super::LifecycleError;
use crate::settings::SupervisorSettings;

/// Supported lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Launch a detached supervisor.
    Start,
    /// Stop the running supervisor.
    Stop,
    /// Stop, then start.
    Restart,
    /// Report whether a supervisor is running.
    Status,
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => formatter.write_str("start"),
            Self::Stop => formatter.write_str("stop"),
            Self::Restart => formatter.write_str("restart"),
            Self::Status => formatter.write_str("status"),
        }
    }
}

/// Inputs shared by every lifecycle command.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext<'a> {
    /// Settings for the selected application.
    pub settings: &'a SupervisorSettings,
    /// Executable re-invoked as the detached supervisor.
    pub supervisor_binary: &'a Path,
}

/// Output handle abstracting over stdout/stderr writers.
#[derive(Debug)]
pub struct LifecycleOutput<W: Write, E: Write> {
    /// Standard output writer.
    pub stdout: W,
    /// Standard error writer.
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    /// Wraps the given writers.
    pub const fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Writes one line to standard output.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Io`] when the writer fails.
    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stdout.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stdout.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stdout.flush().map_err(LifecycleError::Io)
    }

    /// Writes one line to standard error.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Io`] when the writer fails.
    pub fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stderr.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stderr.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stderr.flush().map_err(LifecycleError::Io)
    }
}

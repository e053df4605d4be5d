//! High-level orchestration for lifecycle commands.

use std::io::Write;
use std::process::ExitCode;

use tracing::info;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::monitoring::{LaunchState, wait_for_record};
use super::spawning::spawn_supervisor;
use super::types::{LifecycleCommand, LifecycleContext, LifecycleOutput};
use crate::process::{StopOutcome, request_stop};

/// Production lifecycle controller.
#[derive(Debug, Default)]
pub struct SystemLifecycle;

impl SystemLifecycle {
    /// Executes `command` for the application in `context`.
    ///
    /// `restart` is `stop` followed by `start`. The record check at the top of
    /// `start` re-validates the record between the two, so a supervisor that
    /// appeared in the meantime is reported as [`LifecycleError::AlreadyRunning`].
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the command cannot be completed.
    pub fn handle<W: Write, E: Write>(
        &mut self,
        command: LifecycleCommand,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        info!(
            target: LIFECYCLE_TARGET,
            %command,
            application = context.settings.application().name(),
            "lifecycle command"
        );
        match command {
            LifecycleCommand::Start => self.start(context, output),
            LifecycleCommand::Stop => self.stop(context, output),
            LifecycleCommand::Restart => {
                self.stop(context, output)?;
                self.start(context, output)
            }
            LifecycleCommand::Status => self.status(context, output),
        }
    }

    fn start<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let settings = context.settings;
        let name = settings.application().name();
        let registry = settings.registry();
        if let Some(pid) = registry.read()? {
            return Err(LifecycleError::AlreadyRunning {
                name: name.to_owned(),
                pid,
            });
        }
        let mut child = spawn_supervisor(context)?;
        let config = settings.config();
        match wait_for_record(
            &registry,
            &mut child,
            config.startup_timeout(),
            config.poll_interval(),
        )? {
            LaunchState::Recorded(pid) => {
                output.stdout_line(format_args!("{name} is now being monitored (pid: {pid})"))?;
                Ok(ExitCode::SUCCESS)
            }
            // The target ran to completion before the record could be seen.
            LaunchState::Exited(Some(0)) => {
                output.stdout_line(format_args!("{name} shut down gracefully."))?;
                Ok(ExitCode::SUCCESS)
            }
            LaunchState::Exited(exit_status) => Err(LifecycleError::StartupFailed {
                name: name.to_owned(),
                exit_status,
            }),
            LaunchState::TimedOut => Err(LifecycleError::StartupTimeout {
                name: name.to_owned(),
                pid_path: registry.path().to_path_buf(),
                timeout_ms: config.startup_timeout_ms,
            }),
        }
    }

    fn stop<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let settings = context.settings;
        let name = settings.application().name();
        let registry = settings.registry();
        match request_stop(&registry, &settings.controller_policy())? {
            StopOutcome::AlreadyStopped => {
                output.stdout_line(format_args!("{name} is not running"))?;
            }
            StopOutcome::GracefulStop { .. } => {
                output.stdout_line(format_args!("{name} terminated."))?;
            }
            StopOutcome::ForcedStop { .. } => {
                output.stderr_line(format_args!(
                    "{name} termination timed out, fell back to SIGKILL"
                ))?;
                output.stdout_line(format_args!("{name} terminated."))?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn status<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let name = context.settings.application().name();
        match context.settings.registry().read()? {
            Some(pid) => {
                output.stdout_line(format_args!("{name} is running (pid: {pid})"))?;
                Ok(ExitCode::SUCCESS)
            }
            None => {
                output.stdout_line(format_args!("{name} is not running"))?;
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

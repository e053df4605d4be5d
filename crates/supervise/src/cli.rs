//! Command-line surface.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use supervise_config::{Application, ApplicationError, ApplicationRequest, SupervisorConfig};

use crate::lifecycle::LifecycleCommand;
use crate::process::StdioTargets;
use crate::settings::SupervisorSettings;

#[derive(Debug, Parser)]
#[command(
    name = "supervise",
    version,
    about = "Keeps a program running and lets you start, stop, and inspect it.",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Starts the application under a detached supervisor.
    ///
    /// Succeeds without monitoring when the application runs to completion
    /// before the supervisor's PID record is seen.
    Start(TargetArgs),
    /// Stops, then starts, the supervised application.
    Restart(TargetArgs),
    /// Stops the supervisor and its application.
    Stop(TargetArgs),
    /// Reports whether the application is supervised (exit code 0 when
    /// running, 1 otherwise).
    Status(TargetArgs),
    /// Supervises the application in the foreground.
    Monitor(TargetArgs),
}

/// What the invocation asks for once arguments are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Lifecycle(LifecycleCommand),
    Monitor,
}

impl CliCommand {
    pub(crate) fn into_parts(self) -> (Mode, TargetArgs) {
        match self {
            Self::Start(args) => (Mode::Lifecycle(LifecycleCommand::Start), args),
            Self::Restart(args) => (Mode::Lifecycle(LifecycleCommand::Restart), args),
            Self::Stop(args) => (Mode::Lifecycle(LifecycleCommand::Stop), args),
            Self::Status(args) => (Mode::Lifecycle(LifecycleCommand::Status), args),
            Self::Monitor(args) => (Mode::Monitor, args),
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub(crate) struct TargetArgs {
    /// Application directory or program; defaults to the working directory.
    #[arg(value_name = "PATH")]
    pub(crate) path: Option<PathBuf>,
    /// File receiving the application's standard output.
    #[arg(long, value_name = "FILE")]
    pub(crate) out: Option<PathBuf>,
    /// File receiving the application's standard error.
    #[arg(long, value_name = "FILE")]
    pub(crate) err: Option<PathBuf>,
    /// Append to output files instead of truncating them.
    #[arg(long)]
    pub(crate) append: bool,
    /// PID record location; defaults to `.supervisor.pid` in the application
    /// directory.
    #[arg(long, value_name = "FILE")]
    pub(crate) pid: Option<PathBuf>,
    /// Name used in status messages.
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Exit with the application's status instead of respawning it.
    #[arg(long)]
    pub(crate) no_respawn: bool,
    /// Extra arguments for the application, given after `--`.
    #[arg(last = true, value_name = "ARGS")]
    pub(crate) args: Vec<OsString>,
}

impl TargetArgs {
    /// Resolves the application and combines it with `config`.
    pub(crate) fn into_settings(
        self,
        config: SupervisorConfig,
    ) -> Result<SupervisorSettings, ApplicationError> {
        let application = Application::resolve(ApplicationRequest {
            path: self.path.as_deref(),
            pid_path: self.pid.as_deref(),
            name: self.name.as_deref(),
            args: &self.args,
        })?;
        let stdio = StdioTargets::new(self.out, self.err, self.append);
        Ok(SupervisorSettings::new(
            application,
            stdio,
            !self.no_respawn,
            config,
        ))
    }
}

//! Process supervisor that keeps one program running.
//!
//! A detached supervisor spawns the program, records its own PID in a file
//! next to the application, and respawns the program whenever it exits
//! uncleanly. Controller invocations of the same binary use that record to
//! report status, stop the supervisor with a two-phase termination, or
//! restart it.
//!
//! The crate exposes [`run`] for the binary entrypoint along with the
//! building blocks used by it: the [`PidRegistry`], the two-phase
//! [`request_stop`] orchestrator, and the [`Supervisor`] loop.

use std::error::Error as _;
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use supervise_config::{
    ApplicationError, DEFAULT_CONTROLLER_LOG_FILTER, DEFAULT_LOG_FILTER, SupervisorConfig,
};
use thiserror::Error;

mod cli;
mod lifecycle;
mod process;
mod settings;
mod telemetry;

use cli::{Cli, Mode};
pub use lifecycle::{
    LifecycleCommand, LifecycleContext, LifecycleError, LifecycleOutput, SystemLifecycle,
};
pub use process::{
    ConsoleReporter, ControlRequest, ControlSignals, OpenedStdio, PidRegistry, ProcessProbe,
    QueuedControlSignals, RecordedProcess, RegistryError, ShutdownError, ShutdownPolicy,
    SignalDelivery, SignalError, StdioError, StdioTargets, StopOutcome, StopSignal, StopTarget,
    SupervisionOutcome, SupervisionReporter, Supervisor, SupervisorError, SystemControlSignals,
    SystemProcessProbe, TargetExit, TargetProcess, Termination, request_stop, terminate,
};
pub use settings::SupervisorSettings;
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

/// Environment variable that enables full error cause chains.
pub const DEBUG_ENV_VAR: &str = "SUPERVISE_DEBUG";

#[derive(Debug, Error)]
enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Application(#[from] ApplicationError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

impl AppError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::LoadConfiguration(_) | Self::Application(_) | Self::Telemetry(_) => 1,
            Self::Lifecycle(error) => error.exit_code(),
            Self::Supervisor(error) => error.exit_code(),
        }
    }
}

/// Runs the command line using the provided arguments and IO handles.
///
/// Usage errors exit with status 2 and help requests with status 0. Other
/// failures are written to `stderr` and exit with the status documented for
/// the failing operation.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };
    let Some(command) = cli.command else {
        let help = Cli::command().render_help();
        // Nothing useful can be done when the help text cannot be written.
        let _written = write!(stdout, "{help}");
        return ExitCode::SUCCESS;
    };
    let (mode, target) = command.into_parts();
    match execute(mode, target, stdout, stderr) {
        Ok(code) => code,
        Err(error) => {
            report_error(&error, stderr);
            ExitCode::from(error.exit_code())
        }
    }
}

fn execute<W: Write, E: Write>(
    mode: Mode,
    target: cli::TargetArgs,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError> {
    let config = SupervisorConfig::load_layers().map_err(AppError::LoadConfiguration)?;
    let default_filter = match mode {
        Mode::Monitor => DEFAULT_LOG_FILTER,
        Mode::Lifecycle(_) => DEFAULT_CONTROLLER_LOG_FILTER,
    };
    telemetry::initialise(&config, default_filter)?;
    let settings = target.into_settings(config)?;
    match mode {
        Mode::Monitor => monitor(&settings, stdout, stderr),
        Mode::Lifecycle(command) => {
            let binary = lifecycle::current_binary()?;
            let context = LifecycleContext {
                settings: &settings,
                supervisor_binary: &binary,
            };
            let mut output = LifecycleOutput::new(&mut *stdout, &mut *stderr);
            Ok(SystemLifecycle.handle(command, context, &mut output)?)
        }
    }
}

fn monitor<W: Write, E: Write>(
    settings: &SupervisorSettings,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<ExitCode, AppError> {
    let signals = SystemControlSignals::install()?;
    let reporter = ConsoleReporter::new(settings.application().name(), stdout, stderr);
    let supervisor = Supervisor::new(settings, settings.registry(), signals, reporter);
    let outcome = supervisor.run()?;
    Ok(ExitCode::from(outcome.exit_code()))
}

fn report_usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    let rendered = error.render();
    let _written = if error.use_stderr() {
        write!(stderr, "{rendered}")
    } else {
        write!(stdout, "{rendered}")
    };
    ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2))
}

fn report_error<E: Write>(error: &AppError, stderr: &mut E) {
    let _written = writeln!(stderr, "{error}");
    if std::env::var_os(DEBUG_ENV_VAR).is_none() {
        return;
    }
    let mut source = error.source();
    while let Some(cause) = source {
        let _written = writeln!(stderr, "  caused by: {cause}");
        source = cause.source();
    }
}

#[cfg(test)]
mod tests;

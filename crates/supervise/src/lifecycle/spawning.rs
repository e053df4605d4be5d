//! Launches a detached supervisor by re-invoking this executable in
//! `monitor` mode.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::types::LifecycleContext;
use crate::settings::SupervisorSettings;

/// Resolves the executable to re-invoke, preferring the running binary.
pub(crate) fn current_binary() -> Result<PathBuf, LifecycleError> {
    env::current_exe().map_err(|source| LifecycleError::CurrentExe { source })
}

/// Arguments that make a `monitor` invocation resolve the same application.
pub(super) fn monitor_arguments(settings: &SupervisorSettings) -> Vec<OsString> {
    let application = settings.application();
    let mut arguments = vec![
        OsString::from("monitor"),
        application.source().as_os_str().to_owned(),
        OsString::from("--name"),
        OsString::from(application.name()),
        OsString::from("--pid"),
        application.pid_path().as_os_str().to_owned(),
    ];
    if !settings.respawn() {
        arguments.push(OsString::from("--no-respawn"));
    }
    if !application.extra_args().is_empty() {
        arguments.push(OsString::from("--"));
        arguments.extend(application.extra_args().iter().cloned());
    }
    arguments
}

/// Starts a supervisor detached from the controller's session.
///
/// The supervisor's output goes to the requested files or is discarded, and
/// the target inherits it.
pub(super) fn spawn_supervisor(context: LifecycleContext<'_>) -> Result<Child, LifecycleError> {
    let settings = context.settings;
    let mut opened = settings.stdio().open()?;
    let mut command = Command::new(context.supervisor_binary);
    command
        .args(monitor_arguments(settings))
        .current_dir(settings.application().app_dir())
        .stdin(Stdio::null())
        .stdout(opened.stdout_or(Stdio::null))
        .stderr(opened.stderr_or(Stdio::null));
    detach(&mut command);
    debug!(
        target: LIFECYCLE_TARGET,
        binary = %context.supervisor_binary.display(),
        "launching supervisor"
    );
    command
        .spawn()
        .map_err(|source| LifecycleError::LaunchSupervisor {
            binary: context.supervisor_binary.to_path_buf(),
            source,
        })
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: `setsid` is async-signal-safe and touches no shared state.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid()
                .map(drop)
                .map_err(std::io::Error::from)
        });
    }
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}

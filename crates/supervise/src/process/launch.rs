//! Spawning the target program and tracking how it exits.

use std::fmt;
use std::process::{Child, Command, ExitStatus, Stdio};

use supervise_config::Application;
use tracing::{debug, info};

use super::PROCESS_TARGET;
use super::errors::{ShutdownError, SupervisorError};
use super::liveness::{self, StopSignal};
use super::shutdown::StopTarget;
use super::stdio::StdioTargets;

/// How the target process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetExit {
    /// Exit status zero.
    Clean,
    /// Non-zero exit status.
    Code(i32),
    /// Terminated by a signal.
    Signal(i32),
}

impl TargetExit {
    /// Classifies an exit status.
    #[must_use]
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self::Clean,
            Some(code) => Self::Code(code),
            None => Self::from_signal(status),
        }
    }

    #[cfg(unix)]
    fn from_signal(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        status.signal().map_or(Self::Code(1), Self::Signal)
    }

    #[cfg(not(unix))]
    fn from_signal(_status: ExitStatus) -> Self {
        Self::Code(1)
    }

    /// Whether the target exited with status zero.
    #[must_use]
    pub const fn is_clean(self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Exit code a process should report to mirror this exit.
    ///
    /// Signal terminations map to `128 + signal`, as shells report them.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Code(code) => u8::try_from(code & 0xff).unwrap_or(1),
            Self::Signal(signal) => u8::try_from(128 + signal).unwrap_or(u8::MAX),
        }
    }
}

impl TargetExit {
    /// Conventional name of the terminating signal, such as `SIGTERM`.
    #[must_use]
    pub fn signal_name(self) -> Option<String> {
        let Self::Signal(signal) = self else {
            return None;
        };
        Some(signal_name(signal))
    }
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    nix::sys::signal::Signal::try_from(signal)
        .map_or_else(|_| format!("signal {signal}"), |named| named.as_str().to_owned())
}

#[cfg(not(unix))]
fn signal_name(signal: i32) -> String {
    format!("signal {signal}")
}

impl fmt::Display for TargetExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => f.write_str("exit code 0"),
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Signal(signal) => f.write_str(&signal_name(*signal)),
        }
    }
}

/// A running instance of the target program.
#[derive(Debug)]
pub struct TargetProcess {
    child: Child,
    exit: Option<TargetExit>,
}

impl TargetProcess {
    /// Starts `application` from its directory.
    ///
    /// Output goes to the files in `stdio` when given and is inherited
    /// otherwise. On Linux the target is killed if the supervisor dies.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError`] when an output file cannot be opened or
    /// the program cannot be executed.
    pub fn spawn(application: &Application, stdio: &StdioTargets) -> Result<Self, SupervisorError> {
        let mut opened = stdio.open()?;
        let mut command = Command::new(application.program());
        command
            .args(application.args())
            .current_dir(application.app_dir())
            .stdin(Stdio::null())
            .stdout(opened.stdout_or(Stdio::inherit))
            .stderr(opened.stderr_or(Stdio::inherit));
        bind_to_parent(&mut command);
        let child = command.spawn().map_err(|source| SupervisorError::Spawn {
            program: application.program().to_path_buf(),
            source,
        })?;
        info!(
            target: PROCESS_TARGET,
            pid = child.id(),
            program = %application.program().display(),
            "target spawned"
        );
        Ok(Self { child, exit: None })
    }

    /// Operating-system identifier of the target.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Reaps the target if it has exited, without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Wait`] when the exit status cannot be polled.
    pub fn try_exit(&mut self) -> Result<Option<TargetExit>, ShutdownError> {
        if self.exit.is_some() {
            return Ok(self.exit);
        }
        let pid = self.pid();
        let status = self
            .child
            .try_wait()
            .map_err(|source| ShutdownError::Wait { pid, source })?;
        self.exit = status.map(TargetExit::from_status);
        if let Some(exit) = self.exit {
            debug!(target: PROCESS_TARGET, pid, %exit, "target reaped");
        }
        Ok(self.exit)
    }

    /// Kills and reaps the target, ignoring failures.
    pub(crate) fn abandon(mut self) {
        if self.exit.is_none() {
            // Best effort: the target may already have exited.
            if self.child.kill().is_ok() {
                let _reaped = self.child.wait();
            }
        }
    }
}

impl StopTarget for TargetProcess {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn is_alive(&mut self) -> Result<bool, ShutdownError> {
        Ok(self.try_exit()?.is_none())
    }

    fn signal(&mut self, signal: StopSignal) -> Result<(), ShutdownError> {
        if self.exit.is_some() {
            return Ok(());
        }
        liveness::send_signal(self.pid(), signal)?;
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn bind_to_parent(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    use nix::sys::prctl;
    use nix::sys::signal::Signal;

    // SAFETY: the hook only issues the async-signal-safe `prctl` syscall.
    unsafe {
        command.pre_exec(|| prctl::set_pdeathsig(Signal::SIGKILL).map_err(std::io::Error::from));
    }
}

#[cfg(not(target_os = "linux"))]
fn bind_to_parent(_command: &mut Command) {}

#[cfg(all(test, unix))]
mod tests {
    use std::ffi::OsString;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use rstest::{fixture, rstest};
    use supervise_config::ApplicationRequest;
    use tempfile::TempDir;

    use super::*;
    use crate::process::shutdown::{ShutdownPolicy, Termination, terminate};

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    fn shell(dir: &TempDir, script: &str) -> Application {
        let args = [OsString::from("-c"), OsString::from(script)];
        Application::resolve_from(
            dir.path(),
            ApplicationRequest {
                path: Some(Path::new("/bin/sh")),
                pid_path: Some(Path::new("app.pid")),
                name: Some("shell"),
                args: &args,
            },
        )
        .expect("resolve shell")
    }

    fn wait_for_exit(target: &mut TargetProcess) -> TargetExit {
        for _ in 0..500 {
            if let Some(exit) = target.try_exit().expect("poll target") {
                return exit;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("target did not exit");
    }

    #[rstest]
    #[case("exit 0", TargetExit::Clean, 0)]
    #[case("exit 3", TargetExit::Code(3), 3)]
    #[case("kill -9 $$", TargetExit::Signal(9), 137)]
    fn classifies_exit(
        dir: TempDir,
        #[case] script: &str,
        #[case] expected: TargetExit,
        #[case] code: u8,
    ) {
        let mut target = TargetProcess::spawn(&shell(&dir, script), &StdioTargets::default())
            .expect("spawn");
        let exit = wait_for_exit(&mut target);
        assert_eq!(exit, expected);
        assert_eq!(exit.exit_code(), code);
    }

    #[rstest]
    fn output_is_redirected(dir: TempDir) {
        let out = dir.path().join("out.log");
        let stdio = StdioTargets::new(Some(out.clone()), None, false);
        let mut target = TargetProcess::spawn(&shell(&dir, "echo hello"), &stdio).expect("spawn");
        wait_for_exit(&mut target);
        assert_eq!(fs::read_to_string(out).expect("read output"), "hello\n");
    }

    #[rstest]
    fn non_executable_program_fails_to_spawn(dir: TempDir) {
        let program = dir.path().join("server");
        fs::write(&program, "").expect("create program stub");
        let application = Application::resolve_from(
            dir.path(),
            ApplicationRequest {
                path: Some(Path::new("server")),
                ..ApplicationRequest::default()
            },
        )
        .expect("resolve");
        // Not executable, so exec fails.
        let error = TargetProcess::spawn(&application, &StdioTargets::default())
            .expect_err("spawn should fail");
        assert!(matches!(error, SupervisorError::Spawn { .. }));
        assert_eq!(error.exit_code(), 127);
    }

    #[rstest]
    fn terminate_reaps_child(dir: TempDir) {
        let mut target = TargetProcess::spawn(&shell(&dir, "exec sleep 30"), &StdioTargets::default())
            .expect("spawn");
        let policy = ShutdownPolicy::new(Duration::from_secs(2), Duration::from_millis(10));
        let termination = terminate(&mut target, &policy).expect("terminate");
        assert_eq!(termination, Termination::Graceful);
        assert_eq!(target.try_exit().expect("poll"), Some(TargetExit::Signal(15)));
    }
}

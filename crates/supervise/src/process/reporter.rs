//! Observer hooks for supervision events.

use std::cell::RefCell;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::PROCESS_TARGET;
use super::launch::TargetExit;
use super::shutdown::Termination;
use super::signals::ControlRequest;

/// Observer notified as the supervisor drives the target through its
/// lifecycle.
pub trait SupervisionReporter {
    /// The target was spawned.
    fn target_started(&self, pid: u32);

    /// The target exited on its own.
    fn target_exited(&self, pid: u32, exit: TargetExit);

    /// A respawn will happen after `delay`.
    fn respawn_scheduled(&self, delay: Duration);

    /// A pending respawn was abandoned because shutdown was requested.
    fn respawn_cancelled(&self);

    /// The supervisor is about to stop the running target.
    fn stop_requested(&self, pid: u32, request: ControlRequest);

    /// The target finished stopping.
    fn target_stopped(&self, pid: u32, termination: Termination);
}

impl<T> SupervisionReporter for Arc<T>
where
    T: SupervisionReporter,
{
    fn target_started(&self, pid: u32) {
        (**self).target_started(pid);
    }

    fn target_exited(&self, pid: u32, exit: TargetExit) {
        (**self).target_exited(pid, exit);
    }

    fn respawn_scheduled(&self, delay: Duration) {
        (**self).respawn_scheduled(delay);
    }

    fn respawn_cancelled(&self) {
        (**self).respawn_cancelled();
    }

    fn stop_requested(&self, pid: u32, request: ControlRequest) {
        (**self).stop_requested(pid, request);
    }

    fn target_stopped(&self, pid: u32, termination: Termination) {
        (**self).target_stopped(pid, termination);
    }
}

/// Reporter that renders supervision events as console lines.
///
/// Failures and forced stops go to `stderr`; everything else goes to
/// `stdout`.
#[derive(Debug)]
pub struct ConsoleReporter<W, E> {
    name: String,
    stdout: RefCell<W>,
    stderr: RefCell<E>,
}

impl<W: Write, E: Write> ConsoleReporter<W, E> {
    /// Creates a reporter naming the application `name`.
    pub fn new(name: impl Into<String>, stdout: W, stderr: E) -> Self {
        Self {
            name: name.into(),
            stdout: RefCell::new(stdout),
            stderr: RefCell::new(stderr),
        }
    }

    /// Returns the underlying writers.
    pub fn into_inner(self) -> (W, E) {
        (self.stdout.into_inner(), self.stderr.into_inner())
    }

    fn out(&self, args: std::fmt::Arguments<'_>) {
        write_line(&mut *self.stdout.borrow_mut(), args, "stdout");
    }

    fn err(&self, args: std::fmt::Arguments<'_>) {
        write_line(&mut *self.stderr.borrow_mut(), args, "stderr");
    }
}

fn write_line(writer: &mut impl Write, args: std::fmt::Arguments<'_>, stream: &'static str) {
    if let Err(error) = writer.write_fmt(args).and_then(|()| writer.write_all(b"\n")) {
        warn!(target: PROCESS_TARGET, stream, %error, "failed to write supervision message");
    }
}

impl<W: Write, E: Write> SupervisionReporter for ConsoleReporter<W, E> {
    fn target_started(&self, pid: u32) {
        self.out(format_args!("{} is running (pid: {pid})", self.name));
    }

    fn target_exited(&self, _pid: u32, exit: TargetExit) {
        match exit {
            TargetExit::Clean => self.out(format_args!("{} shut down gracefully.", self.name)),
            TargetExit::Code(code) => self.err(format_args!(
                "{} shut down with exit code: {code}.",
                self.name
            )),
            TargetExit::Signal(signal) => {
                let label = exit.signal_name().unwrap_or_else(|| signal.to_string());
                self.out(format_args!("{} shut down (signal: {label}).", self.name));
            }
        }
    }

    fn respawn_scheduled(&self, delay: Duration) {
        self.out(format_args!(
            "Restarting {} in {} ms",
            self.name,
            delay.as_millis()
        ));
    }

    fn respawn_cancelled(&self) {
        self.out(format_args!("Restart of {} cancelled", self.name));
    }

    fn stop_requested(&self, pid: u32, request: ControlRequest) {
        match request {
            ControlRequest::Shutdown => {
                self.out(format_args!("Stopping {} (pid: {pid})", self.name));
            }
            ControlRequest::Restart => {
                self.out(format_args!("Restarting {} (pid: {pid})", self.name));
            }
        }
    }

    fn target_stopped(&self, _pid: u32, termination: Termination) {
        if termination == Termination::Forced {
            self.err(format_args!(
                "{} termination timed out, fell back to SIGKILL",
                self.name
            ));
        }
        self.out(format_args!("{} terminated.", self.name));
    }
}

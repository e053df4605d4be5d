//! Liveness checks and signal delivery for arbitrary process identifiers.
//!
//! A process counts as alive when it exists, even if it belongs to another
//! user. Delivery failures caused by the process having already gone are not
//! errors: they are reported as [`SignalDelivery::ProcessGone`].

use super::errors::SignalError;

/// Signals the supervisor uses to stop a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Polite request to terminate (`SIGTERM`).
    Terminate,
    /// Forced termination (`SIGKILL`).
    Kill,
}

impl StopSignal {
    /// Conventional signal name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Terminate => "SIGTERM",
            Self::Kill => "SIGKILL",
        }
    }
}

/// Result of attempting to deliver a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDelivery {
    /// The kernel accepted the signal.
    Delivered,
    /// No such process existed when the signal was sent.
    ProcessGone,
}

/// Capability to inspect and signal processes by PID.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessProbe: Send + Sync {
    /// Reports whether a process with `pid` currently exists.
    fn is_alive(&self, pid: u32) -> bool;

    /// Sends `signal` to `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] when the signal cannot be delivered for a
    /// reason other than the process having exited.
    fn signal(&self, pid: u32, signal: StopSignal) -> Result<SignalDelivery, SignalError>;
}

/// Probe backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessProbe;

impl ProcessProbe for SystemProcessProbe {
    fn is_alive(&self, pid: u32) -> bool {
        platform::is_alive(pid)
    }

    fn signal(&self, pid: u32, signal: StopSignal) -> Result<SignalDelivery, SignalError> {
        platform::send_signal(pid, signal)
    }
}

/// Sends `signal` to `pid` without going through a probe instance.
pub(crate) fn send_signal(pid: u32, signal: StopSignal) -> Result<SignalDelivery, SignalError> {
    platform::send_signal(pid, signal)
}

#[cfg(unix)]
mod platform {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    use super::{SignalDelivery, StopSignal};
    use crate::process::errors::SignalError;

    fn to_pid(pid: u32) -> Option<Pid> {
        i32::try_from(pid)
            .ok()
            .filter(|raw| *raw > 0)
            .map(Pid::from_raw)
    }

    pub(super) fn is_alive(pid: u32) -> bool {
        let Some(target) = to_pid(pid) else {
            return false;
        };
        match kill(target, None) {
            Ok(()) | Err(Errno::EPERM) => !is_zombie(pid),
            Err(_) => false,
        }
    }

    pub(super) fn send_signal(pid: u32, signal: StopSignal) -> Result<SignalDelivery, SignalError> {
        let target = to_pid(pid).ok_or(SignalError::InvalidPid { pid })?;
        let raw = match signal {
            StopSignal::Terminate => Signal::SIGTERM,
            StopSignal::Kill => Signal::SIGKILL,
        };
        match kill(target, raw) {
            Ok(()) => Ok(SignalDelivery::Delivered),
            Err(Errno::ESRCH) => Ok(SignalDelivery::ProcessGone),
            Err(errno) => Err(SignalError::Deliver {
                pid,
                signal: signal.name(),
                source: errno.into(),
            }),
        }
    }

    // An exited process still awaiting reaping by its parent answers signal
    // probes but will never run again.
    #[cfg(target_os = "linux")]
    fn is_zombie(pid: u32) -> bool {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
            return false;
        };
        stat.rfind(')')
            .and_then(|end| stat.get(end + 1..))
            .and_then(|rest| rest.trim_start().chars().next())
            .is_some_and(|state| state == 'Z')
    }

    #[cfg(not(target_os = "linux"))]
    fn is_zombie(_pid: u32) -> bool {
        false
    }
}

#[cfg(not(unix))]
mod platform {
    use super::{SignalDelivery, StopSignal};
    use crate::process::errors::SignalError;

    pub(super) fn is_alive(_pid: u32) -> bool {
        false
    }

    pub(super) fn send_signal(
        _pid: u32,
        _signal: StopSignal,
    ) -> Result<SignalDelivery, SignalError> {
        Err(SignalError::UnsupportedPlatform)
    }
}

//! Two-phase termination: a polite signal, a bounded wait, then repeated
//! forced kills until the process is gone.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::ShutdownError;
use super::liveness::{ProcessProbe, StopSignal};
use super::registry::PidRegistry;

/// Timing applied while stopping a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Time allowed between the polite signal and escalation.
    pub grace_period: Duration,
    /// Interval between liveness checks.
    pub poll_interval: Duration,
}

impl ShutdownPolicy {
    /// Builds a policy, clamping the poll interval to at least one millisecond.
    #[must_use]
    pub fn new(grace_period: Duration, poll_interval: Duration) -> Self {
        Self {
            grace_period,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }
}

/// How a process that was asked to stop actually went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited within the grace period.
    Graceful,
    /// Required forced kills.
    Forced,
}

/// Outcome of a stop request against the PID record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No live process was recorded; nothing was signalled.
    AlreadyStopped,
    /// The recorded process exited within the grace period.
    GracefulStop {
        /// PID that was stopped.
        pid: u32,
    },
    /// The recorded process had to be killed.
    ForcedStop {
        /// PID that was stopped.
        pid: u32,
    },
}

/// A process that can be asked to stop and polled until it has.
pub trait StopTarget {
    /// Identifier used in logs.
    fn pid(&self) -> u32;

    /// Reports whether the process is still running.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the process state cannot be determined.
    fn is_alive(&mut self) -> Result<bool, ShutdownError>;

    /// Delivers `signal` to the process.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when delivery fails for a reason other than
    /// the process having exited.
    fn signal(&mut self, signal: StopSignal) -> Result<(), ShutdownError>;
}

/// A process known only by the PID stored in a record.
#[derive(Debug)]
pub struct RecordedProcess<'a, P> {
    pid: u32,
    probe: &'a P,
}

impl<'a, P: ProcessProbe> RecordedProcess<'a, P> {
    /// Wraps `pid`, probing it through `probe`.
    #[must_use]
    pub const fn new(pid: u32, probe: &'a P) -> Self {
        Self { pid, probe }
    }
}

impl<P: ProcessProbe> StopTarget for RecordedProcess<'_, P> {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&mut self) -> Result<bool, ShutdownError> {
        Ok(self.probe.is_alive(self.pid))
    }

    fn signal(&mut self, signal: StopSignal) -> Result<(), ShutdownError> {
        self.probe.signal(self.pid, signal)?;
        Ok(())
    }
}

/// Stops `target`, escalating to forced kills once the grace period lapses.
///
/// # Errors
///
/// Returns [`ShutdownError`] when signalling or polling the target fails.
pub fn terminate<T: StopTarget>(
    target: &mut T,
    policy: &ShutdownPolicy,
) -> Result<Termination, ShutdownError> {
    let pid = target.pid();
    info!(
        target: PROCESS_TARGET,
        pid,
        grace_ms = policy.grace_period.as_millis(),
        "sending SIGTERM"
    );
    target.signal(StopSignal::Terminate)?;
    let started = Instant::now();
    let deadline = started + policy.grace_period;
    loop {
        thread::sleep(policy.poll_interval);
        if !target.is_alive()? {
            info!(target: PROCESS_TARGET, pid, "process exited after SIGTERM");
            return Ok(Termination::Graceful);
        }
        if Instant::now() >= deadline {
            break;
        }
    }
    warn!(
        target: PROCESS_TARGET,
        pid,
        elapsed_ms = started.elapsed().as_millis(),
        "grace period elapsed; escalating to SIGKILL"
    );
    loop {
        target.signal(StopSignal::Kill)?;
        thread::sleep(policy.poll_interval);
        if !target.is_alive()? {
            info!(target: PROCESS_TARGET, pid, "process killed");
            return Ok(Termination::Forced);
        }
    }
}

/// Stops the process named by the PID record and removes the record.
///
/// # Errors
///
/// Returns [`ShutdownError`] when the record cannot be read or cleared, or
/// when signalling fails.
pub fn request_stop<P: ProcessProbe>(
    registry: &PidRegistry<P>,
    policy: &ShutdownPolicy,
) -> Result<StopOutcome, ShutdownError> {
    let Some(pid) = registry.read()? else {
        return Ok(StopOutcome::AlreadyStopped);
    };
    let mut target = RecordedProcess::new(pid, registry.probe());
    let termination = terminate(&mut target, policy)?;
    registry.clear()?;
    Ok(match termination {
        Termination::Graceful => StopOutcome::GracefulStop { pid },
        Termination::Forced => StopOutcome::ForcedStop { pid },
    })
}

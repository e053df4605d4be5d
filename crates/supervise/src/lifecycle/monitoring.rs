//! Waits for a freshly launched supervisor to claim the PID record.

use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};

use crate::process::{PidRegistry, ProcessProbe};

use super::error::LifecycleError;

/// Outcome of waiting on a launched supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LaunchState {
    /// The record names the launched supervisor.
    Recorded(u32),
    /// The supervisor exited first.
    Exited(Option<i32>),
    /// Neither happened before the deadline.
    TimedOut,
}

/// Polls until `child` records its PID, exits, or `timeout` passes.
pub(super) fn wait_for_record<P: ProcessProbe>(
    registry: &PidRegistry<P>,
    child: &mut Child,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<LaunchState, LifecycleError> {
    let expected = child.id();
    let deadline = Instant::now() + timeout;
    loop {
        if registry.read()? == Some(expected) {
            return Ok(LaunchState::Recorded(expected));
        }
        if let Some(status) = child
            .try_wait()
            .map_err(|source| LifecycleError::MonitorChild { source })?
        {
            return Ok(LaunchState::Exited(status.code()));
        }
        if Instant::now() >= deadline {
            return Ok(LaunchState::TimedOut);
        }
        thread::sleep(poll_interval);
    }
}

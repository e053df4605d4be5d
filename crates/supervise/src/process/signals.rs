//! Translation of operating-system signals into supervisor requests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::info;

use super::PROCESS_TARGET;
use super::errors::SupervisorError;

/// Request delivered to a running supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Stop the target and exit.
    Shutdown,
    /// Stop the target and start it again immediately.
    Restart,
}

/// Source of control requests, polled between supervision steps.
pub trait ControlSignals {
    /// Returns the most significant request received since the last poll.
    ///
    /// A shutdown outranks a restart when both are pending.
    fn poll(&mut self) -> Option<ControlRequest>;
}

/// Signal listener backed by `signal-hook`.
///
/// `SIGTERM`, `SIGINT`, and `SIGQUIT` request shutdown; `SIGHUP` requests a
/// restart of the target.
#[cfg(unix)]
pub struct SystemControlSignals {
    signals: signal_hook::iterator::Signals,
}

#[cfg(unix)]
impl SystemControlSignals {
    /// Installs the handlers.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::SignalInstall`] when registration fails.
    pub fn install() -> Result<Self, SupervisorError> {
        use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};

        let signals = signal_hook::iterator::Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| SupervisorError::SignalInstall { source })?;
        Ok(Self { signals })
    }
}

#[cfg(unix)]
impl ControlSignals for SystemControlSignals {
    fn poll(&mut self) -> Option<ControlRequest> {
        use signal_hook::consts::signal::SIGHUP;

        let mut request = None;
        for signal in self.signals.pending() {
            info!(target: PROCESS_TARGET, signal, "control signal received");
            let next = if signal == SIGHUP {
                ControlRequest::Restart
            } else {
                ControlRequest::Shutdown
            };
            request = Some(merge(request, next));
        }
        request
    }
}

#[cfg(unix)]
impl std::fmt::Debug for SystemControlSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemControlSignals").finish_non_exhaustive()
    }
}

/// Signal listener for platforms without POSIX signals; never fires.
#[cfg(not(unix))]
#[derive(Debug, Default)]
pub struct SystemControlSignals;

#[cfg(not(unix))]
impl SystemControlSignals {
    /// Returns a listener that reports no requests.
    ///
    /// # Errors
    ///
    /// Never fails on this platform.
    pub fn install() -> Result<Self, SupervisorError> {
        Ok(Self)
    }
}

#[cfg(not(unix))]
impl ControlSignals for SystemControlSignals {
    fn poll(&mut self) -> Option<ControlRequest> {
        None
    }
}

/// In-memory request queue; clones share the same queue.
///
/// Useful for driving a supervisor from another thread.
#[derive(Debug, Clone, Default)]
pub struct QueuedControlSignals {
    queue: Arc<Mutex<VecDeque<ControlRequest>>>,
}

impl QueuedControlSignals {
    /// Queues `request` for the next poll.
    pub fn send(&self, request: ControlRequest) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(request);
        }
    }
}

impl ControlSignals for QueuedControlSignals {
    fn poll(&mut self) -> Option<ControlRequest> {
        let mut queue = self.queue.lock().ok()?;
        queue
            .drain(..)
            .fold(None, |current, next| Some(merge(current, next)))
    }
}

fn merge(current: Option<ControlRequest>, next: ControlRequest) -> ControlRequest {
    match (current, next) {
        (Some(ControlRequest::Shutdown), _) | (_, ControlRequest::Shutdown) => {
            ControlRequest::Shutdown
        }
        _ => ControlRequest::Restart,
    }
}

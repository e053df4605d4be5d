//! Test double for [`SupervisionReporter`] that records events for assertions.

use std::sync::Mutex;
use std::time::Duration;

use crate::process::{ControlRequest, SupervisionReporter, TargetExit, Termination};

/// Supervision events tracked during scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionEvent {
    Started(u32),
    Exited(TargetExit),
    RespawnScheduled(Duration),
    RespawnCancelled,
    StopRequested(ControlRequest),
    Stopped(Termination),
}

/// Records supervision events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<SupervisionEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<SupervisionEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    /// PIDs of every target started so far, in order.
    #[must_use]
    pub fn started_pids(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SupervisionEvent::Started(pid) => Some(pid),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: SupervisionEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl SupervisionReporter for RecordingReporter {
    fn target_started(&self, pid: u32) {
        self.record(SupervisionEvent::Started(pid));
    }

    fn target_exited(&self, _pid: u32, exit: TargetExit) {
        self.record(SupervisionEvent::Exited(exit));
    }

    fn respawn_scheduled(&self, delay: Duration) {
        self.record(SupervisionEvent::RespawnScheduled(delay));
    }

    fn respawn_cancelled(&self) {
        self.record(SupervisionEvent::RespawnCancelled);
    }

    fn stop_requested(&self, _pid: u32, request: ControlRequest) {
        self.record(SupervisionEvent::StopRequested(request));
    }

    fn target_stopped(&self, _pid: u32, termination: Termination) {
        self.record(SupervisionEvent::Stopped(termination));
    }
}

//! The supervision loop.
//!
//! A [`Supervisor`] owns exactly one target process at a time. It records its
//! own PID from the first spawn until supervision ends, including the respawn
//! delay, so controllers can always reach it. It polls for control requests
//! and target exit, respawns after unclean exits, and stops the target with
//! the two-phase orchestrator when asked to shut down or restart.
//!
//! ```text
//! Idle -> Spawning -> Running -> Exited -> RespawnPending -> Spawning
//!                        |          \-> (clean exit) done
//!                        \-> Terminating -> done | Spawning
//! ```

use std::thread;
use std::time::{Duration, Instant};

use supervise_config::Application;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::SupervisorError;
use super::launch::{TargetExit, TargetProcess};
use super::liveness::{ProcessProbe, SystemProcessProbe};
use super::registry::PidRegistry;
use super::reporter::SupervisionReporter;
use super::shutdown::{ShutdownPolicy, terminate};
use super::signals::{ControlRequest, ControlSignals};
use super::stdio::StdioTargets;
use crate::settings::SupervisorSettings;

/// How a supervision run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionOutcome {
    /// The target exited cleanly.
    Completed,
    /// A shutdown request stopped the target or cancelled a respawn.
    Stopped,
    /// The target exited uncleanly and respawning is disabled.
    Failed(TargetExit),
}

impl SupervisionOutcome {
    /// Exit code the supervisor process should report.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Completed | Self::Stopped => 0,
            Self::Failed(exit) => exit.exit_code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterStop {
    Exit,
    Respawn,
}

#[derive(Debug)]
enum State {
    Idle,
    Spawning,
    Running(TargetProcess),
    Exited { pid: u32, exit: TargetExit },
    RespawnPending { deadline: Instant },
    Terminating { target: TargetProcess, then: AfterStop },
}

enum Step {
    Next(State),
    Done(SupervisionOutcome),
}

/// Keeps one application running.
pub struct Supervisor<S, R, P = SystemProcessProbe> {
    application: Application,
    stdio: StdioTargets,
    respawn: bool,
    respawn_delay: Duration,
    poll_interval: Duration,
    target_policy: ShutdownPolicy,
    registry: PidRegistry<P>,
    signals: S,
    reporter: R,
    own_pid: u32,
    holds_record: bool,
}

impl<S, R, P> Supervisor<S, R, P>
where
    S: ControlSignals,
    R: SupervisionReporter,
    P: ProcessProbe,
{
    /// Builds a supervisor for the application described by `settings`.
    pub fn new(settings: &SupervisorSettings, registry: PidRegistry<P>, signals: S, reporter: R) -> Self {
        let config = settings.config();
        Self {
            application: settings.application().clone(),
            stdio: settings.stdio().clone(),
            respawn: settings.respawn(),
            respawn_delay: config.respawn_delay(),
            poll_interval: config.poll_interval().max(Duration::from_millis(1)),
            target_policy: settings.target_policy(),
            registry,
            signals,
            reporter,
            own_pid: std::process::id(),
            holds_record: false,
        }
    }

    /// Runs until the target exits cleanly, a shutdown is requested, or the
    /// target fails with respawning disabled.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError`] when another supervisor already owns the
    /// PID record, when the target cannot be spawned, or when the record or
    /// the target cannot be managed. Any running target is killed first, and
    /// a record written by this supervisor is removed.
    pub fn run(mut self) -> Result<SupervisionOutcome, SupervisorError> {
        let mut state = State::Idle;
        loop {
            let step = match self.step(state) {
                Ok(step) => step,
                Err(error) => {
                    self.release_after_failure();
                    return Err(error);
                }
            };
            state = match step {
                Step::Next(next) => next,
                Step::Done(outcome) => {
                    info!(target: PROCESS_TARGET, ?outcome, "supervision finished");
                    return Ok(outcome);
                }
            };
        }
    }

    fn step(&mut self, state: State) -> Result<Step, SupervisorError> {
        match state {
            State::Idle => {
                self.claim()?;
                Ok(Step::Next(State::Spawning))
            }
            State::Spawning => self.spawn().map(|target| Step::Next(State::Running(target))),
            State::Running(target) => self.watch(target).map(Step::Next),
            State::Exited { pid, exit } => self.handle_exit(pid, exit),
            State::RespawnPending { deadline } => self.await_respawn(deadline),
            State::Terminating { target, then } => self.stop(target, then),
        }
    }

    /// Fails when the record names a live process other than this supervisor
    /// holding it.
    fn claim(&self) -> Result<(), SupervisorError> {
        match self.registry.read()? {
            Some(pid) if pid == self.own_pid && self.holds_record => Ok(()),
            Some(pid) => Err(SupervisorError::AlreadyRunning { pid }),
            None => Ok(()),
        }
    }

    fn spawn(&mut self) -> Result<TargetProcess, SupervisorError> {
        // Respawns re-check the record in case it was replaced meanwhile.
        if self.holds_record {
            self.claim()?;
        }
        let target = TargetProcess::spawn(&self.application, &self.stdio)?;
        if let Err(error) = self.registry.write(self.own_pid) {
            target.abandon();
            return Err(error.into());
        }
        self.holds_record = true;
        self.reporter.target_started(target.pid());
        Ok(target)
    }

    fn release(&mut self) -> Result<(), SupervisorError> {
        self.registry.clear()?;
        self.holds_record = false;
        Ok(())
    }

    fn release_after_failure(&mut self) {
        if !self.holds_record {
            return;
        }
        match self.registry.read() {
            Ok(Some(pid)) if pid != self.own_pid => {}
            Ok(_) => {
                if let Err(error) = self.release() {
                    warn!(
                        target: PROCESS_TARGET,
                        %error,
                        "failed to remove pid record after supervision failure"
                    );
                }
            }
            Err(error) => warn!(
                target: PROCESS_TARGET,
                %error,
                "failed to inspect pid record after supervision failure"
            ),
        }
    }

    fn watch(&mut self, mut target: TargetProcess) -> Result<State, SupervisorError> {
        if let Some(request) = self.signals.poll() {
            self.reporter.stop_requested(target.pid(), request);
            let then = match request {
                ControlRequest::Shutdown => AfterStop::Exit,
                ControlRequest::Restart => AfterStop::Respawn,
            };
            return Ok(State::Terminating { target, then });
        }
        match target.try_exit() {
            Ok(Some(exit)) => Ok(State::Exited {
                pid: target.pid(),
                exit,
            }),
            Ok(None) => {
                thread::sleep(self.poll_interval);
                Ok(State::Running(target))
            }
            Err(error) => {
                target.abandon();
                Err(error.into())
            }
        }
    }

    fn handle_exit(&mut self, pid: u32, exit: TargetExit) -> Result<Step, SupervisorError> {
        info!(target: PROCESS_TARGET, pid, %exit, "target exited");
        if exit.is_clean() || !self.respawn {
            self.release()?;
        }
        self.reporter.target_exited(pid, exit);
        if exit.is_clean() {
            return Ok(Step::Done(SupervisionOutcome::Completed));
        }
        if !self.respawn {
            return Ok(Step::Done(SupervisionOutcome::Failed(exit)));
        }
        info!(
            target: PROCESS_TARGET,
            delay_ms = self.respawn_delay.as_millis(),
            "respawn scheduled"
        );
        self.reporter.respawn_scheduled(self.respawn_delay);
        Ok(Step::Next(State::RespawnPending {
            deadline: Instant::now() + self.respawn_delay,
        }))
    }

    fn await_respawn(&mut self, deadline: Instant) -> Result<Step, SupervisorError> {
        match self.signals.poll() {
            Some(ControlRequest::Shutdown) => {
                info!(target: PROCESS_TARGET, "respawn cancelled by shutdown request");
                self.release()?;
                self.reporter.respawn_cancelled();
                Ok(Step::Done(SupervisionOutcome::Stopped))
            }
            Some(ControlRequest::Restart) => Ok(Step::Next(State::Spawning)),
            None => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(Step::Next(State::Spawning));
                }
                thread::sleep(self.poll_interval.min(deadline - now));
                Ok(Step::Next(State::RespawnPending { deadline }))
            }
        }
    }

    fn stop(&mut self, mut target: TargetProcess, then: AfterStop) -> Result<Step, SupervisorError> {
        let pid = target.pid();
        let termination = match terminate(&mut target, &self.target_policy) {
            Ok(termination) => termination,
            Err(error) => {
                target.abandon();
                return Err(error.into());
            }
        };
        self.reporter.target_stopped(pid, termination);
        match then {
            AfterStop::Exit => {
                self.release()?;
                Ok(Step::Done(SupervisionOutcome::Stopped))
            }
            AfterStop::Respawn => Ok(Step::Next(State::Spawning)),
        }
    }
}

impl<S, R, P> std::fmt::Debug for Supervisor<S, R, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("application", &self.application.name())
            .field("respawn", &self.respawn)
            .field("own_pid", &self.own_pid)
            .field("holds_record", &self.holds_record)
            .finish_non_exhaustive()
    }
}

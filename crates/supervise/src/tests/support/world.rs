//! Shared world for supervision scenarios.
//!
//! Targets are `/bin/sh -c <script>` invocations described by a manifest in a
//! temporary application directory, so scripts can use relative paths for
//! marker files. The supervisor runs on a background thread and is driven
//! through a [`QueuedControlSignals`] handle. Controller stops go through a
//! [`LoopbackProbe`], which turns signals aimed at this process into queued
//! requests instead of delivering them.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rstest::fixture;
use serde_json::json;
use supervise_config::{Application, ApplicationRequest, MANIFEST_FILE_NAME, SupervisorConfig};
use tempfile::TempDir;

use super::reporter::{RecordingReporter, SupervisionEvent};
use crate::process::{
    ControlRequest, PidRegistry, ProcessProbe, QueuedControlSignals, ShutdownError,
    ShutdownPolicy, SignalDelivery, SignalError, StdioTargets, StopOutcome, StopSignal,
    SupervisionOutcome, Supervisor, SupervisorError, request_stop,
};
use crate::settings::SupervisorSettings;

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const WAIT_STEP: Duration = Duration::from_millis(10);
const PROGRAM_LINK: &str = "server";

type RunResult = Result<SupervisionOutcome, SupervisorError>;

/// Fixture providing a fresh world per scenario.
#[fixture]
pub fn world() -> RefCell<SupervisorWorld> {
    RefCell::new(SupervisorWorld::new())
}

/// State shared by the steps of one scenario.
pub struct SupervisorWorld {
    dir: TempDir,
    respawn: bool,
    respawn_delay_ms: u64,
    signals: QueuedControlSignals,
    reporter: Arc<RecordingReporter>,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<RunResult>>,
    result: Option<RunResult>,
    stop_outcome: Option<Result<StopOutcome, ShutdownError>>,
}

/// Probe for a supervisor running on a thread of this test process.
///
/// The supervisor's PID is this process, so real signals would hit the test
/// runner. Signals become queued shutdown requests and the supervisor counts
/// as alive until its thread finishes.
pub struct LoopbackProbe {
    signals: QueuedControlSignals,
    finished: Arc<AtomicBool>,
}

impl ProcessProbe for LoopbackProbe {
    fn is_alive(&self, pid: u32) -> bool {
        pid == std::process::id() && !self.finished.load(Ordering::SeqCst)
    }

    fn signal(&self, pid: u32, _signal: StopSignal) -> Result<SignalDelivery, SignalError> {
        if !self.is_alive(pid) {
            return Ok(SignalDelivery::ProcessGone);
        }
        self.signals.send(ControlRequest::Shutdown);
        Ok(SignalDelivery::Delivered)
    }
}

impl SupervisorWorld {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            respawn: true,
            respawn_delay_ms: 100,
            signals: QueuedControlSignals::default(),
            reporter: Arc::new(RecordingReporter::default()),
            finished: Arc::new(AtomicBool::new(false)),
            handle: None,
            result: None,
            stop_outcome: None,
        }
    }

    /// Describes the target with a manifest naming `command` and `args`.
    pub fn write_manifest(&self, command: &str, args: &[&str]) {
        let manifest = json!({ "name": "demo", "command": command, "args": args });
        fs::write(self.dir.path().join(MANIFEST_FILE_NAME), manifest.to_string())
            .expect("write manifest");
    }

    /// Describes a shell script target.
    pub fn use_script(&self, script: &str) {
        self.write_manifest("/bin/sh", &["-c", script]);
    }

    /// Runs `script` through a symlink to the shell so the program can be
    /// removed while supervised.
    pub fn use_linked_script(&self, script: &str) {
        std::os::unix::fs::symlink("/bin/sh", self.dir.path().join(PROGRAM_LINK))
            .expect("link program");
        self.write_manifest(PROGRAM_LINK, &["-c", script]);
    }

    pub fn remove_program(&self) {
        fs::remove_file(self.dir.path().join(PROGRAM_LINK)).expect("remove program");
    }

    pub fn disable_respawn(&mut self) {
        self.respawn = false;
    }

    pub fn set_respawn_delay(&mut self, delay_ms: u64) {
        self.respawn_delay_ms = delay_ms;
    }

    fn settings(&self) -> SupervisorSettings {
        let application = Application::resolve_from(
            self.dir.path(),
            ApplicationRequest {
                path: Some(self.dir.path()),
                ..ApplicationRequest::default()
            },
        )
        .expect("resolve application");
        let config = SupervisorConfig {
            child_grace_period_ms: 300,
            poll_interval_ms: 10,
            respawn_delay_ms: self.respawn_delay_ms,
            ..SupervisorConfig::default()
        };
        SupervisorSettings::new(application, StdioTargets::default(), self.respawn, config)
    }

    pub fn pid_path(&self) -> PathBuf {
        self.settings().application().pid_path().to_path_buf()
    }

    /// Writes a record naming this (live) test process.
    pub fn occupy_record(&self) {
        self.settings()
            .registry()
            .write(std::process::id())
            .expect("write record");
    }

    pub fn start(&mut self) {
        let settings = self.settings();
        let supervisor = Supervisor::new(
            &settings,
            settings.registry(),
            self.signals.clone(),
            Arc::clone(&self.reporter),
        );
        let finished = Arc::clone(&self.finished);
        self.handle = Some(thread::spawn(move || {
            let result = supervisor.run();
            finished.store(true, Ordering::SeqCst);
            result
        }));
    }

    /// Stops the supervisor the way a controller does, through its record.
    pub fn stop_through_record(&mut self) {
        let registry = PidRegistry::new(
            self.pid_path(),
            LoopbackProbe {
                signals: self.signals.clone(),
                finished: Arc::clone(&self.finished),
            },
        );
        let policy = ShutdownPolicy::new(WAIT_TIMEOUT, WAIT_STEP);
        self.stop_outcome = Some(request_stop(&registry, &policy));
    }

    pub fn stop_outcome(&self) -> Option<&Result<StopOutcome, ShutdownError>> {
        self.stop_outcome.as_ref()
    }

    pub fn wait_for_respawn_scheduled(&self) -> Result<(), String> {
        self.wait_until(|world| {
            world
                .reporter
                .events()
                .iter()
                .any(|event| matches!(event, SupervisionEvent::RespawnScheduled(_)))
        })
        .map_err(|()| format!("no respawn scheduled, saw {:?}", self.reporter.events()))
    }

    pub fn send(&self, request: ControlRequest) {
        self.signals.send(request);
    }

    pub fn wait_for_starts(&self, count: usize) -> Result<(), String> {
        self.wait_until(|world| world.reporter.started_pids().len() >= count)
            .map_err(|()| {
                format!(
                    "expected {count} starts, saw {:?}",
                    self.reporter.events()
                )
            })
    }

    pub fn wait_for_file(&self, name: &str) -> Result<(), String> {
        let path = self.dir.path().join(name);
        self.wait_until(|_| path.exists())
            .map_err(|()| format!("{} never appeared", path.display()))
    }

    fn wait_until(&self, mut ready: impl FnMut(&Self) -> bool) -> Result<(), ()> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if ready(self) {
                return Ok(());
            }
            thread::sleep(WAIT_STEP);
        }
        Err(())
    }

    /// Waits for the supervisor thread to finish and stores its result.
    pub fn join(&mut self) -> Result<&RunResult, String> {
        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + WAIT_TIMEOUT;
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    return Err(String::from("supervisor did not finish in time"));
                }
                thread::sleep(WAIT_STEP);
            }
            let result = handle
                .join()
                .map_err(|_| String::from("supervisor thread panicked"))?;
            self.result = Some(result);
        }
        self.result
            .as_ref()
            .ok_or_else(|| String::from("supervisor was never started"))
    }

    pub fn events(&self) -> Vec<SupervisionEvent> {
        self.reporter.events()
    }

    pub fn started_pids(&self) -> Vec<u32> {
        self.reporter.started_pids()
    }

    pub fn app_dir(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for SupervisorWorld {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.send(ControlRequest::Shutdown);
            // Best effort: leave no target running after a failed scenario.
            let _joined = self.join();
        }
    }
}

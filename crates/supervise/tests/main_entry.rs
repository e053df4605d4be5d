//! Integration tests for the `supervise` binary entry point.
//!
//! Covers usage handling, the foreground `monitor` mode, and a full
//! `start`/`status`/`stop` round trip against a detached supervisor.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

fn app_dir(script: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let manifest = serde_json::json!({
        "name": "demo",
        "command": "/bin/sh",
        "args": ["-c", script],
    });
    fs::write(dir.path().join("supervise.json"), manifest.to_string()).expect("write manifest");
    dir
}

fn supervise(command: &str, dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("supervise");
    cmd.arg(command)
        .arg(dir)
        .env("SUPERVISE_POLL_INTERVAL_MS", "20")
        .env("SUPERVISE_RESPAWN_DELAY_MS", "100")
        .env("SUPERVISE_CHILD_GRACE_PERIOD_MS", "500")
        .env("SUPERVISE_GRACE_PERIOD_MS", "3000");
    cmd
}

#[test]
fn no_command_prints_help() {
    let mut command = cargo_bin_cmd!("supervise");
    command.assert().success().stdout(contains("Usage"));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("supervise");
    command.arg("launch");
    command.assert().code(2);
}

#[test]
fn status_without_supervisor_exits_with_one() {
    let dir = app_dir("exec sleep 30");
    supervise("status", dir.path())
        .assert()
        .code(1)
        .stdout(contains("demo is not running"));
}

#[test]
fn stop_without_supervisor_succeeds() {
    let dir = app_dir("exec sleep 30");
    supervise("stop", dir.path())
        .assert()
        .success()
        .stdout(contains("demo is not running"));
}

#[test]
fn missing_application_path_fails() {
    let dir = TempDir::new().expect("temp dir");
    supervise("status", &dir.path().join("absent"))
        .assert()
        .code(1)
        .stderr(contains("cannot be resolved"));
}

#[test]
fn monitor_without_respawn_propagates_exit_code() {
    let dir = app_dir("exit 5");
    supervise("monitor", dir.path())
        .arg("--no-respawn")
        .assert()
        .code(5)
        .stdout(contains("demo is running (pid: "))
        .stderr(contains("demo shut down with exit code: 5."));
    assert!(!dir.path().join(".supervisor.pid").exists());
}

#[test]
fn monitor_passes_trailing_arguments() {
    let dir = app_dir("echo \"$0 $1\" > args.txt");
    supervise("monitor", dir.path())
        .args(["--", "first", "second"])
        .assert()
        .success()
        .stdout(contains("demo shut down gracefully."));
    let recorded = fs::read_to_string(dir.path().join("args.txt")).expect("args recorded");
    assert_eq!(recorded.trim(), "first second");
}

#[test]
fn start_status_stop_round_trip() {
    let dir = app_dir("exec sleep 30");

    supervise("start", dir.path())
        .assert()
        .success()
        .stdout(contains("demo is now being monitored (pid: "));
    assert!(dir.path().join(".supervisor.pid").exists());

    supervise("start", dir.path())
        .assert()
        .code(1)
        .stderr(contains("demo is already running"));

    supervise("status", dir.path())
        .assert()
        .success()
        .stdout(contains("demo is running (pid: "));

    supervise("stop", dir.path())
        .assert()
        .success()
        .stdout(contains("demo terminated."));
    assert!(!dir.path().join(".supervisor.pid").exists());

    supervise("status", dir.path()).assert().code(1);
}

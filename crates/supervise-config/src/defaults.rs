/// File name of the PID record inside the application directory.
pub const PID_FILE_NAME: &str = ".supervisor.pid";

/// Default grace period, in milliseconds, before `stop` escalates to `SIGKILL`.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 5000;

/// Default grace period, in milliseconds, the supervisor grants its target.
///
/// Kept below [`DEFAULT_GRACE_PERIOD_MS`] so a stopping supervisor reaps its
/// target before the controller escalates against the supervisor.
pub const DEFAULT_CHILD_GRACE_PERIOD_MS: u64 = 4000;

/// Default interval, in milliseconds, between liveness probes.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Default delay, in milliseconds, before respawning a crashed target.
pub const DEFAULT_RESPAWN_DELAY_MS: u64 = 2000;

/// Default time, in milliseconds, `start` waits for the PID record.
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 5000;

/// Log filter used by the supervisor when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log filter used by controller commands when none is configured.
pub const DEFAULT_CONTROLLER_LOG_FILTER: &str = "warn";

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

//! Shared configuration for the `supervise` process supervisor.
//!
//! The crate owns the layered tunables consumed by both the controller and the
//! background supervisor, together with the application discovery rules that
//! turn a path on the command line into a program to run, an application name
//! and the location of the PID record. Tunables are loaded with
//! [`ortho_config`] so defaults, configuration files and `SUPERVISE_*`
//! environment variables compose in the usual precedence order.

mod defaults;
mod logging;
mod manifest;
mod paths;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CHILD_GRACE_PERIOD_MS, DEFAULT_CONTROLLER_LOG_FILTER, DEFAULT_GRACE_PERIOD_MS,
    DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RESPAWN_DELAY_MS,
    DEFAULT_STARTUP_TIMEOUT_MS, PID_FILE_NAME, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use manifest::{AppManifest, MANIFEST_FILE_NAME, ManifestError};
pub use paths::{Application, ApplicationError, ApplicationRequest};

/// Layered tunables shared by the controller and the supervisor.
///
/// Timings are expressed in milliseconds so they can be supplied verbatim via
/// environment variables such as `SUPERVISE_GRACE_PERIOD_MS=8000`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SUPERVISE")]
pub struct SupervisorConfig {
    /// Time the controller grants the supervisor to exit after `SIGTERM`.
    #[ortho_config(default = 5000)]
    pub grace_period_ms: u64,
    /// Time the supervisor grants its target to exit after `SIGTERM`.
    #[ortho_config(default = 4000)]
    pub child_grace_period_ms: u64,
    /// Interval between liveness probes.
    #[ortho_config(default = 200)]
    pub poll_interval_ms: u64,
    /// Delay before a crashed target is spawned again.
    #[ortho_config(default = 2000)]
    pub respawn_delay_ms: u64,
    /// Time `start` waits for the supervisor to publish its PID record.
    #[ortho_config(default = 5000)]
    pub startup_timeout_ms: u64,
    /// Tracing filter expression; the role-specific default applies when unset.
    pub log_filter: Option<String>,
    /// Output format for structured logs.
    pub log_format: Option<LogFormat>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            child_grace_period_ms: DEFAULT_CHILD_GRACE_PERIOD_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            respawn_delay_ms: DEFAULT_RESPAWN_DELAY_MS,
            startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT_MS,
            log_filter: None,
            log_format: None,
        }
    }
}

impl SupervisorConfig {
    /// Loads tunables from configuration files and the environment.
    ///
    /// Command-line flags are owned by the `supervise` binary itself, so only
    /// the program name is forwarded to the loader.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when a configuration source is
    /// malformed.
    pub fn load_layers() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter([OsString::from(env!("CARGO_PKG_NAME"))])
    }

    /// Grace period granted to the supervisor by `stop`.
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Grace period granted to the target by the supervisor.
    #[must_use]
    pub const fn child_grace_period(&self) -> Duration {
        Duration::from_millis(self.child_grace_period_ms)
    }

    /// Interval between liveness probes.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay between an unclean exit and the next spawn.
    #[must_use]
    pub const fn respawn_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_delay_ms)
    }

    /// Upper bound on how long `start` waits for the supervisor.
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Log filter, falling back to the supplied role default.
    #[must_use]
    pub fn log_filter_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.log_filter.as_deref().unwrap_or(fallback)
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timings() {
        let config = SupervisorConfig::default();
        assert_eq!(config.grace_period(), Duration::from_millis(5000));
        assert_eq!(config.child_grace_period(), Duration::from_millis(4000));
        assert_eq!(config.poll_interval(), Duration::from_millis(200));
        assert_eq!(config.respawn_delay(), Duration::from_millis(2000));
        assert!(config.child_grace_period() < config.grace_period());
    }

    #[test]
    fn log_filter_prefers_configured_value() {
        let mut config = SupervisorConfig::default();
        assert_eq!(config.log_filter_or("warn"), "warn");
        config.log_filter = Some(String::from("debug"));
        assert_eq!(config.log_filter_or("warn"), "debug");
    }

    #[test]
    fn log_format_defaults_to_compact() {
        let config = SupervisorConfig::default();
        assert_eq!(config.log_format(), LogFormat::Compact);
    }
}

//! Effective settings for one supervised application.

use supervise_config::{Application, SupervisorConfig};

use crate::process::{PidRegistry, ShutdownPolicy, StdioTargets, SystemProcessProbe};

/// Application selection, output redirection, and tunables combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    application: Application,
    stdio: StdioTargets,
    respawn: bool,
    config: SupervisorConfig,
}

impl SupervisorSettings {
    /// Combines the resolved application with runtime options.
    #[must_use]
    pub const fn new(
        application: Application,
        stdio: StdioTargets,
        respawn: bool,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            application,
            stdio,
            respawn,
            config,
        }
    }

    /// Application being supervised.
    #[must_use]
    pub const fn application(&self) -> &Application {
        &self.application
    }

    /// Output redirection requested on the command line.
    #[must_use]
    pub const fn stdio(&self) -> &StdioTargets {
        &self.stdio
    }

    /// Whether an unclean exit triggers a respawn.
    #[must_use]
    pub const fn respawn(&self) -> bool {
        self.respawn
    }

    /// Layered tunables.
    #[must_use]
    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Policy used when a controller stops the supervisor.
    #[must_use]
    pub fn controller_policy(&self) -> ShutdownPolicy {
        ShutdownPolicy::new(self.config.grace_period(), self.config.poll_interval())
    }

    /// Policy used when the supervisor stops its target.
    #[must_use]
    pub fn target_policy(&self) -> ShutdownPolicy {
        ShutdownPolicy::new(
            self.config.child_grace_period(),
            self.config.poll_interval(),
        )
    }

    /// Registry for this application's PID record.
    #[must_use]
    pub fn registry(&self) -> PidRegistry<SystemProcessProbe> {
        PidRegistry::system(self.application.pid_path())
    }
}

//! Controller-side lifecycle commands.
//!
//! - [`types`] defines the command model and output wrapper.
//! - [`error`] captures the error surface exposed to the CLI.
//! - [`spawning`] launches a detached supervisor.
//! - [`monitoring`] waits for a new supervisor to claim the PID record.
//! - [`controller`] implements start, stop, restart, and status.

mod controller;
mod error;
mod monitoring;
mod spawning;
mod types;

pub use controller::SystemLifecycle;
pub(crate) use spawning::current_binary;
pub use error::LifecycleError;
pub use types::{LifecycleCommand, LifecycleContext, LifecycleOutput};

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

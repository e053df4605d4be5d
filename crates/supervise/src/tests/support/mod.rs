//! Test harness utilities for the supervision behavioural suite.

mod reporter;
#[path = "world.rs"]
mod world_state;

pub use reporter::{RecordingReporter, SupervisionEvent};
pub use world_state::{SupervisorWorld, world};

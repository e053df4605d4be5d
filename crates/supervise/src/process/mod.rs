//! Process supervision primitives: liveness probing, the PID record, signal
//! handling, two-phase termination, and the supervision loop itself.

mod errors;
pub(crate) mod launch;
pub(crate) mod liveness;
pub(crate) mod registry;
mod reporter;
pub(crate) mod shutdown;
pub(crate) mod signals;
pub(crate) mod stdio;
pub(crate) mod supervisor;

pub use errors::{RegistryError, ShutdownError, SignalError, SupervisorError};
pub use launch::{TargetExit, TargetProcess};
pub use liveness::{ProcessProbe, SignalDelivery, StopSignal, SystemProcessProbe};
pub use registry::PidRegistry;
pub use shutdown::{
    RecordedProcess, ShutdownPolicy, StopOutcome, StopTarget, Termination, request_stop, terminate,
};
pub use signals::{ControlRequest, ControlSignals, QueuedControlSignals, SystemControlSignals};
pub use stdio::{OpenedStdio, StdioError, StdioTargets};
pub use reporter::{ConsoleReporter, SupervisionReporter};
pub use supervisor::{SupervisionOutcome, Supervisor};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

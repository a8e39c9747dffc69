use std::future::Future;
use std::path::PathBuf;

use crate::event::ProcessId;

/// Trait implementing process management on the host.
pub trait ProcessControl: Send + Sync + 'static {
    /// Error returned by this trait.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Terminates the given process by ID.
    ///
    /// This is best-effort: the process may already be gone. It is only
    /// used for processes that could not be attached to, since attached
    /// processes are killed through their [DebugContext](crate::debugger::DebugContext).
    fn terminate(&self, process: ProcessId);

    /// Launches an external debugger bound to a target process.
    ///
    /// On success, the ID of the debugger process is returned.
    fn launch_debugger(
        &self,
        request: &HandoverRequest,
    ) -> impl Future<Output = Result<ProcessId, Self::Error>> + Send;

    /// Returns whether the given debugger process is still alive.
    fn is_alive(&self, debugger: ProcessId) -> bool;
}

/// Parameters of a debugger handover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandoverRequest {
    /// The process to hand over.
    pub process: ProcessId,

    /// Executable of the process to hand over.
    pub executable: PathBuf,

    /// Whether the debugger should save a report first.
    pub save_report: bool,

    /// Whether the debugger must run without a graphical terminal.
    pub console: bool,
}

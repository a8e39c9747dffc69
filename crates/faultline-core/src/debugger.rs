use std::future::Future;
use std::path::{Path, PathBuf};

use crate::event::{ProcessId, ThreadId};

/// Trait implementing the attach logic of a debugger.
pub trait Debugger: Send + Sync + 'static {
    /// Debug context returned by this debugger.
    type Context: DebugContext;

    /// Error returned by this trait.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Attaches to the given process.
    ///
    /// # Note
    ///
    /// This is called while the registry is locked, so it must not block
    /// for long.
    fn attach(&self, process: ProcessId) -> Result<Self::Context, Self::Error>;
}

/// Trait implementing the inspection and control of an attached process.
///
/// Dropping the context detaches from the process.
pub trait DebugContext: Send + 'static {
    /// Error returned by this trait.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns metadata of the attached process.
    fn process_info(&self) -> &ProcessInfo;

    /// Reads a NUL-terminated string from the process' memory.
    ///
    /// At most `max_len` bytes are read.
    fn read_string(&self, addr: u64, max_len: usize) -> Result<String, Self::Error>;

    /// Computes the stack trace of the given thread.
    fn stack_trace(&self, thread: ThreadId) -> Result<StackTrace, Self::Error>;

    /// Sends a control request to the process.
    fn control(
        &mut self,
        request: ControlRequest<'_>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Control request sent through a [DebugContext].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlRequest<'a> {
    /// Keeps the process from exiting until a decision is made.
    PreventExit,

    /// Prepares the process to be handed over to another debugger.
    PrepareHandover,

    /// Writes a core file of the process at the given path.
    WriteCoreFile(&'a Path),

    /// Kills the process.
    ///
    /// Unlike [ProcessControl::terminate](crate::control::ProcessControl::terminate),
    /// this never reaches another process reusing the same ID.
    Terminate,
}

/// Metadata of a target process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Path of the process' executable.
    ///
    /// Empty if it could not be retrieved.
    pub executable: PathBuf,

    /// Command line arguments the process was launched with.
    pub args: Vec<String>,
}

impl ProcessInfo {
    /// Returns the file name of the executable.
    pub fn executable_name(&self) -> &str {
        self.executable
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// Returns a short description of the process, for display purposes.
    pub fn display_name(&self) -> String {
        if self.args.is_empty() {
            self.executable.display().to_string()
        } else {
            self.args.join(" ")
        }
    }
}

/// Stack trace of a stopped thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackTrace {
    /// Current instruction pointer.
    pub instr_addr: u64,

    /// Description of the instruction pointer location, if resolved.
    pub location: Option<String>,

    /// Caller frames, innermost first.
    pub frames: Vec<StackFrame>,
}

/// Single frame of a [StackTrace].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    /// Address of the frame.
    pub frame_addr: u64,

    /// Return address of the frame.
    pub ret_addr: u64,

    /// Description of the return address location, if resolved.
    pub location: Option<String>,
}

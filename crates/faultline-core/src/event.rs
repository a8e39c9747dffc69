use std::fmt;

/// Identity of a target process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Returns the raw process ID.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a thread within a target process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u32);

impl ThreadId {
    /// Returns the raw thread ID.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Debug event received for a target process.
///
/// Events are produced by the [Listener](crate::listener::Listener), owned by
/// the mailbox they are pushed into, and dropped once consumed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultEvent {
    /// The process the event is about.
    pub process: ProcessId,

    /// The thread which triggered the event.
    pub thread: ThreadId,

    /// What happened.
    pub kind: FaultKind,
}

impl FaultEvent {
    /// Creates a new fault event.
    pub const fn new(process: ProcessId, thread: ThreadId, kind: FaultKind) -> Self {
        Self {
            process,
            thread,
            kind,
        }
    }
}

/// Kind of a [FaultEvent], along with its kind-specific payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// The thread raised an exception (e.g., a fatal signal).
    Exception {
        /// Exception code (signal number on Unix).
        code: i32,

        /// Faulting address, if known.
        address: Option<u64>,
    },

    /// The thread explicitly called into the debugger.
    DebuggerCall {
        /// Address of the message string within the target's memory.
        message: u64,
    },

    /// The target process is gone.
    ProcessDeleted,

    /// The target process was handed over to a debugger.
    HandedOver {
        /// The debugger which took the process over, if known.
        debugger: Option<ProcessId>,
    },

    /// Any other event reported by the fault channel.
    Other {
        /// Raw event code.
        code: u32,

        /// Raw event payload.
        payload: Vec<u8>,
    },
}

impl FaultKind {
    /// Short name of this kind, used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Exception { .. } => "exception",
            Self::DebuggerCall { .. } => "debugger call",
            Self::ProcessDeleted => "process deleted",
            Self::HandedOver { .. } => "handed over",
            Self::Other { .. } => "other",
        }
    }
}

/// Returns a human-readable description of an exception code.
///
/// Exception codes are Unix signal numbers.
pub fn describe_exception(code: i32) -> String {
    let name = match code {
        4 => "illegal instruction",
        5 => "trace/breakpoint trap",
        6 => "aborted",
        7 => "bus error",
        8 => "floating point exception",
        11 => "segmentation violation",
        31 => "bad system call",
        _ => return format!("exception {code}"),
    };

    name.to_owned()
}

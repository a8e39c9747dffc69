use std::future::{self, Future};
use std::path::PathBuf;

use crate::event::ProcessId;

/// Trait implementing the interactive decision of a user.
pub trait Prompter: Send + Sync + 'static {
    /// Asks the user what to do with a faulting process.
    fn prompt(&self, request: &PromptRequest) -> impl Future<Output = PromptOutcome> + Send;
}

/// Description of the faulting process shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptRequest {
    /// The faulting process.
    pub process: ProcessId,

    /// Executable of the faulting process.
    pub executable: PathBuf,

    /// Short description of the process (e.g., its command line).
    pub name: String,

    /// Human-readable cause of the fault.
    pub cause: String,
}

/// Choice made by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserChoice {
    /// Kill the process.
    Kill,

    /// Debug the process.
    Debug,

    /// Save a report, then debug the process.
    SaveReportAndDebug,
}

/// Outcome of a prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The user made a choice.
    Chosen(UserChoice),

    /// The prompt was closed without a choice.
    Dismissed,

    /// No prompt could be shown.
    Unavailable,
}

/// Prompter for hosts without any user interface.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn prompt(&self, _request: &PromptRequest) -> impl Future<Output = PromptOutcome> + Send {
        future::ready(PromptOutcome::Unavailable)
    }
}

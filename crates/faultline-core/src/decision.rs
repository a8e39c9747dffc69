use std::collections::HashSet;
use std::path::Path;

use crate::event::FaultKind;
use crate::policy::{Action, PolicyTable};

/// What to do with a faulting process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Terminate the process.
    Kill,

    /// Hand the process over to an external debugger.
    EnterDebugger {
        /// Whether the debugger should save a report first.
        save_report: bool,
    },

    /// Write a core file, then terminate the process.
    WriteCoreFile,

    /// Ask the user.
    PromptUser,
}

impl From<Action> for Decision {
    fn from(action: Action) -> Self {
        match action {
            Action::Kill => Self::Kill,
            Action::Debug => Self::EnterDebugger { save_report: false },
            Action::SaveReport => Self::EnterDebugger { save_report: true },
            Action::WriteCore => Self::WriteCoreFile,
            Action::Prompt => Self::PromptUser,
        }
    }
}

/// Set of executable names which are never killed.
///
/// Killing one of these would take the host down with it, so faults in
/// them always end up in a debugger.
#[derive(Clone, Debug, Default)]
pub struct PrivilegedProcesses(HashSet<String>);

impl PrivilegedProcesses {
    /// Creates a set from executable file names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Returns whether the given executable is privileged.
    pub fn contains(&self, executable: &Path) -> bool {
        executable
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.0.contains(name))
    }
}

/// Decides what to do with a process, given the first event received for it.
///
/// Returns `None` when there is nothing left to decide, because the process
/// is already gone.
pub fn decide(
    kind: &FaultKind,
    executable: &Path,
    policy: &PolicyTable,
    privileged: &PrivilegedProcesses,
) -> Option<Decision> {
    if let FaultKind::ProcessDeleted = kind {
        return None;
    }

    if privileged.contains(executable) {
        return Some(Decision::EnterDebugger { save_report: false });
    }

    Some(policy.lookup(executable).action.into())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Decision, PrivilegedProcesses, decide};
    use crate::event::FaultKind;
    use crate::policy::{Action, Pattern, PolicyTable};

    const SEGV: FaultKind = FaultKind::Exception {
        code: 11,
        address: None,
    };

    fn kill_everything() -> PolicyTable {
        PolicyTable::new(Action::Prompt).rule(Pattern::new("*").expect("pattern"), Action::Kill)
    }

    #[test]
    fn policy_action_is_used() {
        let decision = decide(
            &SEGV,
            Path::new("/usr/bin/crashy"),
            &kill_everything(),
            &PrivilegedProcesses::default(),
        );

        assert_eq!(decision, Some(Decision::Kill));
    }

    #[test]
    fn unmatched_executable_prompts_the_user() {
        let decision = decide(
            &FaultKind::DebuggerCall { message: 0x1000 },
            Path::new("/usr/bin/crashy"),
            &PolicyTable::default(),
            &PrivilegedProcesses::default(),
        );

        assert_eq!(decision, Some(Decision::PromptUser));
    }

    #[test]
    fn privileged_process_always_enters_debugger() {
        let decision = decide(
            &SEGV,
            Path::new("/usr/lib/systemd/systemd"),
            &kill_everything(),
            &PrivilegedProcesses::new(["systemd"]),
        );

        assert_eq!(decision, Some(Decision::EnterDebugger { save_report: false }));
    }

    #[test]
    fn deleted_process_needs_no_decision() {
        let decision = decide(
            &FaultKind::ProcessDeleted,
            Path::new("/usr/bin/crashy"),
            &kill_everything(),
            &PrivilegedProcesses::default(),
        );

        assert_eq!(decision, None);
    }

    #[test]
    fn report_action_saves_report_before_debugging() {
        assert_eq!(
            Decision::from(Action::SaveReport),
            Decision::EnterDebugger { save_report: true }
        );
    }
}

use std::fmt;
use std::path::Path;

use faultline_core::FaultKind;
use faultline_core::decision::{Decision, decide};
use miette::IntoDiagnostic;

use crate::config::parse_config;

/// What the service would do with a faulting executable.
#[derive(Debug, PartialEq, Eq)]
pub struct CheckReport {
    /// The decision made.
    pub decision: Decision,

    /// Whether the executable is privileged.
    pub privileged: bool,

    /// Whether the decision comes from an explicit rule.
    pub explicit: bool,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decision {
            Decision::Kill => write!(f, "kill")?,
            Decision::EnterDebugger { save_report: false } => write!(f, "debug")?,
            Decision::EnterDebugger { save_report: true } => write!(f, "save report, then debug")?,
            Decision::WriteCoreFile => write!(f, "write core file, then kill")?,
            Decision::PromptUser => write!(f, "ask the user")?,
        }

        if self.privileged {
            write!(f, " (privileged executable)")
        } else if self.explicit {
            write!(f, " (matching rule)")
        } else {
            write!(f, " (default action)")
        }
    }
}

/// Runs the subcommand for checking the policy of an executable.
pub fn evaluate_check(config: String, executable: &Path) -> miette::Result<CheckReport> {
    let settings = parse_config(config)?.settings().into_diagnostic()?;

    let kind = FaultKind::Exception {
        code: 11,
        address: None,
    };

    let Some(decision) = decide(&kind, executable, &settings.policy, &settings.privileged) else {
        miette::bail!("no decision for {}", executable.display());
    };

    Ok(CheckReport {
        decision,
        privileged: settings.privileged.contains(executable),
        explicit: settings.policy.lookup(executable).explicit,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use faultline_core::decision::Decision;

    use super::{CheckReport, evaluate_check};

    #[test]
    fn check_inline_config() {
        let report = evaluate_check(
            r#"action "crashy" "core""#.to_owned(),
            Path::new("/usr/bin/crashy"),
        )
        .expect("check");

        assert_eq!(
            report,
            CheckReport {
                decision: Decision::WriteCoreFile,
                privileged: false,
                explicit: true,
            }
        );
        assert_eq!(report.to_string(), "write core file, then kill (matching rule)");

        let report = evaluate_check(String::new(), Path::new("/sbin/init")).expect("check");
        assert_eq!(report.to_string(), "debug (privileged executable)");
    }
}

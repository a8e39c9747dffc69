use std::future::Future;
use std::process::Stdio;

use faultline_core::prompt::{PromptOutcome, PromptRequest, Prompter, UserChoice};

use crate::template::{CommandTemplate, TemplateVars};

/// Prompter asking the user through an external command.
///
/// The command is expected to print `kill`, `debug` or `report` on its
/// standard output.
#[derive(Clone, Debug)]
pub struct CommandPrompter {
    command: CommandTemplate,
}

impl CommandPrompter {
    /// Creates a prompter running the given command.
    pub const fn new(command: CommandTemplate) -> Self {
        Self { command }
    }

    async fn run(&self, request: &PromptRequest) -> PromptOutcome {
        let title = format!("{}: {}", request.name, request.cause);

        let command = self.command.command(&TemplateVars {
            pid: Some(request.process.raw()),
            exe: request.executable.to_str(),
            path: None,
            title: Some(&title),
        });

        let output = match command {
            Ok(mut command) => {
                command
                    .stdin(Stdio::null())
                    .stderr(Stdio::inherit())
                    .kill_on_drop(true)
                    .output()
                    .await
            }
            Err(e) => {
                tracing::warn!(error = %e, "no prompt command");
                return PromptOutcome::Unavailable;
            }
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, command = %self.command, "failed to run prompt");
                return PromptOutcome::Unavailable;
            }
        };

        if !output.status.success() {
            tracing::debug!(status = %output.status, "prompt dismissed");
            return PromptOutcome::Dismissed;
        }

        parse_choice(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Prompter for CommandPrompter {
    fn prompt(&self, request: &PromptRequest) -> impl Future<Output = PromptOutcome> + Send {
        self.run(request)
    }
}

fn parse_choice(answer: &str) -> PromptOutcome {
    match answer.trim() {
        "kill" => PromptOutcome::Chosen(UserChoice::Kill),
        "debug" => PromptOutcome::Chosen(UserChoice::Debug),
        "report" => PromptOutcome::Chosen(UserChoice::SaveReportAndDebug),
        "" => PromptOutcome::Dismissed,
        answer => {
            tracing::warn!(answer, "unexpected prompt answer");
            PromptOutcome::Dismissed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use faultline_core::ProcessId;
    use faultline_core::prompt::{PromptOutcome, PromptRequest, Prompter, UserChoice};
    use test_log::test;

    use super::{CommandPrompter, parse_choice};
    use crate::template::CommandTemplate;

    fn request() -> PromptRequest {
        PromptRequest {
            process: ProcessId(42),
            executable: PathBuf::from("/usr/bin/crashy"),
            name: "crashy --flag".to_owned(),
            cause: "segmentation violation".to_owned(),
        }
    }

    async fn prompt(command: &str) -> PromptOutcome {
        CommandPrompter::new(CommandTemplate::new(command))
            .prompt(&request())
            .await
    }

    #[test]
    fn choices() {
        assert_eq!(
            parse_choice("kill\n"),
            PromptOutcome::Chosen(UserChoice::Kill)
        );
        assert_eq!(
            parse_choice(" debug "),
            PromptOutcome::Chosen(UserChoice::Debug)
        );
        assert_eq!(
            parse_choice("report"),
            PromptOutcome::Chosen(UserChoice::SaveReportAndDebug)
        );
        assert_eq!(parse_choice(""), PromptOutcome::Dismissed);
        assert_eq!(parse_choice("maybe"), PromptOutcome::Dismissed);
    }

    #[test(tokio::test)]
    async fn command_answer_is_used() {
        assert_eq!(
            prompt("echo report").await,
            PromptOutcome::Chosen(UserChoice::SaveReportAndDebug)
        );
    }

    #[test(tokio::test)]
    async fn failing_command_dismisses() {
        assert_eq!(prompt("false").await, PromptOutcome::Dismissed);
        assert_eq!(prompt("true").await, PromptOutcome::Dismissed);
    }

    #[test(tokio::test)]
    async fn missing_command_is_unavailable() {
        assert_eq!(
            prompt("/nonexistent/prompt {pid}").await,
            PromptOutcome::Unavailable
        );
        assert_eq!(prompt("").await, PromptOutcome::Unavailable);
    }
}

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use faultline_core::Settings;
use faultline_core::decision::PrivilegedProcesses;
use faultline_core::policy::{Action, Pattern, PatternError, PolicyTable};
use faultline_linux::{CommandTemplate, DebuggerCommands};
use miette::IntoDiagnostic;

/// Executables faulting in which would take the whole host down.
const DEFAULT_PRIVILEGED: [&str; 4] = ["init", "systemd", "Xorg", "Xwayland"];

const DEFAULT_DEBUGGER: &str = "gdb -p {pid} {exe}";
const DEFAULT_REPORT_DEBUGGER: &str = r#"gdb -batch -ex "thread apply all bt full" -p {pid} {exe}"#;
const DEFAULT_TERMINAL: &str = "xterm -T {title} -e";
const DEFAULT_CORE_DUMPER: &str = r#"gdb -batch -ex "generate-core-file {path}" -p {pid}"#;

/// Configuration of the crash handling service.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct ServiceConfig {
    /// Action taken for executables matching no rule.
    #[knus(child, default = ConfiguredAction::User, unwrap(argument))]
    pub default_action: ConfiguredAction,

    /// Per-executable actions, evaluated in order.
    #[knus(children(name = "action"))]
    pub actions: Vec<ActionRule>,

    /// Executables which are never killed.
    #[knus(child)]
    pub privileged: Option<PrivilegedNames>,

    /// Whether the user may be prompted.
    #[knus(child, default = true, unwrap(argument))]
    pub interactive: bool,

    /// Directory where core files are written.
    #[knus(child, unwrap(argument))]
    pub core_directory: Option<String>,

    /// Command launching an interactive debugger.
    #[knus(child, unwrap(argument))]
    pub debugger: Option<String>,

    /// Command launching a debugger saving a report.
    #[knus(child, unwrap(argument))]
    pub report_debugger: Option<String>,

    /// Command wrapping debuggers in a terminal.
    #[knus(child, unwrap(argument))]
    pub terminal: Option<String>,

    /// Command writing a core file.
    #[knus(child, unwrap(argument))]
    pub core_dumper: Option<String>,

    /// Command asking the user what to do.
    #[knus(child, unwrap(argument))]
    pub prompt: Option<String>,
}

/// Action associated with an executable pattern.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct ActionRule {
    /// Wildcard pattern matching executable names (or paths, when starting
    /// with `/`).
    #[knus(argument)]
    pub pattern: String,

    /// Action to take.
    #[knus(argument)]
    pub action: ConfiguredAction,
}

/// Names of the privileged executables.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct PrivilegedNames {
    /// Executable file names.
    #[knus(arguments)]
    pub names: Vec<String>,
}

/// Action as written in the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, knus::DecodeScalar)]
pub enum ConfiguredAction {
    /// Kill the process.
    Kill,

    /// Hand the process over to a debugger.
    Debug,

    /// Hand the process over to a debugger saving a report.
    Report,

    /// Write a core file, then kill the process.
    Core,

    /// Ask the user.
    User,
}

impl From<ConfiguredAction> for Action {
    fn from(action: ConfiguredAction) -> Self {
        match action {
            ConfiguredAction::Kill => Self::Kill,
            ConfiguredAction::Debug => Self::Debug,
            ConfiguredAction::Report => Self::SaveReport,
            ConfiguredAction::Core => Self::WriteCore,
            ConfiguredAction::User => Self::Prompt,
        }
    }
}

/// Error of an invalid configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Invalid executable pattern.
    #[error("invalid pattern `{0}`: {1}")]
    Pattern(String, #[source] PatternError),
}

impl ServiceConfig {
    /// Builds the settings of the dispatch core.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let policy = self.actions.iter().try_fold(
            PolicyTable::new(self.default_action.into()),
            |policy, rule| {
                Pattern::new(&rule.pattern)
                    .map(|pattern| policy.rule(pattern, rule.action.into()))
                    .map_err(|e| ConfigError::Pattern(rule.pattern.clone(), e))
            },
        )?;

        let privileged = match &self.privileged {
            Some(privileged) => PrivilegedProcesses::new(privileged.names.iter().cloned()),
            None => PrivilegedProcesses::new(DEFAULT_PRIVILEGED),
        };

        let core_directory = self
            .core_directory
            .as_ref()
            .map_or_else(std::env::temp_dir, PathBuf::from);

        Ok(Settings {
            policy,
            privileged,
            interactive: self.interactive,
            core_directory,
        })
    }

    /// Returns the commands used to launch debuggers.
    pub fn debugger_commands(&self) -> DebuggerCommands {
        DebuggerCommands {
            debugger: template(&self.debugger, DEFAULT_DEBUGGER),
            report_debugger: template(&self.report_debugger, DEFAULT_REPORT_DEBUGGER),
            terminal: template(&self.terminal, DEFAULT_TERMINAL),
        }
    }

    /// Returns the command writing core files.
    pub fn core_dumper(&self) -> CommandTemplate {
        template(&self.core_dumper, DEFAULT_CORE_DUMPER)
    }

    /// Returns the command asking the user, if any.
    pub fn prompt(&self) -> Option<CommandTemplate> {
        self.prompt.as_deref().map(CommandTemplate::new)
    }
}

/// Parses the service configuration.
///
/// If it ends with `.kdl`, it is treated as a path to a configuration file.
/// Otherwise it is directly parsed as inline KDL-formatted configuration.
pub fn parse_config(config: String) -> miette::Result<ServiceConfig> {
    let path = Path::new(&config);

    let config = if let Some((filename, "kdl")) = path
        .file_name()
        .and_then(OsStr::to_str)
        .zip(path.extension().and_then(OsStr::to_str))
    {
        let content = std::fs::read_to_string(path).into_diagnostic()?;
        knus::parse(filename, &content)?
    } else {
        knus::parse("<content>", &config)?
    };

    Ok(config)
}

fn template(configured: &Option<String>, default: &str) -> CommandTemplate {
    CommandTemplate::new(configured.as_deref().unwrap_or(default))
}

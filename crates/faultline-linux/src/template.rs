use std::fmt;

use tokio::process::Command;

/// Command line with placeholders, expanded when a command is spawned.
///
/// The template is split on whitespace, except inside double quotes. The
/// following placeholders are then replaced in each argument:
/// - `{pid}`: ID of the target process.
/// - `{exe}`: path of the executable of the target process.
/// - `{path}`: path of an output file.
/// - `{title}`: human readable title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandTemplate {
    args: Vec<String>,
}

/// Values of the placeholders of a [CommandTemplate].
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateVars<'a> {
    /// Value of `{pid}`.
    pub pid: Option<u32>,

    /// Value of `{exe}`.
    pub exe: Option<&'a str>,

    /// Value of `{path}`.
    pub path: Option<&'a str>,

    /// Value of `{title}`.
    pub title: Option<&'a str>,
}

impl CommandTemplate {
    /// Parses a command template.
    pub fn new(template: &str) -> Self {
        Self {
            args: split_args(template),
        }
    }

    /// Returns whether the template has no program.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Expands the template into a list of arguments, the first one being
    /// the program.
    pub fn expand(&self, vars: &TemplateVars<'_>) -> Vec<String> {
        let pid = vars.pid.map(|pid| pid.to_string());

        self.args
            .iter()
            .map(|arg| {
                let mut arg = arg.clone();

                for (name, value) in [
                    ("{pid}", pid.as_deref()),
                    ("{exe}", vars.exe),
                    ("{path}", vars.path),
                    ("{title}", vars.title),
                ] {
                    if let Some(value) = value {
                        arg = arg.replace(name, value);
                    }
                }

                arg
            })
            .collect()
    }

    /// Expands the template into a command ready to be spawned.
    pub fn command(&self, vars: &TemplateVars<'_>) -> crate::Result<Command> {
        to_command(self.expand(vars))
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// Builds a command from a list of arguments, the first one being the program.
pub(crate) fn to_command(args: Vec<String>) -> crate::Result<Command> {
    let mut args = args.into_iter();

    let program = args.next().ok_or(crate::Error::EmptyCommand)?;

    let mut command = Command::new(program);
    command.args(args);

    Ok(command)
}

fn split_args(template: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = None::<String>;
    let mut quoted = false;

    for c in template.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.get_or_insert_with(String::new);
            }
            c if c.is_whitespace() && !quoted => args.extend(current.take()),
            c => current.get_or_insert_with(String::new).push(c),
        }
    }

    args.extend(current);
    args
}

//! Crate implementing the CLI commands.

mod check;
mod cli;
mod config;
mod report;
mod serve;

pub use self::check::{CheckReport, evaluate_check};
pub use self::cli::{CliAction, CliFault, CliOpts};
pub use self::config::{
    ActionRule, ConfigError, ConfiguredAction, PrivilegedNames, ServiceConfig, parse_config,
};
pub use self::report::evaluate_report;
pub use self::serve::{ServicePrompter, evaluate_serve};

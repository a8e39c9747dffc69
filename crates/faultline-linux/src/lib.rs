//! This crate provides the Linux backend of `faultline-core`.
//!
//! It implements the capabilities required by the dispatch core for
//! processes running on the **same host machine**:
//! - [LinuxDebugger] attaches to a process through a pidfd and inspects it
//!   through `/proc`.
//! - [LinuxProcessControl] kills processes and launches debuggers.
//! - [CommandPrompter] asks the user through an external command.
//! - [UnixFaultSource] receives fault messages on a Unix datagram socket,
//!   sent with [report] (e.g., from a crash hook).
//!
//! <div class="warning">
//!
//! *This crate is not meant to be used on its own! It merely implements the
//! interface (traits) provided by `faultline-core`.*
//!
//! </div>

mod control;
mod debugger;
mod error;
mod prompt;
mod source;
mod sys;
mod template;

pub use self::control::{DebuggerCommands, LinuxProcessControl};
pub use self::debugger::{LinuxContext, LinuxDebugger};
pub use self::error::{Error, Result};
pub use self::prompt::CommandPrompter;
pub use self::source::{UnixFaultSource, WireFault, WireKind, report};
pub use self::template::{CommandTemplate, TemplateVars};

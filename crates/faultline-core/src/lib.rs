//! This crate implements the dispatch core of a crash handling service.
//!
//! The service registers itself as the receiver of fault notifications of
//! every process on the host, and decides what to do with each faulting
//! process: kill it, write a core file, or hand it over to an interactive
//! debugger.
//!
//! Three components are provided:
//! - The [Listener](self::listener::Listener), receiving fault events from a
//!   [FaultSource](self::listener::FaultSource).
//! - The [Registry](self::registry::Registry), routing each event to the
//!   handler of its target process (creating it if needed).
//! - The per-process handler, running the decision state machine on its own
//!   task, then removing itself from the registry.
//!
//! # Capabilities
//!
//! The core does not talk to the OS directly. Instead, it relies on a few
//! traits implemented by a platform backend:
//! - [Debugger](self::debugger::Debugger)/[DebugContext](self::debugger::DebugContext)
//!   to attach to and control a target process.
//! - [ProcessControl](self::control::ProcessControl) to terminate processes
//!   and launch debuggers.
//! - [Prompter](self::prompt::Prompter) to ask the user what to do.
//!
//! ```no_run
//! # async fn run<S, D, C, P>(source: S, debugger: D, control: C, prompter: P)
//! # where
//! #     S: faultline_core::listener::FaultSource,
//! #     D: faultline_core::debugger::Debugger,
//! #     C: faultline_core::control::ProcessControl,
//! #     P: faultline_core::prompt::Prompter,
//! # {
//! use faultline_core::Settings;
//! use faultline_core::listener::Listener;
//! use faultline_core::registry::Registry;
//!
//! let registry = Registry::new(debugger, control, prompter, Settings::default());
//!
//! Listener::new(source, registry).run().await.unwrap();
//! # }
//! ```

/// Module containing the process management trait.
pub mod control;

/// Module containing traits for attaching to a process.
pub mod debugger;

/// Module implementing the decision logic.
pub mod decision;

mod error;
mod event;
mod handler;

/// Module implementing the fault listener.
pub mod listener;

mod mailbox;

/// Module implementing the executable policy table.
pub mod policy;

/// Module containing the interactive decision trait.
pub mod prompt;

/// Module implementing the handler registry.
pub mod registry;

mod settings;

pub use self::error::{DispatchError, ListenerError, ReceiveError};
pub use self::event::{FaultEvent, FaultKind, ProcessId, ThreadId, describe_exception};
pub use self::handler::{Outcome, core_file_path};
pub use self::mailbox::{Mailbox, MailboxSender, mailbox};
pub use self::settings::Settings;

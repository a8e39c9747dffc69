use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::control::ProcessControl;
use crate::debugger::Debugger;
use crate::error::DispatchError;
use crate::event::{FaultEvent, ProcessId};
use crate::handler::{Handler, Outcome};
use crate::mailbox::{Mailbox, MailboxSender, mailbox};
use crate::prompt::Prompter;
use crate::settings::Settings;

/// Identity of a live handler.
///
/// Two handlers created for the same process (one after the other) have
/// distinct generations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerTicket {
    /// The process handled.
    pub process: ProcessId,

    /// Generation of the handler.
    pub generation: u64,
}

/// How an event was dispatched.
#[derive(Debug)]
pub enum Dispatched {
    /// The event was queued to an existing handler.
    Queued,

    /// A new handler was spawned for the event.
    Spawned(JoinHandle<Outcome>),
}

/// Registry of per-process handlers.
///
/// This is the single source of truth mapping a process to its handler.
/// Cloning a registry yields a handle to the same registry.
pub struct Registry<D, C, P> {
    shared: Arc<Shared<D, C, P>>,
}

impl<D, C, P> Clone for Registry<D, C, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<D, C, P> {
    handlers: Mutex<HashMap<ProcessId, Entry>>,
    next_generation: AtomicU64,
    debugger: D,
    control: C,
    prompter: P,
    settings: Settings,
}

struct Entry {
    generation: u64,
    mailbox: MailboxSender,
}

impl<D, C, P> Registry<D, C, P>
where
    D: Debugger,
    C: ProcessControl,
    P: Prompter,
{
    /// Creates an empty registry.
    ///
    /// The registry must be created before the first event is dispatched,
    /// and lives as long as the service.
    pub fn new(debugger: D, control: C, prompter: P, settings: Settings) -> Self {
        Self {
            shared: Arc::new(Shared {
                handlers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                debugger,
                control,
                prompter,
                settings,
            }),
        }
    }

    /// Routes an event to the handler of its target process.
    ///
    /// If no handler exists for the process yet, one is created and spawned
    /// on the current tokio runtime. If attaching to the process fails, the
    /// process is terminated and an error is returned.
    pub fn dispatch(&self, mut event: FaultEvent) -> Result<Dispatched, DispatchError<D::Error>> {
        let process = event.process;

        let mut handlers = self.lock();

        if let Some(entry) = handlers.get(&process) {
            match entry.mailbox.push(event) {
                Ok(()) => return Ok(Dispatched::Queued),
                Err(rejected) => {
                    // the handler died without retiring
                    tracing::warn!(pid = %process, generation = entry.generation, "dropping stale handler");
                    event = rejected;
                }
            }

            handlers.remove(&process);
        }

        let context = match self.shared.debugger.attach(process) {
            Ok(context) => context,
            Err(e) => {
                tracing::error!(pid = %process, error = %e, "failed to attach to process");
                self.shared.control.terminate(process);
                return Err(DispatchError::Attach { process, source: e });
            }
        };

        let ticket = HandlerTicket {
            process,
            generation: self.shared.next_generation.fetch_add(1, Ordering::Relaxed),
        };

        let (sender, mailbox) = mailbox();
        sender
            .push(event)
            .map_err(|_| DispatchError::MailboxClosed(process))?;

        handlers.insert(
            process,
            Entry {
                generation: ticket.generation,
                mailbox: sender,
            },
        );

        tracing::debug!(pid = %process, generation = ticket.generation, "handler created");

        let handler = Handler::new(ticket, mailbox, context, self.clone());
        let task = tokio::spawn(
            handler
                .run()
                .instrument(tracing::info_span!("Handler", pid = %process)),
        );

        Ok(Dispatched::Spawned(task))
    }

    /// Removes the handler identified by `ticket`.
    ///
    /// Returns `None` if no such handler is registered, which includes the
    /// case of a newer handler registered for the same process.
    pub fn remove(&self, ticket: &HandlerTicket) -> Option<HandlerTicket> {
        let mut handlers = self.lock();
        Self::remove_locked(&mut handlers, ticket)
    }

    /// Removes a handler and closes its mailbox, atomically with respect to
    /// [dispatch](Self::dispatch).
    pub(crate) fn retire(&self, ticket: &HandlerTicket, mailbox: &mut Mailbox) -> bool {
        let mut handlers = self.lock();
        let removed = Self::remove_locked(&mut handlers, ticket);
        mailbox.close();
        removed.is_some()
    }

    fn remove_locked(
        handlers: &mut HashMap<ProcessId, Entry>,
        ticket: &HandlerTicket,
    ) -> Option<HandlerTicket> {
        match handlers.get(&ticket.process) {
            Some(entry) if entry.generation == ticket.generation => {
                handlers.remove(&ticket.process);
                Some(*ticket)
            }
            _ => None,
        }
    }
}

impl<D, C, P> Registry<D, C, P> {
    /// Returns the ticket of the handler registered for the given process.
    pub fn handler_of(&self, process: ProcessId) -> Option<HandlerTicket> {
        self.lock().get(&process).map(|entry| HandlerTicket {
            process,
            generation: entry.generation,
        })
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub(crate) fn control(&self) -> &C {
        &self.shared.control
    }

    pub(crate) fn prompter(&self) -> &P {
        &self.shared.prompter
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProcessId, Entry>> {
        self.shared
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

mod core_file;

pub use self::core_file::core_file_path;
use crate::control::{HandoverRequest, ProcessControl};
use crate::debugger::{ControlRequest, DebugContext, Debugger};
use crate::decision::{Decision, decide};
use crate::event::{FaultEvent, FaultKind, ThreadId, describe_exception};
use crate::mailbox::Mailbox;
use crate::prompt::{PromptOutcome, PromptRequest, Prompter, UserChoice};
use crate::registry::{HandlerTicket, Registry};

/// Maximum length of a debugger call message.
const MAX_MESSAGE_LEN: usize = 128;

/// Terminal state reached by a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The process was terminated.
    Killed,

    /// The process was handed over to a debugger.
    HandedOver,

    /// The process vanished on its own.
    ProcessGone,
}

/// State of the decision state machine.
#[derive(Debug)]
enum State {
    Init,
    Deciding(FaultEvent),
    Prompting { cause: String },
    WritingCore,
    HandingOver { save_report: bool },
    Killing,
    Terminal(Outcome),
}

impl State {
    const fn label(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Deciding(_) => "deciding",
            Self::Prompting { .. } => "prompting",
            Self::WritingCore => "writing-core",
            Self::HandingOver { .. } => "handing-over",
            Self::Killing => "killing",
            Self::Terminal(_) => "terminal",
        }
    }
}

/// Handler of a single target process.
///
/// It consumes the events of its mailbox, decides what to do with the
/// process, then removes itself from the registry.
pub(crate) struct Handler<D: Debugger, C, P> {
    ticket: HandlerTicket,
    mailbox: Mailbox,
    context: D::Context,
    registry: Registry<D, C, P>,
}

impl<D, C, P> Handler<D, C, P>
where
    D: Debugger,
    C: ProcessControl,
    P: Prompter,
{
    pub(crate) const fn new(
        ticket: HandlerTicket,
        mailbox: Mailbox,
        context: D::Context,
        registry: Registry<D, C, P>,
    ) -> Self {
        Self {
            ticket,
            mailbox,
            context,
            registry,
        }
    }

    /// Runs the handler until a terminal state is reached.
    pub(crate) async fn run(mut self) -> Outcome {
        let mut state = State::Init;

        let outcome = loop {
            tracing::debug!(state = state.label(), "entering state");

            state = match state {
                State::Init => self.init().await,
                State::Deciding(event) => self.deciding(event).await,
                State::Prompting { cause } => self.prompting(cause).await,
                State::WritingCore => self.writing_core().await,
                State::HandingOver { save_report } => self.handing_over(save_report).await,
                State::Killing => self.killing().await,
                State::Terminal(outcome) => break outcome,
            };
        };

        tracing::info!(?outcome, "handler done");

        self.teardown();

        outcome
    }

    async fn init(&mut self) -> State {
        match self.mailbox.pop().await {
            Some(event) => State::Deciding(event),
            None => {
                tracing::error!("failed to pop initial event");
                State::Killing
            }
        }
    }

    async fn deciding(&mut self, event: FaultEvent) -> State {
        let decision = {
            let settings = self.registry.settings();

            decide(
                &event.kind,
                &self.context.process_info().executable,
                &settings.policy,
                &settings.privileged,
            )
        };

        let Some(decision) = decision else {
            tracing::warn!("got a spurious process deleted event");
            return State::Terminal(Outcome::ProcessGone);
        };

        if let Err(e) = self.context.control(ControlRequest::PreventExit).await {
            tracing::warn!(error = %e, "failed to prevent process exit");
        }

        let cause = self.describe(&event);

        tracing::warn!(tid = %event.thread, cause = %cause, "thread entered the debugger");

        self.log_stack_trace(event.thread);

        tracing::info!(?decision, "decision made");

        match decision {
            Decision::Kill => State::Killing,
            Decision::EnterDebugger { save_report } => State::HandingOver { save_report },
            Decision::WriteCoreFile => State::WritingCore,
            Decision::PromptUser => State::Prompting { cause },
        }
    }

    async fn prompting(&mut self, cause: String) -> State {
        if !self.registry.settings().interactive {
            tracing::info!(outcome = "unavailable", "prompting disabled, killing");
            return State::Killing;
        }

        let info = self.context.process_info();

        let request = PromptRequest {
            process: self.ticket.process,
            executable: info.executable.clone(),
            name: info.display_name(),
            cause,
        };

        match self.registry.prompter().prompt(&request).await {
            PromptOutcome::Chosen(choice) => {
                tracing::info!(outcome = "chosen", ?choice, "user made a choice");

                match choice {
                    UserChoice::Kill => State::Killing,
                    UserChoice::Debug => State::HandingOver { save_report: false },
                    UserChoice::SaveReportAndDebug => State::HandingOver { save_report: true },
                }
            }
            PromptOutcome::Dismissed => {
                tracing::info!(outcome = "dismissed", "prompt closed without a choice, killing");
                State::Killing
            }
            PromptOutcome::Unavailable => {
                tracing::info!(outcome = "unavailable", "no prompt available, killing");
                State::Killing
            }
        }
    }

    async fn writing_core(&mut self) -> State {
        let path = match core_file_path(
            &self.registry.settings().core_directory,
            self.context.process_info().executable_name(),
            self.ticket.process,
        ) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(error = %e, "failed to pick a core file path");
                return State::Killing;
            }
        };

        match self
            .context
            .control(ControlRequest::WriteCoreFile(&path))
            .await
        {
            Ok(()) => tracing::info!(path = %path.display(), "core file written"),
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "failed to write core file")
            }
        }

        State::Killing
    }

    async fn handing_over(&mut self, save_report: bool) -> State {
        if let Err(e) = self.context.control(ControlRequest::PrepareHandover).await {
            tracing::error!(error = %e, "failed to prepare debugger handover");
            return State::Killing;
        }

        let executable = self.context.process_info().executable.clone();
        let console = self.registry.settings().privileged.contains(&executable);

        let request = HandoverRequest {
            process: self.ticket.process,
            executable,
            save_report,
            console,
        };

        let debugger = match self.registry.control().launch_debugger(&request).await {
            Ok(debugger) => debugger,
            Err(e) => {
                tracing::error!(error = %e, "failed to start debugger");
                return State::Killing;
            }
        };

        tracing::info!(debugger = %debugger, save_report, console, "debugger started");

        // wait for the "handed over" or "process deleted" event
        loop {
            let Some(event) = self.mailbox.pop().await else {
                tracing::error!("failed to pop event");
                return State::Killing;
            };

            match event.kind {
                FaultKind::HandedOver { .. } => {
                    tracing::info!(debugger = %debugger, "process handed over");
                    return State::Terminal(Outcome::HandedOver);
                }
                FaultKind::ProcessDeleted => {
                    tracing::info!("process died during handover");
                    return State::Terminal(Outcome::ProcessGone);
                }
                kind => {
                    // the debugger takes care of this event
                    tracing::debug!(kind = kind.name(), "ignoring event");

                    if !self.registry.control().is_alive(debugger) {
                        tracing::warn!(debugger = %debugger, "the debugger seems to be gone");
                        return State::Killing;
                    }
                }
            }
        }
    }

    async fn killing(&mut self) -> State {
        match self.context.control(ControlRequest::Terminate).await {
            Ok(()) => {
                let name = self.context.process_info().display_name();
                tracing::info!(name = %name, "process killed");
            }
            Err(e) => tracing::error!(error = %e, "failed to kill process"),
        }

        State::Terminal(Outcome::Killed)
    }

    fn teardown(mut self) {
        if !self.registry.retire(&self.ticket, &mut self.mailbox) {
            tracing::warn!(
                generation = self.ticket.generation,
                "handler was already removed"
            );
        }

        let unconsumed = self.mailbox.drain();
        if !unconsumed.is_empty() {
            tracing::debug!(count = unconsumed.len(), "discarding unconsumed events");
        }
    }

    fn describe(&self, event: &FaultEvent) -> String {
        match &event.kind {
            FaultKind::Exception {
                code,
                address: Some(addr),
            } => format!("{} at {addr:#x}", describe_exception(*code)),
            FaultKind::Exception { code, address: None } => describe_exception(*code),
            FaultKind::DebuggerCall { message } => {
                match self.context.read_string(*message, MAX_MESSAGE_LEN) {
                    Ok(text) => format!("Debugger call: `{text}'"),
                    Err(e) => {
                        format!("Debugger call: {message:#x} (Failed to read message: {e})")
                    }
                }
            }
            kind => kind.name().to_owned(),
        }
    }

    fn log_stack_trace(&self, thread: ThreadId) {
        let trace = match self.context.stack_trace(thread) {
            Ok(trace) => trace,
            Err(e) => {
                tracing::debug!(error = %e, "failed to compute stack trace");
                return;
            }
        };

        tracing::info!(
            pc = format_args!("{:#x}", trace.instr_addr),
            location = trace.location.as_deref().unwrap_or_default(),
            "stack trace"
        );

        for frame in &trace.frames {
            tracing::info!(
                frame = format_args!("{:#x}", frame.frame_addr),
                ret = format_args!("{:#x}", frame.ret_addr),
                location = frame.location.as_deref().unwrap_or_default(),
                "  caller"
            );
        }
    }
}

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use faultline_core::ProcessId;
use faultline_core::control::{HandoverRequest, ProcessControl};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use tokio::process::Child;

use crate::sys::target_pid;
use crate::template::{CommandTemplate, TemplateVars, to_command};

/// Commands used to launch debuggers.
#[derive(Clone, Debug)]
pub struct DebuggerCommands {
    /// Interactive debugger.
    pub debugger: CommandTemplate,

    /// Debugger saving a report of the process.
    pub report_debugger: CommandTemplate,

    /// Terminal wrapping a debugger, unless it runs in the console.
    pub terminal: CommandTemplate,
}

/// Manager of the processes of the local host.
pub struct LinuxProcessControl {
    commands: DebuggerCommands,
    debuggers: Mutex<HashMap<ProcessId, Child>>,
}

impl LinuxProcessControl {
    /// Creates a process manager launching debuggers with the given commands.
    pub fn new(commands: DebuggerCommands) -> Self {
        Self {
            commands,
            debuggers: Mutex::new(HashMap::new()),
        }
    }

    fn spawn_debugger(&self, request: &HandoverRequest) -> crate::Result<ProcessId> {
        let name = request
            .executable
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = format!("{name} ({})", request.process);

        let vars = TemplateVars {
            pid: Some(request.process.raw()),
            exe: request.executable.to_str(),
            path: None,
            title: Some(&title),
        };

        let template = if request.save_report {
            &self.commands.report_debugger
        } else {
            &self.commands.debugger
        };

        let mut args = template.expand(&vars);

        if !request.console {
            let mut wrapped = self.commands.terminal.expand(&vars);
            wrapped.append(&mut args);
            args = wrapped;
        }

        let description = args.join(" ");

        let child = to_command(args)?.spawn()?;

        let debugger = child
            .id()
            .map(ProcessId)
            .ok_or(crate::Error::NoChildId(description))?;

        let mut debuggers = self
            .debuggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // forget about debuggers which already exited
        debuggers.retain(|_, child| matches!(child.try_wait(), Ok(None)));
        debuggers.insert(debugger, child);

        Ok(debugger)
    }
}

impl ProcessControl for LinuxProcessControl {
    type Error = crate::Error;

    fn terminate(&self, process: ProcessId) {
        let pid = match target_pid(process.raw()) {
            Ok(pid) => pid,
            Err(e) => {
                tracing::error!(error = %e, "refusing to kill");
                return;
            }
        };

        match kill(pid, Signal::SIGKILL) {
            Ok(()) => tracing::info!(pid = %process, "process killed"),
            Err(Errno::ESRCH) => tracing::debug!(pid = %process, "process already gone"),
            Err(e) => tracing::error!(error = %e, pid = %process, "failed to kill process"),
        }
    }

    fn launch_debugger(
        &self,
        request: &HandoverRequest,
    ) -> impl Future<Output = crate::Result<ProcessId>> + Send {
        std::future::ready(self.spawn_debugger(request))
    }

    fn is_alive(&self, debugger: ProcessId) -> bool {
        let mut debuggers = self
            .debuggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match debuggers.get_mut(&debugger).map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                tracing::debug!(debugger = %debugger, %status, "debugger exited");
                debuggers.remove(&debugger);
                false
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, debugger = %debugger, "failed to wait for debugger");
                false
            }
            None => target_pid(debugger.raw()).is_ok_and(|pid| kill(pid, None).is_ok()),
        }
    }
}

use std::future::Future;
use std::path::Path;

use faultline_core::debugger::{
    ControlRequest, DebugContext, Debugger, ProcessInfo, StackFrame, StackTrace,
};
use faultline_core::{ProcessId, ThreadId};
use nix::sys::signal::Signal;

use crate::sys::{ProcessHandle, mem, procfs, target_pid};
use crate::template::{CommandTemplate, TemplateVars};

/// Number of stack words scanned for return addresses.
const STACK_SCAN_WORDS: u64 = 1024;

/// Maximum number of frames reported in a stack trace.
const MAX_FRAMES: usize = 16;

/// Debugger attaching to processes of the local host.
#[derive(Clone, Debug)]
pub struct LinuxDebugger {
    core_dumper: CommandTemplate,
}

impl LinuxDebugger {
    /// Creates a debugger writing core files with the given command.
    pub const fn new(core_dumper: CommandTemplate) -> Self {
        Self { core_dumper }
    }
}

impl Debugger for LinuxDebugger {
    type Context = LinuxContext;
    type Error = crate::Error;

    fn attach(&self, process: ProcessId) -> crate::Result<Self::Context> {
        let pid = target_pid(process.raw())?;

        let handle = ProcessHandle::open(pid)?;

        let executable = procfs::executable(pid)?;
        let args = procfs::cmdline(pid)?;

        tracing::debug!(pid = %process, exe = %executable.display(), "attached");

        Ok(LinuxContext {
            handle,
            info: ProcessInfo { executable, args },
            core_dumper: self.core_dumper.clone(),
        })
    }
}

/// Debug context of a process of the local host.
///
/// Dropping the context detaches from the process.
pub struct LinuxContext {
    handle: ProcessHandle,
    info: ProcessInfo,
    core_dumper: CommandTemplate,
}

impl LinuxContext {
    async fn write_core_file(&self, path: &Path) -> crate::Result<()> {
        let pid = self.handle.id();

        let mut command = self.core_dumper.command(&TemplateVars {
            pid: Some(pid.as_raw() as u32),
            exe: self.info.executable.to_str(),
            path: path.to_str(),
            title: None,
        })?;

        let status = command.kill_on_drop(true).status().await?;

        if !status.success() {
            return Err(crate::Error::CommandFailed(
                self.core_dumper.to_string(),
                status,
            ));
        }

        Ok(())
    }
}

impl DebugContext for LinuxContext {
    type Error = crate::Error;

    fn process_info(&self) -> &ProcessInfo {
        &self.info
    }

    fn read_string(&self, addr: u64, max_len: usize) -> crate::Result<String> {
        mem::read_process_string(self.handle.id(), addr, max_len)
    }

    fn stack_trace(&self, thread: ThreadId) -> crate::Result<StackTrace> {
        let pid = self.handle.id();

        let blocked = procfs::blocked_thread(pid, target_pid(thread.raw())?)?;
        let maps = procfs::maps(pid)?;

        let mut frames = Vec::new();

        // without unwind info, look for words pointing into executable code
        for i in 0..STACK_SCAN_WORDS {
            if frames.len() == MAX_FRAMES {
                break;
            }

            let frame_addr = blocked.sp + i * size_of::<u64>() as u64;

            let Ok(word) = mem::read_process_word(pid, frame_addr) else {
                break;
            };

            if maps.iter().any(|m| m.executable && m.contains(word)) {
                frames.push(StackFrame {
                    frame_addr,
                    ret_addr: word,
                    location: procfs::locate(&maps, word),
                });
            }
        }

        Ok(StackTrace {
            instr_addr: blocked.pc,
            location: procfs::locate(&maps, blocked.pc),
            frames,
        })
    }

    fn control(
        &mut self,
        request: ControlRequest<'_>,
    ) -> impl Future<Output = crate::Result<()>> + Send {
        async move {
            match request {
                ControlRequest::PreventExit => self.handle.send_signal(Signal::SIGSTOP),
                ControlRequest::PrepareHandover => {
                    if self.handle.is_alive() {
                        Ok(())
                    } else {
                        Err(crate::Error::ProcessGone(self.handle.id().as_raw() as u32))
                    }
                }
                ControlRequest::WriteCoreFile(path) => self.write_core_file(path).await,
                ControlRequest::Terminate => self.handle.kill(),
            }
        }
    }
}

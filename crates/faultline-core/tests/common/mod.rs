use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use faultline_core::control::{HandoverRequest, ProcessControl};
use faultline_core::debugger::{
    ControlRequest, DebugContext, Debugger, ProcessInfo, StackFrame, StackTrace,
};
use faultline_core::listener::FaultSource;
use faultline_core::prompt::{PromptOutcome, PromptRequest, Prompter};
use faultline_core::{FaultEvent, ProcessId, ReceiveError, ThreadId};

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("no such process: {0}")]
    NoSuchProcess(ProcessId),

    #[error("bad address: {0:#x}")]
    BadAddress(u64),

    #[error("core file write failed")]
    CoreFile,

    #[error("launch failed")]
    Launch,

    #[error("channel broken")]
    Channel,
}

/// Mock debugger, recording attach calls.
#[derive(Clone, Default)]
pub struct MockDebugger {
    pub executables: Arc<Mutex<HashMap<ProcessId, PathBuf>>>,
    pub unattachable: Arc<Mutex<HashSet<ProcessId>>>,
    pub attached: Arc<Mutex<Vec<ProcessId>>>,
    pub requests: Arc<Mutex<Vec<String>>>,
    pub killed: Arc<Mutex<Vec<ProcessId>>>,
    pub fail_core_file: Arc<AtomicBool>,
    pub attach_delay: Option<Duration>,
}

impl MockDebugger {
    pub fn with_executable(self, process: u32, executable: &str) -> Self {
        self.executables
            .lock()
            .unwrap()
            .insert(ProcessId(process), executable.into());
        self
    }

    pub fn attach_count(&self, process: u32) -> usize {
        self.attached
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == ProcessId(process))
            .count()
    }

    /// Processes killed through their debug context.
    pub fn killed(&self) -> Vec<ProcessId> {
        self.killed.lock().unwrap().clone()
    }
}

impl Debugger for MockDebugger {
    type Context = MockContext;
    type Error = MockError;

    fn attach(&self, process: ProcessId) -> Result<Self::Context, Self::Error> {
        if let Some(delay) = self.attach_delay {
            std::thread::sleep(delay);
        }

        self.attached.lock().unwrap().push(process);

        if self.unattachable.lock().unwrap().contains(&process) {
            return Err(MockError::NoSuchProcess(process));
        }

        let executable = self
            .executables
            .lock()
            .unwrap()
            .get(&process)
            .cloned()
            .unwrap_or_else(|| "/usr/bin/crashy".into());

        Ok(MockContext {
            process,
            info: ProcessInfo {
                args: vec![executable.display().to_string(), "--flag".to_owned()],
                executable,
            },
            requests: Arc::clone(&self.requests),
            killed: Arc::clone(&self.killed),
            fail_core_file: self.fail_core_file.load(Ordering::SeqCst),
        })
    }
}

pub struct MockContext {
    process: ProcessId,
    info: ProcessInfo,
    requests: Arc<Mutex<Vec<String>>>,
    killed: Arc<Mutex<Vec<ProcessId>>>,
    fail_core_file: bool,
}

impl DebugContext for MockContext {
    type Error = MockError;

    fn process_info(&self) -> &ProcessInfo {
        &self.info
    }

    fn read_string(&self, addr: u64, _max_len: usize) -> Result<String, Self::Error> {
        if addr == 0x1000 {
            Ok("assertion failed".to_owned())
        } else {
            Err(MockError::BadAddress(addr))
        }
    }

    fn stack_trace(&self, _thread: ThreadId) -> Result<StackTrace, Self::Error> {
        Ok(StackTrace {
            instr_addr: 0x4010,
            location: Some("(crashy + 0x10)".to_owned()),
            frames: vec![StackFrame {
                frame_addr: 0x7ff0,
                ret_addr: 0x4100,
                location: None,
            }],
        })
    }

    fn control(
        &mut self,
        request: ControlRequest<'_>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let res = match request {
            ControlRequest::PreventExit => {
                self.requests.lock().unwrap().push("prevent-exit".to_owned());
                Ok(())
            }
            ControlRequest::PrepareHandover => {
                self.requests.lock().unwrap().push("prepare-handover".to_owned());
                Ok(())
            }
            ControlRequest::WriteCoreFile(path) => {
                self.requests
                    .lock()
                    .unwrap()
                    .push(format!("core {}", path.display()));

                if self.fail_core_file {
                    Err(MockError::CoreFile)
                } else {
                    Ok(())
                }
            }
            ControlRequest::Terminate => {
                self.killed.lock().unwrap().push(self.process);
                Ok(())
            }
        };

        std::future::ready(res)
    }
}

/// Mock process control, recording terminations by ID and handovers.
#[derive(Clone)]
pub struct MockControl {
    pub terminated: Arc<Mutex<Vec<ProcessId>>>,
    pub handovers: Arc<Mutex<Vec<HandoverRequest>>>,
    pub launch_fails: bool,
    pub debugger_alive: Arc<AtomicBool>,
    pub alive_checks: Arc<AtomicUsize>,
}

impl Default for MockControl {
    fn default() -> Self {
        Self {
            terminated: Arc::default(),
            handovers: Arc::default(),
            launch_fails: false,
            debugger_alive: Arc::new(AtomicBool::new(true)),
            alive_checks: Arc::default(),
        }
    }
}

impl MockControl {
    pub fn terminated(&self) -> Vec<ProcessId> {
        self.terminated.lock().unwrap().clone()
    }

    pub fn handovers(&self) -> Vec<HandoverRequest> {
        self.handovers.lock().unwrap().clone()
    }
}

impl ProcessControl for MockControl {
    type Error = MockError;

    fn terminate(&self, process: ProcessId) {
        self.terminated.lock().unwrap().push(process);
    }

    fn launch_debugger(
        &self,
        request: &HandoverRequest,
    ) -> impl Future<Output = Result<ProcessId, Self::Error>> + Send {
        self.handovers.lock().unwrap().push(request.clone());

        std::future::ready(if self.launch_fails {
            Err(MockError::Launch)
        } else {
            Ok(ProcessId(9999))
        })
    }

    fn is_alive(&self, _debugger: ProcessId) -> bool {
        self.alive_checks.fetch_add(1, Ordering::SeqCst);
        self.debugger_alive.load(Ordering::SeqCst)
    }
}

/// Mock prompter, always answering the same way.
#[derive(Clone)]
pub struct MockPrompter {
    pub outcome: PromptOutcome,
    pub prompts: Arc<Mutex<Vec<PromptRequest>>>,
}

impl MockPrompter {
    pub fn new(outcome: PromptOutcome) -> Self {
        Self {
            outcome,
            prompts: Arc::default(),
        }
    }
}

impl Prompter for MockPrompter {
    fn prompt(&self, request: &PromptRequest) -> impl Future<Output = PromptOutcome> + Send {
        self.prompts.lock().unwrap().push(request.clone());
        std::future::ready(self.outcome)
    }
}

/// Fault source replaying a fixed script, then waiting forever.
pub struct ScriptedSource {
    pub script: VecDeque<Result<FaultEvent, ReceiveError<MockError>>>,
}

impl FaultSource for ScriptedSource {
    type Error = MockError;

    async fn receive(&mut self) -> Result<FaultEvent, ReceiveError<Self::Error>> {
        match self.script.pop_front() {
            Some(res) => res,
            None => std::future::pending().await,
        }
    }
}

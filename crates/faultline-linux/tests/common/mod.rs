use std::path::Path;
use std::time::Duration;

use faultline_core::Settings;
use faultline_core::listener::Listener;
use faultline_core::prompt::NoPrompt;
use faultline_core::registry::Registry;
use faultline_linux::{
    CommandTemplate, DebuggerCommands, LinuxDebugger, LinuxProcessControl, UnixFaultSource,
};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns a process which does nothing for a while.
pub fn spawn_sleeper() -> (Child, u32) {
    let child = Command::new("sleep")
        .arg("30")
        .kill_on_drop(true)
        .spawn()
        .expect("spawn sleep");

    let pid = child.id().expect("sleep pid");

    (child, pid)
}

/// Running service, stopped on drop.
pub struct Service {
    pub task: JoinHandle<Result<(), faultline_core::ListenerError<faultline_linux::Error>>>,
    pub shutdown: CancellationToken,
}

impl Service {
    /// Starts a service listening on the given socket.
    pub fn start(socket: &Path, core_dumper: &str, settings: Settings) -> Self {
        let source = UnixFaultSource::bind(socket).expect("bind");

        let registry = Registry::new(
            LinuxDebugger::new(CommandTemplate::new(core_dumper)),
            LinuxProcessControl::new(DebuggerCommands {
                debugger: CommandTemplate::new("true"),
                report_debugger: CommandTemplate::new("true"),
                terminal: CommandTemplate::new(""),
            }),
            NoPrompt,
            settings,
        );

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(
            Listener::new(source, registry)
                .with_shutdown(shutdown.clone())
                .run(),
        );

        Self { task, shutdown }
    }

    /// Stops the service.
    pub async fn stop(self) {
        self.shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("service did not stop")
            .expect("join")
            .expect("listener");
    }
}

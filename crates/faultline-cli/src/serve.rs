use std::path::PathBuf;

use faultline_core::listener::Listener;
use faultline_core::prompt::{NoPrompt, PromptOutcome, PromptRequest, Prompter};
use faultline_core::registry::Registry;
use faultline_linux::{CommandPrompter, LinuxDebugger, LinuxProcessControl, UnixFaultSource};
use miette::IntoDiagnostic;
use tokio_util::sync::CancellationToken;

use crate::config::parse_config;

/// Prompter selected by the configuration.
pub enum ServicePrompter {
    /// Ask through the configured command.
    Command(CommandPrompter),

    /// No way to ask the user.
    Disabled(NoPrompt),
}

impl Prompter for ServicePrompter {
    async fn prompt(&self, request: &PromptRequest) -> PromptOutcome {
        match self {
            Self::Command(prompter) => prompter.prompt(request).await,
            Self::Disabled(prompter) => prompter.prompt(request).await,
        }
    }
}

/// Runs the subcommand for serving fault reports.
///
/// Returns once interrupted (`Ctrl-C`), or with an error if the fault
/// socket breaks.
pub fn evaluate_serve(config: String, socket: PathBuf) -> miette::Result<()> {
    let config = parse_config(config)?;
    let settings = config.settings().into_diagnostic()?;

    let prompter = match config.prompt() {
        Some(command) => ServicePrompter::Command(CommandPrompter::new(command)),
        None => ServicePrompter::Disabled(NoPrompt),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    runtime.block_on(async move {
        let source = UnixFaultSource::bind(socket).into_diagnostic()?;

        let registry = Registry::new(
            LinuxDebugger::new(config.core_dumper()),
            LinuxProcessControl::new(config.debugger_commands()),
            prompter,
            settings,
        );

        let shutdown = CancellationToken::new();
        tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

        Listener::new(source, registry)
            .with_shutdown(shutdown)
            .run()
            .await
            .into_diagnostic()
    })
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("interrupted");
            shutdown.cancel();
        }
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl-C"),
    }
}

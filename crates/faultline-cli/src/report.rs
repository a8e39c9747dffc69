use std::path::Path;

use faultline_core::{FaultEvent, FaultKind, ProcessId, ThreadId};
use miette::IntoDiagnostic;

use crate::cli::CliFault;

/// Runs the subcommand for reporting a fault to the service.
pub fn evaluate_report(
    socket: &Path,
    pid: u32,
    tid: Option<u32>,
    fault: CliFault,
    address: Option<u64>,
) -> miette::Result<()> {
    let event = FaultEvent::new(
        ProcessId(pid),
        ThreadId(tid.unwrap_or(pid)),
        fault_kind(fault, address)?,
    );

    tracing::debug!(?event, socket = %socket.display(), "reporting fault");

    faultline_linux::report(socket, event).into_diagnostic()
}

fn fault_kind(fault: CliFault, address: Option<u64>) -> miette::Result<FaultKind> {
    let kind = match fault {
        CliFault {
            signal: Some(code), ..
        } => FaultKind::Exception { code, address },
        CliFault {
            debugger_call: Some(message),
            ..
        } => FaultKind::DebuggerCall { message },
        CliFault { deleted: true, .. } => FaultKind::ProcessDeleted,
        CliFault {
            handed_over: true, ..
        } => FaultKind::HandedOver { debugger: None },
        _ => miette::bail!("no fault given"),
    };

    Ok(kind)
}

#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use std::io::Write;

use faultline_cli::{CliAction, CliOpts};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("FAULTLINE_LOG")
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let res = match cli.action {
        CliAction::Serve { config, socket } => faultline_cli::evaluate_serve(config, socket),
        CliAction::Report {
            socket,
            pid,
            tid,
            fault,
            address,
        } => faultline_cli::evaluate_report(&socket, pid, tid, fault, address),
        CliAction::Check { config, executable } => {
            faultline_cli::evaluate_check(config, &executable).and_then(|report| {
                writeln!(std::io::stdout(), "{}: {report}", executable.display()).into_diagnostic()
            })
        }
    };

    if let Err(e) = res {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}

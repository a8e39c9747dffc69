use std::path::PathBuf;

/// The Faultline crash handling service.
#[derive(clap::Parser)]
pub struct CliOpts {
    /// The command to run.
    #[clap(subcommand)]
    pub action: CliAction,
}

/// The command to run.
#[derive(clap::Subcommand)]
pub enum CliAction {
    /// Command to run the service, handling every reported fault.
    Serve {
        /// Service configuration (KDL format).
        ///
        /// If it ends with `.kdl`, it is treated as a path to a configuration
        /// file. Otherwise it is directly parsed as inline KDL-formatted
        /// configuration.
        #[clap(short, long, value_name = "CONTENT/PATH", default_value = "")]
        config: String,

        /// Path of the socket receiving fault reports.
        #[clap(short, long, value_name = "PATH")]
        socket: PathBuf,
    },

    /// Command to report a fault to a running service.
    Report {
        /// Path of the socket of the service.
        #[clap(short, long, value_name = "PATH")]
        socket: PathBuf,

        /// ID of the faulting process.
        #[clap(short, long)]
        pid: u32,

        /// ID of the faulting thread (defaults to the process ID).
        #[clap(short, long)]
        tid: Option<u32>,

        /// The fault to report.
        #[clap(flatten)]
        fault: CliFault,

        /// Faulting address, along with `--signal`.
        #[clap(long, value_name = "ADDR", value_parser = parse_address, requires = "signal")]
        address: Option<u64>,
    },

    /// Command to show what the service would do with a faulting executable.
    Check {
        /// Service configuration (KDL format).
        ///
        /// Same format as for the `serve` command.
        #[clap(short, long, value_name = "CONTENT/PATH", default_value = "")]
        config: String,

        /// Path of the executable.
        executable: PathBuf,
    },
}

/// Fault to report (exactly one must be given).
#[derive(clap::Args)]
#[group(required = true, multiple = false)]
pub struct CliFault {
    /// The process received this fatal signal.
    #[clap(long, value_name = "SIGNAL")]
    pub signal: Option<i32>,

    /// The process called the debugger with the message at this address.
    #[clap(long, value_name = "ADDR", value_parser = parse_address)]
    pub debugger_call: Option<u64>,

    /// The process is gone.
    #[clap(long)]
    pub deleted: bool,

    /// The process was taken over by a debugger.
    #[clap(long)]
    pub handed_over: bool,
}

impl CliOpts {
    /// Parses the CLI from the command-line.
    ///
    /// # Warning
    ///
    /// Exits on error.
    pub fn parse_from_cmdline() -> Self {
        <Self as clap::Parser>::parse()
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal address.
fn parse_address(s: &str) -> Result<u64, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{CliAction, CliOpts};

    #[test]
    fn report_signal() {
        let cli = CliOpts::try_parse_from([
            "faultline", "report", "-s", "/tmp/f.sock", "-p", "42", "--signal", "11", "--address",
            "0xdead",
        ])
        .expect("valid command line");

        match cli.action {
            CliAction::Report {
                pid,
                tid,
                fault,
                address,
                ..
            } => {
                assert_eq!(pid, 42);
                assert_eq!(tid, None);
                assert_eq!(fault.signal, Some(11));
                assert_eq!(address, Some(0xdead));
            }
            _ => unreachable!("not a report"),
        }
    }

    #[test]
    fn report_needs_exactly_one_fault() {
        let base = ["faultline", "report", "-s", "/tmp/f.sock", "-p", "42"];

        assert!(CliOpts::try_parse_from(base).is_err());
        assert!(CliOpts::try_parse_from(base.iter().chain(&["--deleted", "--handed-over"])).is_err());
        assert!(CliOpts::try_parse_from(base.iter().chain(&["--deleted", "--address", "1"])).is_err());
        assert!(CliOpts::try_parse_from(base.iter().chain(&["--debugger-call", "4096"])).is_ok());
    }
}

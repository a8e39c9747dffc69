use std::path::PathBuf;
use std::process::ExitStatus;

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// File open/read error.
    #[error("{0}: {1}")]
    File(PathBuf, std::io::Error),

    /// Error from the OS.
    #[cfg(target_os = "linux")]
    #[error("os error: {0}")]
    Os(#[from] nix::Error),

    /// Partial remote memory read.
    #[error("memory read {0} bytes instead of {1}")]
    PartialMemOp(usize, usize),

    /// A file from `/proc` could not be parsed.
    #[error("{0}: unexpected content")]
    BadProcFile(PathBuf),

    /// The process ID does not designate a single process.
    #[error("invalid process ID: {0}")]
    InvalidProcessId(u32),

    /// The target process is not alive anymore.
    #[error("process {0} is gone")]
    ProcessGone(u32),

    /// A command template expanded to nothing.
    #[error("empty command template")]
    EmptyCommand,

    /// A spawned command did not succeed.
    #[error("`{0}` exited with {1}")]
    CommandFailed(String, ExitStatus),

    /// A spawned command did not report its process ID.
    #[error("`{0}` has no process ID")]
    NoChildId(String),

    /// Fault message decoding error.
    #[error(transparent)]
    Decode(#[from] bincode::error::DecodeError),

    /// Fault message encoding error.
    #[error(transparent)]
    Encode(#[from] bincode::error::EncodeError),
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;

use std::fs::Permissions;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};

use faultline_core::listener::FaultSource;
use faultline_core::{FaultEvent, FaultKind, ProcessId, ReceiveError, ThreadId};
use tokio::net::UnixDatagram;

use crate::sys::target_pid;

/// Maximum size of a fault message.
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Access mode of the fault socket: only its owner may report faults.
const SOCKET_MODE: u32 = 0o600;

/// Fault message, as sent over the fault socket.
#[derive(bincode::Encode, bincode::Decode, Clone, Debug, PartialEq, Eq)]
pub struct WireFault {
    /// ID of the faulting process.
    pub pid: u32,

    /// ID of the faulting thread.
    pub tid: u32,

    /// What happened.
    pub kind: WireKind,
}

/// Kind of a [WireFault].
#[derive(bincode::Encode, bincode::Decode, Clone, Debug, PartialEq, Eq)]
pub enum WireKind {
    /// Fatal signal.
    Exception {
        /// Signal number.
        signal: i32,

        /// Faulting address.
        address: Option<u64>,
    },

    /// Explicit debugger call.
    DebuggerCall {
        /// Address of the message in the process memory.
        message: u64,
    },

    /// The process is gone.
    ProcessDeleted,

    /// The process was taken over by a debugger.
    HandedOver {
        /// ID of the debugger process.
        debugger: Option<u32>,
    },

    /// Any other event.
    Other {
        /// Raw event code.
        code: u32,

        /// Raw event payload.
        payload: Vec<u8>,
    },
}

impl TryFrom<WireFault> for FaultEvent {
    type Error = crate::Error;

    /// Fails if the message names no single process or thread.
    fn try_from(wire: WireFault) -> crate::Result<Self> {
        target_pid(wire.pid)?;
        target_pid(wire.tid)?;

        let kind = match wire.kind {
            WireKind::Exception { signal, address } => FaultKind::Exception {
                code: signal,
                address,
            },
            WireKind::DebuggerCall { message } => FaultKind::DebuggerCall { message },
            WireKind::ProcessDeleted => FaultKind::ProcessDeleted,
            WireKind::HandedOver { debugger } => FaultKind::HandedOver {
                debugger: debugger.map(ProcessId),
            },
            WireKind::Other { code, payload } => FaultKind::Other { code, payload },
        };

        Ok(Self::new(ProcessId(wire.pid), ThreadId(wire.tid), kind))
    }
}

impl From<FaultEvent> for WireFault {
    fn from(event: FaultEvent) -> Self {
        let kind = match event.kind {
            FaultKind::Exception { code, address } => WireKind::Exception {
                signal: code,
                address,
            },
            FaultKind::DebuggerCall { message } => WireKind::DebuggerCall { message },
            FaultKind::ProcessDeleted => WireKind::ProcessDeleted,
            FaultKind::HandedOver { debugger } => WireKind::HandedOver {
                debugger: debugger.map(ProcessId::raw),
            },
            FaultKind::Other { code, payload } => WireKind::Other { code, payload },
        };

        Self {
            pid: event.process.raw(),
            tid: event.thread.raw(),
            kind,
        }
    }
}

/// Source of fault events, received on a Unix datagram socket.
///
/// The socket file is removed when the source is dropped.
pub struct UnixFaultSource {
    socket: UnixDatagram,
    path: PathBuf,
    buf: Vec<u8>,
}

impl UnixFaultSource {
    /// Binds the fault socket at the given path.
    ///
    /// A stale socket left at that path is replaced. Only the owner of the
    /// service (usually root) may send to the new socket.
    pub fn bind(path: impl Into<PathBuf>) -> crate::Result<Self> {
        let path = path.into();

        if std::fs::symlink_metadata(&path).is_ok_and(|meta| meta.file_type().is_socket()) {
            tracing::debug!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| crate::Error::File(path.clone(), e))?;
        }

        let socket = UnixDatagram::bind(&path).map_err(|e| crate::Error::File(path.clone(), e))?;

        if let Err(e) = std::fs::set_permissions(&path, Permissions::from_mode(SOCKET_MODE)) {
            let _ = std::fs::remove_file(&path);
            return Err(crate::Error::File(path, e));
        }

        tracing::info!(path = %path.display(), "listening for faults");

        Ok(Self {
            socket,
            path,
            buf: vec![0; MAX_MESSAGE_SIZE],
        })
    }

    /// Returns the path of the fault socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FaultSource for UnixFaultSource {
    type Error = crate::Error;

    async fn receive(&mut self) -> Result<FaultEvent, ReceiveError<Self::Error>> {
        let len = match self.socket.recv(&mut self.buf).await {
            Ok(len) => len,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                return Err(ReceiveError::Interrupted);
            }
            Err(e) => return Err(ReceiveError::Fatal(e.into())),
        };

        let (wire, _) = bincode::decode_from_slice::<WireFault, _>(
            &self.buf[..len],
            bincode::config::standard(),
        )
        .map_err(|e| ReceiveError::Malformed(e.into()))?;

        wire.try_into().map_err(ReceiveError::Malformed)
    }
}

impl Drop for UnixFaultSource {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(error = %e, path = %self.path.display(), "failed to remove socket");
        }
    }
}

/// Sends a fault event to the service listening on the given socket.
pub fn report(socket: &Path, event: FaultEvent) -> crate::Result<()> {
    let message = bincode::encode_to_vec(WireFault::from(event), bincode::config::standard())?;

    let client = std::os::unix::net::UnixDatagram::unbound()?;
    client
        .send_to(&message, socket)
        .map_err(|e| crate::Error::File(socket.to_owned(), e))?;

    Ok(())
}

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

/// Converts a process (or thread) ID into a [Pid] designating a single
/// process.
///
/// Zero and negative values are rejected, since signaling them targets
/// whole process groups.
pub fn target_pid(raw: u32) -> crate::Result<Pid> {
    i32::try_from(raw)
        .ok()
        .filter(|pid| *pid > 0)
        .map(Pid::from_raw)
        .ok_or(crate::Error::InvalidProcessId(raw))
}

/// Stable handle to a target process.
///
/// The handle keeps referring to the same process even if its ID gets
/// recycled, and closes on drop.
pub struct ProcessHandle {
    pidfd: OwnedFd,
    pid: Pid,
}

impl ProcessHandle {
    /// Opens a handle to the process with the given ID.
    pub fn open(pid: Pid) -> crate::Result<Self> {
        let fd = unsafe {
            Errno::result(libc::syscall(libc::SYS_pidfd_open, pid.as_raw(), 0))
                .inspect_err(|e| tracing::debug!(error = %e, pid = pid.as_raw(), "pidfd_open"))?
        };

        // SAFETY: `pidfd_open` returned a fresh file descriptor
        let pidfd = unsafe { OwnedFd::from_raw_fd(fd as i32) };

        Ok(Self { pidfd, pid })
    }

    /// Returns the process ID of the process associated with this handle.
    pub const fn id(&self) -> Pid {
        self.pid
    }

    /// Sends a signal to the process.
    pub fn send_signal(&self, signal: Signal) -> crate::Result<()> {
        self.raw_send_signal(signal as libc::c_int)
            .inspect_err(|e| {
                tracing::error!(error = %e, pidfd = self.pidfd.as_raw_fd(), "pidfd_send_signal")
            })?;

        Ok(())
    }

    /// Kills the process.
    ///
    /// Killing a process which already exited is not an error.
    pub fn kill(&self) -> crate::Result<()> {
        match self.raw_send_signal(Signal::SIGKILL as libc::c_int) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => {
                tracing::debug!(pid = self.pid.as_raw(), "process already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns whether the process is still running.
    pub fn is_alive(&self) -> bool {
        match self.raw_send_signal(0) {
            Ok(()) => true,
            Err(Errno::ESRCH) => false,
            Err(e) => {
                tracing::warn!(error = %e, pid = self.pid.as_raw(), "failed to probe process");
                false
            }
        }
    }

    fn raw_send_signal(&self, signal: libc::c_int) -> Result<(), Errno> {
        unsafe {
            Errno::result(libc::syscall(
                libc::SYS_pidfd_send_signal,
                self.pidfd.as_raw_fd(),
                signal,
                std::ptr::null::<libc::siginfo_t>(),
                0 as libc::c_uint,
            ))
        }
        .map(|_| ())
    }
}

use nix::errno::Errno;
use nix::libc::{iovec, process_vm_readv};
use nix::unistd::Pid;

/// Reads a NUL-terminated string from memory of the process with the given
/// ID, reading at most `max_len` bytes.
///
/// Invalid UTF-8 sequences are replaced. A string without terminator is
/// truncated to `max_len` bytes.
pub fn read_process_string(pid: Pid, addr: u64, max_len: usize) -> crate::Result<String> {
    let mut buf = vec![0; max_len];

    let len = read_process_bytes(pid, addr, &mut buf)?;
    buf.truncate(len);

    if let Some(nul) = buf.iter().position(|c| *c == 0) {
        buf.truncate(nul);
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Reads memory from the process with the given ID.
pub fn read_process_memory(pid: Pid, addr: u64, buf: &mut [u8]) -> crate::Result<()> {
    let len = read_process_bytes(pid, addr, buf)?;

    if len != buf.len() {
        Err(crate::Error::PartialMemOp(len, buf.len()))
    } else {
        Ok(())
    }
}

/// Reads a native-endian pointer-sized word from the process with the given ID.
pub fn read_process_word(pid: Pid, addr: u64) -> crate::Result<u64> {
    let mut buf = [0; size_of::<u64>()];
    read_process_memory(pid, addr, &mut buf)?;
    Ok(u64::from_ne_bytes(buf))
}

/// Reads memory, stopping at the first unreadable page.
///
/// Returns the number of bytes read.
fn read_process_bytes(pid: Pid, addr: u64, buf: &mut [u8]) -> crate::Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }

    let local_iov = iovec {
        iov_base: buf.as_mut_ptr().cast(),
        iov_len: buf.len(),
    };

    let remote_iov = iovec {
        iov_base: addr as *mut _,
        iov_len: buf.len(),
    };

    let len = unsafe {
        Errno::result(process_vm_readv(
            pid.as_raw(),
            &local_iov as *const _,
            1,
            &remote_iov as *const _,
            1,
            0,
        ))
        .inspect_err(
            |e| tracing::debug!(error = %e, addr = format_args!("{addr:#x}"), "process_vm_readv"),
        )?
    };

    Ok(len as usize)
}

//! Parsers for the `/proc` files describing a process.

use std::path::{Path, PathBuf};

use nix::unistd::Pid;

/// Suffix appended by the kernel to the link of a deleted executable.
const DELETED_SUFFIX: &str = " (deleted)";

/// Memory mapping of a process, as listed in `/proc/<pid>/maps`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mapping {
    pub start: u64,
    pub end: u64,
    pub executable: bool,
    pub offset: u64,
    pub path: Option<String>,
}

impl Mapping {
    /// Returns whether the mapping contains the given address.
    pub const fn contains(&self, addr: u64) -> bool {
        self.start <= addr && addr < self.end
    }

    /// Returns the name of the mapped file, if any.
    pub fn name(&self) -> Option<&str> {
        let path = self.path.as_deref()?;
        Some(path.rsplit('/').next().unwrap_or(path))
    }
}

/// Registers of a thread, as listed in `/proc/<pid>/task/<tid>/syscall`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockedThread {
    pub sp: u64,
    pub pc: u64,
}

/// Returns the path of the executable of the process.
pub fn executable(pid: Pid) -> crate::Result<PathBuf> {
    let path = proc_path(pid, "exe");

    let exe = std::fs::read_link(&path).map_err(|e| crate::Error::File(path, e))?;

    Ok(match exe.to_str().and_then(|s| s.strip_suffix(DELETED_SUFFIX)) {
        Some(stripped) => stripped.into(),
        None => exe,
    })
}

/// Returns the command line arguments of the process.
pub fn cmdline(pid: Pid) -> crate::Result<Vec<String>> {
    let path = proc_path(pid, "cmdline");

    std::fs::read(&path)
        .map(|raw| parse_cmdline(&raw))
        .map_err(|e| crate::Error::File(path, e))
}

/// Returns the memory mappings of the process.
pub fn maps(pid: Pid) -> crate::Result<Vec<Mapping>> {
    let path = proc_path(pid, "maps");

    let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::File(path.clone(), e))?;

    parse_maps(&content).ok_or(crate::Error::BadProcFile(path))
}

/// Returns the stack and instruction pointers of a blocked thread.
pub fn blocked_thread(pid: Pid, tid: Pid) -> crate::Result<BlockedThread> {
    let path = proc_path(pid, &format!("task/{tid}/syscall"));

    let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::File(path.clone(), e))?;

    parse_syscall(&content).ok_or(crate::Error::BadProcFile(path))
}

fn proc_path(pid: Pid, entry: &str) -> PathBuf {
    Path::new("/proc").join(pid.to_string()).join(entry)
}

/// Parses the NUL-separated argument list of `/proc/<pid>/cmdline`.
pub fn parse_cmdline(raw: &[u8]) -> Vec<String> {
    raw.split(|c| *c == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

/// Parses the content of `/proc/<pid>/maps`.
pub fn parse_maps(content: &str) -> Option<Vec<Mapping>> {
    content.lines().map(parse_mapping).collect()
}

fn parse_mapping(line: &str) -> Option<Mapping> {
    let mut fields = line.split_ascii_whitespace();

    let (start, end) = fields.next()?.split_once('-')?;
    let perms = fields.next()?;
    let offset = fields.next()?;
    let _dev = fields.next()?;
    let _inode = fields.next()?;

    // the path may contain spaces
    let path = fields.collect::<Vec<_>>().join(" ");

    Some(Mapping {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        executable: perms.as_bytes().get(2) == Some(&b'x'),
        offset: u64::from_str_radix(offset, 16).ok()?,
        path: (!path.is_empty()).then_some(path),
    })
}

/// Parses the content of `/proc/<pid>/task/<tid>/syscall`.
///
/// The last two fields are the stack and instruction pointers, unless the
/// thread is running.
pub fn parse_syscall(content: &str) -> Option<BlockedThread> {
    let fields = content.split_ascii_whitespace().collect::<Vec<_>>();

    let &[.., sp, pc] = fields.as_slice() else {
        return None;
    };

    if fields.len() < 3 {
        return None;
    }

    let parse = |field: &str| u64::from_str_radix(field.strip_prefix("0x")?, 16).ok();

    Some(BlockedThread {
        sp: parse(sp)?,
        pc: parse(pc)?,
    })
}

/// Formats the location of an address, relative to the file it belongs to.
pub fn locate(maps: &[Mapping], addr: u64) -> Option<String> {
    let mapping = maps.iter().find(|m| m.contains(addr))?;
    let name = mapping.name()?;

    Some(format!(
        "({name} + {:#x})",
        addr - mapping.start + mapping.offset
    ))
}

use std::io;
use std::path::{Path, PathBuf};

use crate::event::ProcessId;

const MAX_CORE_FILE_INDEX: u32 = 1000;

/// Picks a path for the core file of a process, which does not exist yet.
///
/// Candidates are `core-<name>-<pid>`, then `core-<name>-<pid>-1`, and so on.
pub fn core_file_path(
    directory: &Path,
    executable_name: &str,
    process: ProcessId,
) -> io::Result<PathBuf> {
    let name = if executable_name.is_empty() {
        "unknown"
    } else {
        executable_name
    };

    let base_name = format!("core-{name}-{process}");

    for index in 0..=MAX_CORE_FILE_INDEX {
        let path = if index == 0 {
            directory.join(&base_name)
        } else {
            directory.join(format!("{base_name}-{index}"))
        };

        match std::fs::symlink_metadata(&path) {
            Ok(_) => continue,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(path),
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no usable core file path for process {process}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::core_file_path;
    use crate::event::ProcessId;

    #[test]
    fn first_free_index_is_picked() {
        let dir = tempfile::tempdir().expect("tempdir");

        let path = core_file_path(dir.path(), "crashy", ProcessId(42)).expect("path");
        assert_eq!(path, dir.path().join("core-crashy-42"));

        std::fs::write(&path, b"").expect("write");
        std::fs::write(dir.path().join("core-crashy-42-1"), b"").expect("write");

        let path = core_file_path(dir.path(), "crashy", ProcessId(42)).expect("path");
        assert_eq!(path, dir.path().join("core-crashy-42-2"));
    }

    #[test]
    fn missing_executable_name_is_replaced() {
        let dir = tempfile::tempdir().expect("tempdir");

        let path = core_file_path(dir.path(), "", ProcessId(7)).expect("path");
        assert_eq!(path, dir.path().join("core-unknown-7"));
    }
}

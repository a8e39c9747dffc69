use std::path::PathBuf;

use crate::decision::PrivilegedProcesses;
use crate::policy::PolicyTable;

/// Settings shared by every handler.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Per-executable policy.
    pub policy: PolicyTable,

    /// Executables which are never killed.
    pub privileged: PrivilegedProcesses,

    /// Whether the user may be prompted.
    pub interactive: bool,

    /// Directory where core files are written.
    pub core_directory: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            policy: PolicyTable::default(),
            privileged: PrivilegedProcesses::default(),
            interactive: true,
            core_directory: std::env::temp_dir(),
        }
    }
}

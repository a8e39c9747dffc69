pub mod mem;
pub mod procfs;
mod process;

pub use self::process::{ProcessHandle, target_pid};

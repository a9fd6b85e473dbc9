//! Process identity and self-elevation.

use crate::HalResult;
use std::ffi::OsString;
use std::path::Path;

pub trait PrivilegeOps {
    fn effective_uid(&self) -> u32;

    /// Run `program args...` again through `sudo` and wait for it.
    ///
    /// Returns the child's exit code (`None` if it was killed by a signal).
    fn relaunch_elevated(&self, program: &Path, args: &[OsString]) -> HalResult<Option<i32>>;
}

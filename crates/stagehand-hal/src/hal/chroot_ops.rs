//! Running programs inside the target tree.

use crate::HalResult;
use std::path::Path;

pub trait ChrootOps {
    /// Run `program args...` with `root` as the filesystem root.
    ///
    /// Arguments are passed as a vector; nothing is interpreted by a shell.
    fn run_in_chroot(
        &self,
        root: &Path,
        program: &str,
        args: &[String],
        dry_run: bool,
    ) -> HalResult<()>;
}

//! Plain file operations on the target tree.
//!
//! These are routed through the HAL (instead of calling `std::fs` directly)
//! because the paths live under freshly mounted devices.

use crate::HalResult;
use std::io::Read;
use std::path::Path;

/// Options controlling how a single file is copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Follow a symlinked source and copy the file it points at (`cp -L`).
    /// Without it, a symlinked source is an error: recreating the link inside
    /// the new root would leave it dangling.
    pub dereference: bool,
}

impl CopyOptions {
    pub fn dereference() -> Self {
        Self { dereference: true }
    }
}

pub trait FsOps {
    /// Create `path` and any missing parents (`mkdir -p`).
    fn ensure_dir(&self, path: &Path, dry_run: bool) -> HalResult<()>;

    /// Write `contents` to `path`, replacing any existing file.
    fn write_file(&self, path: &Path, contents: &[u8], dry_run: bool) -> HalResult<()>;

    /// Copy one file from `src` to `dst`, creating `dst`'s parent directory.
    fn copy_file(
        &self,
        src: &Path,
        dst: &Path,
        opts: &CopyOptions,
        dry_run: bool,
    ) -> HalResult<()>;

    /// Open `path` for streaming reads (checksums over the downloaded archive).
    fn open_read(&self, path: &Path) -> HalResult<Box<dyn Read + Send>>;

    fn exists(&self, path: &Path) -> bool;
}

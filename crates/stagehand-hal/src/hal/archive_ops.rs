//! Archive extraction (tar).

use crate::HalResult;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TarOptions {
    /// Restore permission bits exactly (`p`).
    pub preserve_permissions: bool,
    /// Restore every extended attribute namespace (`--xattrs-include=*.*`).
    pub xattrs: bool,
    /// Use uid/gid numbers from the archive instead of looking up names on the
    /// host (`--numeric-owner`).
    pub numeric_owner: bool,
}

impl TarOptions {
    /// Settings for unpacking a root filesystem image onto a new system.
    pub fn rootfs() -> Self {
        Self {
            preserve_permissions: true,
            xattrs: true,
            numeric_owner: true,
        }
    }
}

pub trait ArchiveOps {
    fn extract_tar(
        &self,
        archive: &Path,
        dest: &Path,
        opts: &TarOptions,
        dry_run: bool,
    ) -> HalResult<()>;
}

/// Argument vector for `tar` extracting `archive` into `dest`.
pub fn tar_args(archive: &Path, dest: &Path, opts: &TarOptions) -> Vec<String> {
    let mode = if opts.preserve_permissions { "xpf" } else { "xf" };
    let mut args = vec![mode.to_string(), archive.display().to_string()];
    if opts.xattrs {
        args.push("--xattrs-include=*.*".to_string());
    }
    if opts.numeric_owner {
        args.push("--numeric-owner".to_string());
    }
    args.push("-C".to_string());
    args.push(dest.display().to_string());
    args
}

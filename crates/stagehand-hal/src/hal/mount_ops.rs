//! Mount operations trait.

use crate::HalResult;
use std::path::Path;

/// Trait for mounting and unmounting filesystems.
pub trait MountOps {
    /// Mount a device to a target path.
    ///
    /// # Arguments
    /// * `device` - Device path (e.g., `/dev/sda3`)
    /// * `target` - Mount point path
    /// * `fstype` - Optional filesystem type (e.g., `"btrfs"`)
    /// * `options` - Mount options, `mount(8)` style
    /// * `dry_run` - If true, log the operation but don't execute it
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: Option<&str>,
        options: MountOptions,
        dry_run: bool,
    ) -> HalResult<()>;

    /// Mount a kernel pseudo filesystem (`proc`, `sysfs`, ...) at `target`.
    fn mount_pseudo(&self, fstype: &str, target: &Path, dry_run: bool) -> HalResult<()>;

    /// Bind `source` onto `target`.
    fn bind_mount(
        &self,
        source: &Path,
        target: &Path,
        opts: BindOptions,
        dry_run: bool,
    ) -> HalResult<()>;

    /// Unmount a filesystem.
    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()>;

    /// Unmount `target` and everything mounted beneath it, deepest first.
    /// With `lazy`, busy mounts are detached instead of failing.
    fn unmount_recursive(&self, target: &Path, lazy: bool, dry_run: bool) -> HalResult<()>;

    /// Check if a path is currently mounted.
    fn is_mounted(&self, path: &Path) -> HalResult<bool>;
}

/// Mount options and flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountOptions {
    /// Comma-separated options (e.g. "noatime,compress=zstd,subvol=@home")
    pub options: Option<String>,
}

impl MountOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: impl Into<String>) -> Self {
        Self {
            options: Some(options.into()),
        }
    }
}

/// Flags for bind mounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindOptions {
    /// Bind the whole subtree (`--rbind`).
    pub recursive: bool,
    /// Mark the new mount as a slave so unmounts inside do not propagate back
    /// to the host (`--make-rslave`).
    pub slave: bool,
}

impl BindOptions {
    /// `--rbind` followed by `--make-rslave`.
    pub fn rslave() -> Self {
        Self {
            recursive: true,
            slave: true,
        }
    }
}

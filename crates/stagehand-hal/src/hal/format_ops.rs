//! Filesystem formatting operations trait.

use crate::HalResult;
use std::path::Path;

/// Trait for formatting block devices.
pub trait FormatOps {
    /// Format a device as FAT32, typically used for EFI system partitions.
    fn format_vfat(&self, device: &Path, label: &str, opts: &FormatOptions) -> HalResult<()>;

    /// Initialise a device as swap space (`mkswap`).
    fn format_swap(&self, device: &Path, opts: &FormatOptions) -> HalResult<()>;

    /// Format a device with btrfs.
    ///
    /// # Arguments
    /// * `device` - Block device path (e.g., `/dev/sda3`)
    /// * `opts` - Formatting options; pass `-f` in `extra_args` to overwrite an
    ///   existing filesystem
    fn format_btrfs(&self, device: &Path, opts: &FormatOptions) -> HalResult<()>;
}

/// Options for formatting operations.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// If true, log the operation but don't execute it
    pub dry_run: bool,
    /// Additional arguments to pass to the format command
    pub extra_args: Vec<String>,
}

impl FormatOptions {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

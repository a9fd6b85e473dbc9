//! btrfs operations used to lay out subvolumes on the root partition.

use crate::HalResult;
use std::path::Path;

pub trait BtrfsOps {
    /// Create a btrfs subvolume at `path`.
    fn btrfs_subvolume_create(&self, path: &Path, dry_run: bool) -> HalResult<()>;
}

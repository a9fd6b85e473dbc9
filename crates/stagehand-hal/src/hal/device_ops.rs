//! Block device listing (lsblk).

use crate::HalResult;

pub trait DeviceOps {
    /// Return a human-readable table of whole disks for interactive selection.
    fn lsblk_disks(&self) -> HalResult<String>;
}

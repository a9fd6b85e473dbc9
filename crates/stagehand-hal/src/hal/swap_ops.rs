//! Swap activation.

use crate::HalResult;
use std::path::Path;

pub trait SwapOps {
    fn swapon(&self, device: &Path, dry_run: bool) -> HalResult<()>;

    fn swapoff(&self, device: &Path, dry_run: bool) -> HalResult<()>;
}

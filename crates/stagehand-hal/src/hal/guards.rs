use crate::MountOps;
use std::path::PathBuf;

/// RAII guard that unmounts a target path when dropped.
///
/// Used for temporary mounts that must not outlive the step that created
/// them, even when that step fails halfway.
#[derive(Debug)]
pub struct MountGuard<'a, H: MountOps + ?Sized> {
    hal: &'a H,
    target: PathBuf,
    dry_run: bool,
    active: bool,
}

impl<'a, H: MountOps + ?Sized> MountGuard<'a, H> {
    pub fn new(hal: &'a H, target: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            hal,
            target: target.into(),
            dry_run,
            active: true,
        }
    }

    /// Unmount now and surface the error instead of only logging it.
    pub fn finish(mut self) -> crate::HalResult<()> {
        self.active = false;
        self.hal.unmount(&self.target, self.dry_run)
    }
}

impl<'a, H: MountOps + ?Sized> Drop for MountGuard<'a, H> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(err) = self.hal.unmount(&self.target, self.dry_run) {
            log::warn!(
                "mount guard failed to unmount {}: {}",
                self.target.display(),
                err
            );
        }
    }
}

use crate::errors::{InstallError, InstallResult};
use crate::style::emoji;
use stagehand_hal::{ChrootOps, MountOps, SwapOps};
use std::path::Path;

pub const CHROOT_SHELL: &str = "/bin/bash";

/// Run `chroot <mount_point> /bin/bash /root/<script> <args...>`.
///
/// `args` are passed as separate argv entries, so values with spaces or shell
/// metacharacters reach the script unchanged.
pub fn run_chroot(
    hal: &dyn ChrootOps,
    mount_point: &Path,
    script: &str,
    args: &[String],
    dry_run: bool,
) -> InstallResult<()> {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(format!("/root/{}", script));
    argv.extend(args.iter().cloned());

    log::info!(
        "{} Handing off to {} inside {}",
        emoji::ACTION,
        script,
        mount_point.display()
    );
    hal.run_in_chroot(mount_point, CHROOT_SHELL, &argv, dry_run)
        .map_err(InstallError::command(format!("chroot script {}", script)))
}

/// Turn swap off and lazily detach everything mounted under `mount_point`.
///
/// A swapoff failure only warns: swap activation itself is best effort.
pub fn teardown<H>(hal: &H, swap_part: &Path, mount_point: &Path, dry_run: bool) -> InstallResult<()>
where
    H: SwapOps + MountOps + ?Sized,
{
    log::info!("{} Tearing down {}", emoji::CLEANUP, mount_point.display());

    if let Err(err) = hal.swapoff(swap_part, dry_run) {
        log::warn!("swapoff {} failed: {}", swap_part.display(), err);
    }

    hal.unmount_recursive(mount_point, true, dry_run)
        .map_err(InstallError::command(format!(
            "unmount {}",
            mount_point.display()
        )))
}

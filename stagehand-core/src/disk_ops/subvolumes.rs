use crate::errors::{InstallError, InstallResult};
use crate::style::emoji;
use stagehand_hal::{BtrfsOps, FsOps, MountGuard, MountOps, MountOptions, SwapOps};
use std::path::{Path, PathBuf};

/// btrfs subvolumes and where they are mounted, relative to the target root.
pub const SUBVOLUMES: [(&str, &str); 5] = [
    ("@", ""),
    ("@home", "/home"),
    ("@var", "/var"),
    ("@tmp", "/tmp"),
    ("@snapshots", "/.snapshots"),
];

pub const SUBVOLUME_MOUNT_OPTIONS: &str = "noatime,compress=zstd";

/// `base` + `suffix`, without a trailing slash for the root subvolume.
pub fn subvolume_target(base: &Path, suffix: &str) -> PathBuf {
    match suffix.trim_start_matches('/') {
        "" => base.to_path_buf(),
        rel => base.join(rel),
    }
}

/// Mount the top level of `root_part` at `mount_point`, create every subvolume,
/// and unmount again. The unmount also happens when a create fails.
pub fn create_subvolumes<H>(
    hal: &H,
    root_part: &Path,
    mount_point: &Path,
    dry_run: bool,
) -> InstallResult<()>
where
    H: MountOps + BtrfsOps + FsOps + ?Sized,
{
    log::info!(
        "{} Creating btrfs subvolumes on {}",
        emoji::ACTION,
        root_part.display()
    );

    let busy = hal
        .is_mounted(mount_point)
        .map_err(InstallError::command(format!(
            "inspect mounts at {}",
            mount_point.display()
        )))?;
    if busy {
        return Err(InstallError::Precondition(format!(
            "{} is already a mount point; unmount it first",
            mount_point.display()
        )));
    }

    hal.ensure_dir(mount_point, dry_run)
        .map_err(InstallError::command(format!(
            "create {}",
            mount_point.display()
        )))?;
    hal.mount_device(
        root_part,
        mount_point,
        Some("btrfs"),
        MountOptions::new(),
        dry_run,
    )
    .map_err(InstallError::command(format!(
        "mount {}",
        root_part.display()
    )))?;

    let guard = MountGuard::new(hal, mount_point, dry_run);
    for (name, _) in SUBVOLUMES {
        let path = mount_point.join(name);
        hal.btrfs_subvolume_create(&path, dry_run)
            .map_err(InstallError::command(format!("create subvolume {}", name)))?;
    }

    guard.finish().map_err(InstallError::command(format!(
        "unmount {}",
        mount_point.display()
    )))
}

/// Mount each subvolume at its target under `base`, `@` first so the other
/// mount points are created inside it.
pub fn mount_subvolumes<H>(
    hal: &H,
    root_part: &Path,
    base: &Path,
    dry_run: bool,
) -> InstallResult<()>
where
    H: MountOps + FsOps + ?Sized,
{
    log::info!("{} Mounting subvolumes under {}", emoji::ACTION, base.display());

    for (name, suffix) in SUBVOLUMES {
        let target = subvolume_target(base, suffix);
        hal.ensure_dir(&target, dry_run)
            .map_err(InstallError::command(format!("create {}", target.display())))?;

        let options =
            MountOptions::with_options(format!("{},subvol={}", SUBVOLUME_MOUNT_OPTIONS, name));
        hal.mount_device(root_part, &target, Some("btrfs"), options, dry_run)
            .map_err(InstallError::command(format!(
                "mount subvolume {} at {}",
                name,
                target.display()
            )))?;
    }
    Ok(())
}

/// Activate swap. Callers treat a failure as a warning.
pub fn enable_swap(hal: &dyn SwapOps, swap_part: &Path, dry_run: bool) -> InstallResult<()> {
    hal.swapon(swap_part, dry_run)
        .map_err(InstallError::command(format!("swapon {}", swap_part.display())))
}

//! HAL trait definitions and implementations.
//!
//! This module defines the core traits for system operations and provides
//! both real (LinuxHal) and fake (FakeHal) implementations.

pub mod archive_ops;
pub mod btrfs_ops;
pub mod chroot_ops;
pub mod device_ops;
pub mod fake_hal;
pub mod fetch_ops;
pub mod format_ops;
pub mod fs_ops;
pub mod guards;
pub mod linux_hal;
pub mod mount_ops;
pub mod partition_ops;
pub mod privilege_ops;
pub mod swap_ops;

pub use archive_ops::{tar_args, ArchiveOps, TarOptions};
pub use btrfs_ops::BtrfsOps;
pub use chroot_ops::ChrootOps;
pub use device_ops::DeviceOps;
pub use fake_hal::{FakeHal, Operation};
pub use fetch_ops::{FetchOps, FetchOptions};
pub use format_ops::{FormatOps, FormatOptions};
pub use fs_ops::{CopyOptions, FsOps};
pub use guards::MountGuard;
pub use linux_hal::LinuxHal;
pub use mount_ops::{BindOptions, MountOps, MountOptions};
pub use partition_ops::{sgdisk_args, PartitionKind, PartitionOps, PartitionSize, PartitionSpec};
pub use privilege_ops::PrivilegeOps;
pub use swap_ops::SwapOps;

/// Complete HAL combining every operation the installer needs.
pub trait InstallHal:
    PartitionOps
    + FormatOps
    + MountOps
    + BtrfsOps
    + SwapOps
    + FsOps
    + ArchiveOps
    + FetchOps
    + ChrootOps
    + Send
    + Sync
{
}

/// Automatically implement InstallHal for any type implementing all required traits.
impl<T> InstallHal for T where
    T: PartitionOps
        + FormatOps
        + MountOps
        + BtrfsOps
        + SwapOps
        + FsOps
        + ArchiveOps
        + FetchOps
        + ChrootOps
        + Send
        + Sync
{
}

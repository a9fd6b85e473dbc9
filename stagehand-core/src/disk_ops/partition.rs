use crate::errors::{InstallError, InstallResult};
use crate::style::emoji;
use stagehand_hal::path::{needs_partition_infix, partition_path};
use stagehand_hal::{PartitionKind, PartitionOps, PartitionSize, PartitionSpec};
use std::path::{Path, PathBuf};

pub const EFI_SIZE_GIB: u32 = 1;
pub const SWAP_SIZE_GIB: u32 = 4;

/// Fixed GPT layout: EFI, swap, then root over the rest of the disk.
pub fn layout() -> [PartitionSpec; 3] {
    [
        PartitionSpec {
            number: 1,
            size: PartitionSize::GiB(EFI_SIZE_GIB),
            kind: PartitionKind::EfiSystem,
        },
        PartitionSpec {
            number: 2,
            size: PartitionSize::GiB(SWAP_SIZE_GIB),
            kind: PartitionKind::LinuxSwap,
        },
        PartitionSpec {
            number: 3,
            size: PartitionSize::Remaining,
            kind: PartitionKind::LinuxFilesystem,
        },
    ]
}

/// Device paths of the three partitions on a disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    pub efi: PathBuf,
    pub swap: PathBuf,
    pub root: PathBuf,
}

impl PartitionSet {
    /// `<disk>1`, `<disk>2`, `<disk>3`.
    pub fn for_disk(disk: &Path) -> Self {
        let disk = disk.to_string_lossy();
        if needs_partition_infix(&disk) {
            log::warn!(
                "{} ends in a digit; the kernel will likely name its partitions {}p1.. but {}1.. will be used",
                disk,
                disk,
                disk
            );
        }
        Self {
            efi: PathBuf::from(partition_path(&disk, 1)),
            swap: PathBuf::from(partition_path(&disk, 2)),
            root: PathBuf::from(partition_path(&disk, 3)),
        }
    }
}

/// Wipe every signature on `disk` and write the fixed GPT layout.
///
/// No rollback: a failure after `wipefs` leaves the disk blank.
pub fn partition(
    hal: &dyn PartitionOps,
    disk: &Path,
    dry_run: bool,
) -> InstallResult<PartitionSet> {
    log::info!("{} Partitioning {}", emoji::DISK, disk.display());

    hal.wipefs_all(disk, dry_run)
        .map_err(InstallError::command(format!("wipe {}", disk.display())))?;
    hal.sgdisk_gpt(disk, &layout(), dry_run)
        .map_err(InstallError::command(format!("partition {}", disk.display())))?;

    Ok(PartitionSet::for_disk(disk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_hal::{FakeHal, Operation};

    #[test]
    fn disk_yields_numbered_partitions() {
        let parts = PartitionSet::for_disk(Path::new("/dev/sda"));
        assert_eq!(parts.efi, PathBuf::from("/dev/sda1"));
        assert_eq!(parts.swap, PathBuf::from("/dev/sda2"));
        assert_eq!(parts.root, PathBuf::from("/dev/sda3"));
    }

    #[test]
    fn nvme_names_are_not_guessed() {
        let parts = PartitionSet::for_disk(Path::new("/dev/nvme0n1"));
        assert_eq!(parts.root, PathBuf::from("/dev/nvme0n13"));
    }

    #[test]
    fn wipes_then_writes_single_gpt() {
        let hal = FakeHal::new();
        let parts = partition(&hal, Path::new("/dev/sda"), false).unwrap();
        assert_eq!(parts, PartitionSet::for_disk(Path::new("/dev/sda")));

        let ops = hal.operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[0],
            Operation::WipeFs {
                disk: "/dev/sda".into()
            }
        );
        match &ops[1] {
            Operation::Sgdisk { args, .. } => assert_eq!(
                args,
                &vec![
                    "--clear",
                    "--new=1:0:+1G",
                    "--typecode=1:ef00",
                    "--new=2:0:+4G",
                    "--typecode=2:8200",
                    "--new=3:0:0",
                    "--typecode=3:8300",
                    "/dev/sda",
                ]
            ),
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn wipe_failure_stops_before_sgdisk() {
        let hal = FakeHal::new();
        hal.fail_when(|op| op.label() == "wipefs");
        let err = partition(&hal, Path::new("/dev/sda"), false).unwrap_err();
        assert!(err.to_string().contains("wipe /dev/sda"));
        assert_eq!(hal.labels(), vec!["wipefs"]);
    }
}

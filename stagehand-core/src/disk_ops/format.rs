use super::partition::PartitionSet;
use crate::errors::{InstallError, InstallResult};
use crate::style::emoji;
use stagehand_hal::{FormatOps, FormatOptions};

pub const EFI_LABEL: &str = "EFI";

/// FAT32 on the EFI partition, swap signature on the swap partition, then a
/// forced btrfs on root. Stops at the first failure.
pub fn format(hal: &dyn FormatOps, parts: &PartitionSet, dry_run: bool) -> InstallResult<()> {
    log::info!("{} Formatting partitions", emoji::DISK);

    hal.format_vfat(&parts.efi, EFI_LABEL, &FormatOptions::new(dry_run))
        .map_err(InstallError::command(format!(
            "format EFI {}",
            parts.efi.display()
        )))?;

    hal.format_swap(&parts.swap, &FormatOptions::new(dry_run))
        .map_err(InstallError::command(format!(
            "format swap {}",
            parts.swap.display()
        )))?;

    let btrfs = FormatOptions::new(dry_run).with_args(vec!["-f".to_string()]);
    hal.format_btrfs(&parts.root, &btrfs)
        .map_err(InstallError::command(format!(
            "format root {}",
            parts.root.display()
        )))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_hal::{FakeHal, Operation};
    use std::path::Path;

    #[test]
    fn formats_in_layout_order() {
        let hal = FakeHal::new();
        let parts = PartitionSet::for_disk(Path::new("/dev/vdb"));
        format(&hal, &parts, false).unwrap();

        assert_eq!(hal.labels(), vec!["mkfs.vfat", "mkswap", "mkfs.btrfs"]);
        assert!(hal.has_operation(|op| matches!(
            op,
            Operation::FormatBtrfs { device, args } if device == Path::new("/dev/vdb3") && args == &["-f".to_string()]
        )));
    }

    #[test]
    fn swap_failure_skips_root() {
        let hal = FakeHal::new();
        hal.fail_when(|op| op.label() == "mkswap");
        let parts = PartitionSet::for_disk(Path::new("/dev/vdb"));
        let err = format(&hal, &parts, false).unwrap_err();
        assert!(err.to_string().starts_with("format swap /dev/vdb2 failed"));
        assert_eq!(hal.labels(), vec!["mkfs.vfat", "mkswap"]);
    }
}

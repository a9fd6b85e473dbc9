//! Partitioning operations (wipefs/sgdisk).

use crate::HalResult;
use std::path::Path;

/// Size of a single GPT partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionSize {
    GiB(u32),
    /// Everything left on the disk after the preceding partitions.
    Remaining,
}

/// GPT partition type, expressed as an sgdisk type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    EfiSystem,
    LinuxSwap,
    LinuxFilesystem,
}

impl PartitionKind {
    pub fn type_code(&self) -> &'static str {
        match self {
            PartitionKind::EfiSystem => "ef00",
            PartitionKind::LinuxSwap => "8200",
            PartitionKind::LinuxFilesystem => "8300",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    pub number: u32,
    pub size: PartitionSize,
    pub kind: PartitionKind,
}

pub trait PartitionOps {
    /// Erase every filesystem/partition-table signature on `disk` (`wipefs -a`).
    fn wipefs_all(&self, disk: &Path, dry_run: bool) -> HalResult<()>;

    /// Write a fresh GPT containing exactly `layout`, in a single sgdisk call.
    fn sgdisk_gpt(&self, disk: &Path, layout: &[PartitionSpec], dry_run: bool) -> HalResult<()>;
}

/// Argument vector for `sgdisk` that creates `layout` on a new GPT.
pub fn sgdisk_args(disk: &Path, layout: &[PartitionSpec]) -> Vec<String> {
    let mut args = vec!["--clear".to_string()];
    for part in layout {
        let end = match part.size {
            PartitionSize::GiB(n) => format!("+{}G", n),
            PartitionSize::Remaining => "0".to_string(),
        };
        args.push(format!("--new={}:0:{}", part.number, end));
        args.push(format!("--typecode={}:{}", part.number, part.kind.type_code()));
    }
    args.push(disk.display().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sgdisk_args_follow_layout_order() {
        let layout = [
            PartitionSpec {
                number: 1,
                size: PartitionSize::GiB(1),
                kind: PartitionKind::EfiSystem,
            },
            PartitionSpec {
                number: 2,
                size: PartitionSize::Remaining,
                kind: PartitionKind::LinuxFilesystem,
            },
        ];
        let args = sgdisk_args(Path::new("/dev/sdz"), &layout);
        assert_eq!(
            args,
            vec![
                "--clear",
                "--new=1:0:+1G",
                "--typecode=1:ef00",
                "--new=2:0:0",
                "--typecode=2:8300",
                "/dev/sdz",
            ]
        );
    }
}

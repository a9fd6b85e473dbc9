//! Disk provisioning: partition table, filesystems and btrfs subvolumes.

pub mod format;
pub mod partition;
pub mod subvolumes;

pub use format::format;
pub use partition::{partition, PartitionSet};
pub use subvolumes::{create_subvolumes, enable_swap, mount_subvolumes, SUBVOLUMES};

/// Partition path helper for block devices.
///
/// Partition `num` of `disk` is `disk` with the digit appended (`/dev/sda` ->
/// `/dev/sda3`). Devices that need a `p` infix (`nvme0n1p3`, `mmcblk0p3`) are not
/// handled; see [`needs_partition_infix`].
pub fn partition_path(disk: &str, num: u32) -> String {
    format!("{}{}", disk, num)
}

/// True when the kernel would name partitions of `disk` with a `p` infix,
/// which happens whenever the device name itself ends in a digit.
pub fn needs_partition_infix(disk: &str) -> bool {
    disk.chars().last().is_some_and(|c| c.is_ascii_digit())
}

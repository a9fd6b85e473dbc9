//! Interactive target disk selection (`--select-disk`).

use crate::errors::{InstallError, InstallResult};
use crate::style::{self, emoji};
use stagehand_hal::DeviceOps;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Show the host's disks and read the chosen device path from `input`.
pub fn select_disk(
    hal: &dyn DeviceOps,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> InstallResult<PathBuf> {
    let table = hal
        .lsblk_disks()
        .map_err(InstallError::command("list disks"))?;

    let io_err = |e: std::io::Error| InstallError::config("disk", format!("cannot prompt: {}", e));
    writeln!(output, "{}", style::with(emoji::DISK, "Available disks:")).map_err(io_err)?;
    write!(output, "{}", table).map_err(io_err)?;
    write!(output, "Install to which disk (e.g. /dev/sda)? ").map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let mut line = String::new();
    input.read_line(&mut line).map_err(io_err)?;
    let choice = line.trim();

    if choice.is_empty() {
        return Err(InstallError::config("disk", "no disk selected"));
    }
    if !choice.starts_with("/dev/") {
        return Err(InstallError::config(
            "disk",
            format!("'{}' is not a /dev path", choice),
        ));
    }

    log::info!("selected disk {}", choice);
    Ok(PathBuf::from(choice))
}

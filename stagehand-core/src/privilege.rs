//! Root check with sudo re-launch.

use crate::errors::{InstallError, InstallResult};
use stagehand_hal::PrivilegeOps;
use std::ffi::OsString;
use std::path::Path;

/// Outcome of the privilege check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Already running with euid 0; carry on.
    Root,
    /// Dry run: no privileges needed.
    Skipped,
    /// An elevated copy of this process ran to completion with this exit code.
    /// The caller should exit with it.
    Relaunched(i32),
}

/// Ensure the install runs as root, re-launching the current executable with
/// the same arguments through `sudo` when it is not.
pub fn ensure_elevated(hal: &dyn PrivilegeOps, dry_run: bool) -> InstallResult<Elevation> {
    let program = std::env::current_exe()
        .map_err(|e| InstallError::Privilege(format!("cannot locate own executable: {}", e)))?;
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    ensure_elevated_with(hal, &program, &args, dry_run)
}

pub fn ensure_elevated_with(
    hal: &dyn PrivilegeOps,
    program: &Path,
    args: &[OsString],
    dry_run: bool,
) -> InstallResult<Elevation> {
    if dry_run {
        log::info!("DRY RUN: skipping privilege check");
        return Ok(Elevation::Skipped);
    }

    let euid = hal.effective_uid();
    if euid == 0 {
        return Ok(Elevation::Root);
    }

    log::warn!("running as uid {}, re-launching through sudo", euid);
    let code = hal
        .relaunch_elevated(program, args)
        .map_err(|e| InstallError::Privilege(e.to_string()))?;

    // Killed by a signal: report failure.
    Ok(Elevation::Relaunched(code.unwrap_or(1)))
}

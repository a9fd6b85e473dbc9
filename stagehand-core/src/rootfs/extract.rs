use super::fetch::archive_path;
use crate::errors::{InstallError, InstallResult};
use crate::style::emoji;
use stagehand_hal::{ArchiveOps, FsOps, TarOptions};
use std::path::Path;

/// Unpack `<dest_dir>/stage3.tar.xz` into `dest_dir`, keeping permissions,
/// xattrs and numeric ownership.
///
/// A missing archive is a precondition failure and nothing is run. In dry
/// run the archive was never downloaded, so the check is skipped.
pub fn extract_archive<H>(hal: &H, dest_dir: &Path, dry_run: bool) -> InstallResult<()>
where
    H: ArchiveOps + FsOps + ?Sized,
{
    let archive = archive_path(dest_dir);
    if !dry_run && !hal.exists(&archive) {
        return Err(InstallError::Precondition(format!(
            "stage archive not found at {}",
            archive.display()
        )));
    }

    log::info!(
        "{} Extracting {} into {}",
        emoji::ACTION,
        archive.display(),
        dest_dir.display()
    );
    hal.extract_tar(&archive, dest_dir, &TarOptions::rootfs(), dry_run)
        .map_err(InstallError::command("extract stage archive"))
}

//! The install sequence, from blank disk to chroot handoff.

use crate::install_state::InstallState;
use crate::stage_runner::{StageDefinition, StageRunner};
use anyhow::{Context, Result};
use stagehand_core::chroot::{self, FileCopySpec};
use stagehand_core::disk_ops;
use stagehand_core::rootfs;
use stagehand_core::{InstallProfile, InstallerSettings};
use stagehand_hal::{FetchOptions, InstallHal};
use std::time::Duration;

pub const STAGE_PARTITION: &str = "Partition disk";
pub const STAGE_FORMAT: &str = "Format partitions";
pub const STAGE_CREATE_SUBVOLUMES: &str = "Create subvolumes";
pub const STAGE_MOUNT_SUBVOLUMES: &str = "Mount subvolumes";
pub const STAGE_SWAP: &str = "Enable swap";
pub const STAGE_DOWNLOAD: &str = "Download stage archive";
pub const STAGE_VERIFY: &str = "Verify stage archive";
pub const STAGE_EXTRACT: &str = "Extract stage archive";
pub const STAGE_PREPARE_CHROOT: &str = "Prepare chroot";
pub const STAGE_HANDOFF: &str = "Run chroot script";
pub const STAGE_TEARDOWN: &str = "Teardown";

/// Build the ordered stage list for one install.
///
/// Every stage is required except swap activation. The checksum stage is only
/// present when the settings carry a digest.
pub fn build_stage_definitions<'a, H: InstallHal>(
    hal: &'a H,
    profile: &'a InstallProfile,
    settings: &'a InstallerSettings,
    copies: &'a [FileCopySpec],
) -> Vec<StageDefinition<'a, InstallState>> {
    let mnt = settings.mount_point.as_path();
    let mut stages = vec![
        StageDefinition::required(STAGE_PARTITION, move |state: &mut InstallState, dry_run| {
            state.partitions = Some(disk_ops::partition(hal, &profile.disk, dry_run)?);
            Ok(())
        }),
        StageDefinition::required(STAGE_FORMAT, move |state: &mut InstallState, dry_run| {
            disk_ops::format(hal, state.partitions()?, dry_run)?;
            Ok(())
        }),
        StageDefinition::required(
            STAGE_CREATE_SUBVOLUMES,
            move |state: &mut InstallState, dry_run| {
                disk_ops::create_subvolumes(hal, &state.partitions()?.root, mnt, dry_run)?;
                Ok(())
            },
        ),
        StageDefinition::required(
            STAGE_MOUNT_SUBVOLUMES,
            move |state: &mut InstallState, dry_run| {
                disk_ops::mount_subvolumes(hal, &state.partitions()?.root, mnt, dry_run)?;
                Ok(())
            },
        ),
        StageDefinition::best_effort(STAGE_SWAP, move |state: &mut InstallState, dry_run| {
            disk_ops::enable_swap(hal, &state.partitions()?.swap, dry_run)?;
            Ok(())
        }),
        StageDefinition::required(STAGE_DOWNLOAD, move |_: &mut InstallState, dry_run| {
            let opts = FetchOptions {
                timeout: Duration::from_secs(settings.download_timeout_secs),
                ..FetchOptions::default()
            };
            rootfs::download_archive(hal, &settings.stage3_url, mnt, &opts, dry_run)?;
            Ok(())
        }),
    ];

    if let Some(expected) = settings.stage3_sha256.as_deref() {
        stages.push(StageDefinition::required(
            STAGE_VERIFY,
            move |_: &mut InstallState, dry_run| {
                if dry_run {
                    log::info!("DRY RUN: verify sha256 {}", expected);
                    return Ok(());
                }
                rootfs::verify_sha256(hal, &rootfs::archive_path(mnt), expected)?;
                Ok(())
            },
        ));
    }

    stages.extend([
        StageDefinition::required(STAGE_EXTRACT, move |_: &mut InstallState, dry_run| {
            rootfs::extract_archive(hal, mnt, dry_run)?;
            Ok(())
        }),
        StageDefinition::required(
            STAGE_PREPARE_CHROOT,
            move |_: &mut InstallState, dry_run| {
                chroot::prepare_chroot(hal, &profile.disk, mnt, copies, dry_run)?;
                Ok(())
            },
        ),
        StageDefinition::required(STAGE_HANDOFF, move |_: &mut InstallState, dry_run| {
            chroot::run_chroot(
                hal,
                mnt,
                &settings.chroot_script,
                &profile.handoff_args(),
                dry_run,
            )?;
            Ok(())
        }),
        StageDefinition::required(STAGE_TEARDOWN, move |state: &mut InstallState, dry_run| {
            chroot::teardown(hal, &state.partitions()?.swap, mnt, dry_run)?;
            Ok(())
        }),
    ]);

    stages
}

/// Run the whole install against `hal`.
pub fn run<H: InstallHal>(
    hal: &H,
    profile: &InstallProfile,
    settings: &InstallerSettings,
    dry_run: bool,
) -> Result<InstallState> {
    let copies = chroot::default_copy_specs(
        &settings.files_dir,
        &settings.resolv_conf,
        &settings.chroot_script,
    );
    let stages = build_stage_definitions(hal, profile, settings, &copies);

    log::info!(
        "Installing onto {} ({} stages{})",
        profile.disk.display(),
        stages.len(),
        if dry_run { ", dry run" } else { "" }
    );
    StageRunner::new(dry_run)
        .run(InstallState::new(dry_run), &stages)
        .with_context(|| format!("install onto {} aborted", profile.disk.display()))
}

#[cfg(test)]
mod tests;

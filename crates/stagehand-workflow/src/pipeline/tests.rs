use super::*;
use stagehand_core::InstallError;
use stagehand_hal::{FakeHal, Operation};
use std::path::PathBuf;

// sha256 of zero bytes; the fake download leaves an empty archive.
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

fn profile() -> InstallProfile {
    InstallProfile {
        disk: PathBuf::from("/dev/sda"),
        hostname: "h".into(),
        username: "u".into(),
        desktop: "gnome".into(),
        groups: vec!["wheel".into(), "audio".into(), "video".into()],
        packages: vec!["a".into(), "b".into(), "c".into(), "d".into()],
    }
}

fn expected_labels() -> Vec<&'static str> {
    let mut labels = vec!["wipefs", "sgdisk", "mkfs.vfat", "mkswap", "mkfs.btrfs"];
    labels.extend(["mkdir", "mount"]);
    labels.extend(["btrfs-subvolume-create"; 5]);
    labels.push("unmount");
    for _ in 0..5 {
        labels.extend(["mkdir", "mount"]);
    }
    labels.extend(["swapon", "download", "tar", "write-file"]);
    labels.extend(["copy-file"; 6]);
    labels.push("mount-pseudo");
    labels.extend(["bind-mount"; 3]);
    labels.extend(["chroot", "swapoff", "unmount-recursive"]);
    labels
}

#[test]
fn full_install_runs_every_step_in_order() {
    let hal = FakeHal::new();
    let state = run(&hal, &profile(), &InstallerSettings::default(), false).unwrap();

    assert_eq!(hal.labels(), expected_labels());
    assert!(state.warnings.is_empty());
    assert!(state.is_completed(STAGE_TEARDOWN));
    assert!(!state.is_completed(STAGE_VERIFY));
    assert!(hal.mounted_paths().is_empty());
}

#[test]
fn chroot_script_receives_profile_arguments() {
    let hal = FakeHal::new();
    run(&hal, &profile(), &InstallerSettings::default(), false).unwrap();

    let expected: Vec<String> = [
        "/root/chroot.sh",
        "h",
        "u",
        "gnome",
        "wheel",
        "audio",
        "video",
        "a",
        "b",
        "c",
        "d",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    assert!(hal.has_operation(|op| matches!(
        op,
        Operation::Chroot { root, program, args }
            if root == &PathBuf::from("/mnt/gentoo")
                && program == "/bin/bash"
                && args == &expected
    )));
}

#[test]
fn vars_file_names_the_disk() {
    let hal = FakeHal::new();
    run(&hal, &profile(), &InstallerSettings::default(), false).unwrap();

    assert!(hal.has_operation(|op| matches!(
        op,
        Operation::WriteFile { path, contents }
            if path == &PathBuf::from("/mnt/gentoo/root/stagehand-vars.sh")
                && contents == "DISK='/dev/sda'\n"
    )));
}

#[test]
fn swap_failure_is_only_a_warning() {
    let hal = FakeHal::new();
    hal.fail_when(|op| matches!(op, Operation::Swapon { .. } | Operation::Swapoff { .. }));

    let state = run(&hal, &profile(), &InstallerSettings::default(), false).unwrap();

    assert_eq!(state.warnings.len(), 1);
    assert_eq!(state.warnings[0].0, STAGE_SWAP);
    assert!(!state.is_completed(STAGE_SWAP));
    assert!(state.is_completed(STAGE_TEARDOWN));
    assert_eq!(hal.labels(), expected_labels());
}

#[test]
fn subvolume_mount_failure_aborts_before_download() {
    let hal = FakeHal::new();
    hal.fail_when(|op| {
        matches!(op, Operation::Mount { options: Some(opts), .. } if opts.ends_with("subvol=@home"))
    });

    let err = run(&hal, &profile(), &InstallerSettings::default(), false).unwrap_err();
    let chain = format!("{:#}", err);

    assert!(chain.contains(STAGE_MOUNT_SUBVOLUMES), "{}", chain);
    assert!(!hal.labels().contains(&"download"));
    assert!(!hal.labels().contains(&"chroot"));
}

#[test]
fn matching_checksum_lets_extraction_run() {
    let hal = FakeHal::new();
    let settings = InstallerSettings {
        stage3_sha256: Some(EMPTY_SHA256.to_string()),
        ..InstallerSettings::default()
    };

    let state = run(&hal, &profile(), &settings, false).unwrap();

    assert!(state.is_completed(STAGE_VERIFY));
    assert_eq!(hal.labels(), expected_labels());
}

#[test]
fn checksum_mismatch_stops_before_extraction() {
    let hal = FakeHal::new();
    hal.add_file_contents("/mnt/gentoo/stage3.tar.xz", b"truncated".to_vec());
    let settings = InstallerSettings {
        stage3_sha256: Some(EMPTY_SHA256.to_string()),
        ..InstallerSettings::default()
    };

    let err = run(&hal, &profile(), &settings, false).unwrap_err();

    assert!(format!("{:#}", err).contains(STAGE_VERIFY));
    assert!(err
        .chain()
        .any(|cause| matches!(
            cause.downcast_ref::<InstallError>(),
            Some(InstallError::ChecksumMismatch { .. })
        )));
    assert!(hal.labels().contains(&"download"));
    assert!(!hal.labels().contains(&"tar"));
}

#[test]
fn chroot_failure_skips_teardown() {
    let hal = FakeHal::new();
    hal.fail_when(|op| matches!(op, Operation::Chroot { .. }));

    let err = run(&hal, &profile(), &InstallerSettings::default(), false).unwrap_err();

    assert!(format!("{:#}", err).contains(STAGE_HANDOFF));
    assert!(!hal.labels().contains(&"unmount-recursive"));
}

#[test]
fn dry_run_touches_nothing() {
    let hal = FakeHal::new();
    let settings = InstallerSettings {
        stage3_sha256: Some("a".repeat(64)),
        ..InstallerSettings::default()
    };

    let state = run(&hal, &profile(), &settings, true).unwrap();

    let copies = chroot::default_copy_specs(
        &settings.files_dir,
        &settings.resolv_conf,
        &settings.chroot_script,
    );
    let planned = build_stage_definitions(&hal, &profile(), &settings, &copies).len();
    assert_eq!(hal.operation_count(), 0);
    assert!(state.dry_run);
    assert_eq!(state.completed_stages.len(), planned);
    assert_eq!(planned, 11);
}

#[test]
fn stage_list_depends_on_checksum_setting() {
    let hal = FakeHal::new();
    let profile = profile();
    let plain = InstallerSettings::default();
    let pinned = InstallerSettings {
        stage3_sha256: Some("b".repeat(64)),
        ..InstallerSettings::default()
    };

    let names = |settings: &InstallerSettings| -> Vec<String> {
        build_stage_definitions(&hal, &profile, settings, &[])
            .iter()
            .map(|s| s.name.to_string())
            .collect()
    };

    assert_eq!(names(&plain).len(), 10);
    let with_verify = names(&pinned);
    assert_eq!(with_verify.len(), 11);
    assert_eq!(with_verify[6], STAGE_VERIFY);
    assert_eq!(with_verify[7], STAGE_EXTRACT);
}

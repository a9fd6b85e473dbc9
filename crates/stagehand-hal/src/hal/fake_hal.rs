//! Fake HAL implementation for testing.
//!
//! This implementation records all operations without executing them,
//! allowing for CI-safe testing without root privileges or real hardware.
//! Failures can be injected per operation with [`FakeHal::fail_when`].

use super::{
    archive_ops::tar_args, partition_ops::sgdisk_args, ArchiveOps, BindOptions, BtrfsOps,
    ChrootOps, CopyOptions, DeviceOps, FetchOps, FetchOptions, FormatOps, FormatOptions, FsOps,
    MountOps, MountOptions, PartitionOps, PartitionSpec, PrivilegeOps, SwapOps, TarOptions,
};
use crate::{HalError, HalResult};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    WipeFs {
        disk: PathBuf,
    },
    Sgdisk {
        disk: PathBuf,
        args: Vec<String>,
    },
    FormatVfat {
        device: PathBuf,
        label: String,
    },
    FormatSwap {
        device: PathBuf,
    },
    FormatBtrfs {
        device: PathBuf,
        args: Vec<String>,
    },
    Mount {
        device: PathBuf,
        target: PathBuf,
        fstype: Option<String>,
        options: Option<String>,
    },
    MountPseudo {
        fstype: String,
        target: PathBuf,
    },
    BindMount {
        source: PathBuf,
        target: PathBuf,
        recursive: bool,
        slave: bool,
    },
    Unmount {
        target: PathBuf,
    },
    UnmountRecursive {
        target: PathBuf,
        lazy: bool,
    },
    BtrfsSubvolumeCreate {
        path: PathBuf,
    },
    Swapon {
        device: PathBuf,
    },
    Swapoff {
        device: PathBuf,
    },
    EnsureDir {
        path: PathBuf,
    },
    WriteFile {
        path: PathBuf,
        contents: String,
    },
    CopyFile {
        src: PathBuf,
        dst: PathBuf,
        dereference: bool,
    },
    ExtractTar {
        archive: PathBuf,
        dest: PathBuf,
        args: Vec<String>,
    },
    Download {
        url: String,
        dest: PathBuf,
    },
    Chroot {
        root: PathBuf,
        program: String,
        args: Vec<String>,
    },
    LsblkDisks,
    RelaunchElevated {
        program: PathBuf,
        args: Vec<String>,
    },
}

impl Operation {
    /// Short name of the tool or syscall the operation stands for.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::WipeFs { .. } => "wipefs",
            Operation::Sgdisk { .. } => "sgdisk",
            Operation::FormatVfat { .. } => "mkfs.vfat",
            Operation::FormatSwap { .. } => "mkswap",
            Operation::FormatBtrfs { .. } => "mkfs.btrfs",
            Operation::Mount { .. } => "mount",
            Operation::MountPseudo { .. } => "mount-pseudo",
            Operation::BindMount { .. } => "bind-mount",
            Operation::Unmount { .. } => "unmount",
            Operation::UnmountRecursive { .. } => "unmount-recursive",
            Operation::BtrfsSubvolumeCreate { .. } => "btrfs-subvolume-create",
            Operation::Swapon { .. } => "swapon",
            Operation::Swapoff { .. } => "swapoff",
            Operation::EnsureDir { .. } => "mkdir",
            Operation::WriteFile { .. } => "write-file",
            Operation::CopyFile { .. } => "copy-file",
            Operation::ExtractTar { .. } => "tar",
            Operation::Download { .. } => "download",
            Operation::Chroot { .. } => "chroot",
            Operation::LsblkDisks => "lsblk",
            Operation::RelaunchElevated { .. } => "sudo",
        }
    }
}

type FailPredicate = dyn Fn(&Operation) -> bool + Send + Sync;

#[derive(Clone)]
struct FailRule(Arc<FailPredicate>);

impl fmt::Debug for FailRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FailRule(..)")
    }
}

/// Shared state for FakeHal operations.
#[derive(Debug, Default)]
struct FakeHalState {
    /// All operations that were recorded
    operations: Vec<Operation>,
    /// Currently mounted paths
    mounted_paths: HashSet<PathBuf>,
    /// Paths that `exists` reports as present
    files: HashSet<PathBuf>,
    /// What `open_read` returns; present files without an entry read as empty
    contents: HashMap<PathBuf, Vec<u8>>,
    fail_rules: Vec<FailRule>,
    euid: u32,
    relaunch_code: Option<i32>,
    lsblk_output: String,
}

/// Fake HAL implementation that records operations without executing them.
///
/// Dry-run calls are logged and not recorded, matching how the real HAL
/// performs no work for them.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        let hal = Self::default();
        hal.state().relaunch_code = Some(0);
        hal
    }

    fn state(&self) -> MutexGuard<'_, FakeHalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state().operations.clone()
    }

    /// Get the number of operations recorded.
    pub fn operation_count(&self) -> usize {
        self.state().operations.len()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.state().operations.iter().any(check)
    }

    /// Labels of every recorded operation, in order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.state().operations.iter().map(Operation::label).collect()
    }

    /// Make every operation matching `predicate` fail after being recorded.
    pub fn fail_when(&self, predicate: impl Fn(&Operation) -> bool + Send + Sync + 'static) {
        self.state().fail_rules.push(FailRule(Arc::new(predicate)));
    }

    /// Pretend `path` exists on disk.
    pub fn add_file(&self, path: impl Into<PathBuf>) {
        self.state().files.insert(path.into());
    }

    /// Pretend `path` exists and holds `contents`.
    pub fn add_file_contents(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let path = path.into();
        let mut state = self.state();
        state.files.insert(path.clone());
        state.contents.insert(path, contents.into());
    }

    pub fn set_euid(&self, euid: u32) {
        self.state().euid = euid;
    }

    /// Exit code the fake elevated child reports (`None` = killed by a signal).
    pub fn set_relaunch_code(&self, code: Option<i32>) {
        self.state().relaunch_code = code;
    }

    pub fn set_lsblk_output(&self, output: impl Into<String>) {
        self.state().lsblk_output = output.into();
    }

    pub fn mounted_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.state().mounted_paths.iter().cloned().collect();
        paths.sort();
        paths
    }

    /// Record `op`, then apply any matching failure rule.
    fn record_operation(&self, op: Operation) -> HalResult<()> {
        let mut state = self.state();
        let fail = state.fail_rules.iter().any(|rule| (rule.0)(&op));
        let label = op.label();
        state.operations.push(op);
        if fail {
            log::info!("FAKE HAL: injected failure for {}", label);
            return Err(HalError::CommandFailed {
                program: label.to_string(),
                code: Some(1),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    /// Simulate a mount by adding it to the mounted set.
    fn record_mount(&self, target: PathBuf) {
        self.state().mounted_paths.insert(target);
    }

    /// Simulate an unmount by removing it from the mounted set.
    fn record_unmount(&self, target: &Path) {
        self.state().mounted_paths.remove(target);
    }

    fn record_file(&self, path: &Path) {
        self.state().files.insert(path.to_path_buf());
    }
}

impl PartitionOps for FakeHal {
    fn wipefs_all(&self, disk: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: wipefs -a {}", disk.display());
            return Ok(());
        }
        log::info!("FAKE HAL: wipefs -a {}", disk.display());
        self.record_operation(Operation::WipeFs {
            disk: disk.to_path_buf(),
        })
    }

    fn sgdisk_gpt(&self, disk: &Path, layout: &[PartitionSpec], dry_run: bool) -> HalResult<()> {
        let args = sgdisk_args(disk, layout);
        if dry_run {
            log::info!("FAKE HAL DRY RUN: sgdisk {}", args.join(" "));
            return Ok(());
        }
        log::info!("FAKE HAL: sgdisk {}", args.join(" "));
        self.record_operation(Operation::Sgdisk {
            disk: disk.to_path_buf(),
            args,
        })
    }
}

impl FormatOps for FakeHal {
    fn format_vfat(&self, device: &Path, label: &str, opts: &FormatOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!(
                "FAKE HAL DRY RUN: mkfs.vfat {} ({})",
                device.display(),
                label
            );
            return Ok(());
        }
        log::info!("FAKE HAL: mkfs.vfat {} ({})", device.display(), label);
        self.record_operation(Operation::FormatVfat {
            device: device.to_path_buf(),
            label: label.to_string(),
        })
    }

    fn format_swap(&self, device: &Path, opts: &FormatOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: mkswap {}", device.display());
            return Ok(());
        }
        log::info!("FAKE HAL: mkswap {}", device.display());
        self.record_operation(Operation::FormatSwap {
            device: device.to_path_buf(),
        })
    }

    fn format_btrfs(&self, device: &Path, opts: &FormatOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: mkfs.btrfs {}", device.display());
            return Ok(());
        }
        log::info!("FAKE HAL: mkfs.btrfs {}", device.display());
        self.record_operation(Operation::FormatBtrfs {
            device: device.to_path_buf(),
            args: opts.extra_args.clone(),
        })
    }
}

impl MountOps for FakeHal {
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: Option<&str>,
        options: MountOptions,
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "FAKE HAL DRY RUN: mount {} -> {}",
                device.display(),
                target.display()
            );
            return Ok(());
        }

        log::info!(
            "FAKE HAL: mount {} -> {} (type: {:?})",
            device.display(),
            target.display(),
            fstype
        );

        self.record_operation(Operation::Mount {
            device: device.to_path_buf(),
            target: target.to_path_buf(),
            fstype: fstype.map(String::from),
            options: options.options,
        })?;
        self.record_mount(target.to_path_buf());
        Ok(())
    }

    fn mount_pseudo(&self, fstype: &str, target: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!(
                "FAKE HAL DRY RUN: mount -t {} {}",
                fstype,
                target.display()
            );
            return Ok(());
        }
        log::info!("FAKE HAL: mount -t {} {}", fstype, target.display());
        self.record_operation(Operation::MountPseudo {
            fstype: fstype.to_string(),
            target: target.to_path_buf(),
        })?;
        self.record_mount(target.to_path_buf());
        Ok(())
    }

    fn bind_mount(
        &self,
        source: &Path,
        target: &Path,
        opts: BindOptions,
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "FAKE HAL DRY RUN: bind {} -> {}",
                source.display(),
                target.display()
            );
            return Ok(());
        }
        log::info!(
            "FAKE HAL: bind {} -> {} ({:?})",
            source.display(),
            target.display(),
            opts
        );
        self.record_operation(Operation::BindMount {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            recursive: opts.recursive,
            slave: opts.slave,
        })?;
        self.record_mount(target.to_path_buf());
        Ok(())
    }

    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: unmount {}", target.display());
            return Ok(());
        }

        log::info!("FAKE HAL: unmount {}", target.display());

        self.record_operation(Operation::Unmount {
            target: target.to_path_buf(),
        })?;
        self.record_unmount(target);
        Ok(())
    }

    fn unmount_recursive(&self, target: &Path, lazy: bool, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: unmount -R {}", target.display());
            return Ok(());
        }

        log::info!("FAKE HAL: unmount -R {} (lazy: {})", target.display(), lazy);

        self.record_operation(Operation::UnmountRecursive {
            target: target.to_path_buf(),
            lazy,
        })?;
        self.state()
            .mounted_paths
            .retain(|path| !path.starts_with(target));
        Ok(())
    }

    fn is_mounted(&self, path: &Path) -> HalResult<bool> {
        let is_mounted = self.state().mounted_paths.contains(path);
        log::info!("FAKE HAL: is_mounted({}) = {}", path.display(), is_mounted);
        Ok(is_mounted)
    }
}

impl BtrfsOps for FakeHal {
    fn btrfs_subvolume_create(&self, path: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!(
                "FAKE HAL DRY RUN: btrfs subvolume create {}",
                path.display()
            );
            return Ok(());
        }
        log::info!("FAKE HAL: btrfs subvolume create {}", path.display());
        self.record_operation(Operation::BtrfsSubvolumeCreate {
            path: path.to_path_buf(),
        })
    }
}

impl SwapOps for FakeHal {
    fn swapon(&self, device: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: swapon {}", device.display());
            return Ok(());
        }
        log::info!("FAKE HAL: swapon {}", device.display());
        self.record_operation(Operation::Swapon {
            device: device.to_path_buf(),
        })
    }

    fn swapoff(&self, device: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: swapoff {}", device.display());
            return Ok(());
        }
        log::info!("FAKE HAL: swapoff {}", device.display());
        self.record_operation(Operation::Swapoff {
            device: device.to_path_buf(),
        })
    }
}

impl FsOps for FakeHal {
    fn ensure_dir(&self, path: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: mkdir -p {}", path.display());
            return Ok(());
        }
        self.record_operation(Operation::EnsureDir {
            path: path.to_path_buf(),
        })?;
        self.record_file(path);
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8], dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: write {}", path.display());
            return Ok(());
        }
        log::info!("FAKE HAL: write {}", path.display());
        self.record_operation(Operation::WriteFile {
            path: path.to_path_buf(),
            contents: String::from_utf8_lossy(contents).into_owned(),
        })?;
        self.add_file_contents(path, contents.to_vec());
        Ok(())
    }

    fn copy_file(
        &self,
        src: &Path,
        dst: &Path,
        opts: &CopyOptions,
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "FAKE HAL DRY RUN: cp {} {}",
                src.display(),
                dst.display()
            );
            return Ok(());
        }
        log::info!("FAKE HAL: cp {} {}", src.display(), dst.display());
        self.record_operation(Operation::CopyFile {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            dereference: opts.dereference,
        })?;
        self.record_file(dst);
        Ok(())
    }

    fn open_read(&self, path: &Path) -> HalResult<Box<dyn Read + Send>> {
        let state = self.state();
        if !state.files.contains(path) {
            return Err(HalError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not present in fake filesystem", path.display()),
            )));
        }
        let contents = state.contents.get(path).cloned().unwrap_or_default();
        Ok(Box::new(Cursor::new(contents)))
    }

    fn exists(&self, path: &Path) -> bool {
        self.state().files.contains(path)
    }
}

impl ArchiveOps for FakeHal {
    fn extract_tar(
        &self,
        archive: &Path,
        dest: &Path,
        opts: &TarOptions,
        dry_run: bool,
    ) -> HalResult<()> {
        let args = tar_args(archive, dest, opts);
        if dry_run {
            log::info!("FAKE HAL DRY RUN: tar {}", args.join(" "));
            return Ok(());
        }
        log::info!("FAKE HAL: tar {}", args.join(" "));
        self.record_operation(Operation::ExtractTar {
            archive: archive.to_path_buf(),
            dest: dest.to_path_buf(),
            args,
        })
    }
}

impl FetchOps for FakeHal {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        _opts: &FetchOptions,
        dry_run: bool,
    ) -> HalResult<u64> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: GET {} -> {}", url, dest.display());
            return Ok(0);
        }
        log::info!("FAKE HAL: GET {} -> {}", url, dest.display());
        self.record_operation(Operation::Download {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        })?;
        self.record_file(dest);
        Ok(0)
    }
}

impl ChrootOps for FakeHal {
    fn run_in_chroot(
        &self,
        root: &Path,
        program: &str,
        args: &[String],
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "FAKE HAL DRY RUN: chroot {} {}",
                root.display(),
                program
            );
            return Ok(());
        }
        log::info!(
            "FAKE HAL: chroot {} {} {}",
            root.display(),
            program,
            args.join(" ")
        );
        self.record_operation(Operation::Chroot {
            root: root.to_path_buf(),
            program: program.to_string(),
            args: args.to_vec(),
        })
    }
}

impl DeviceOps for FakeHal {
    fn lsblk_disks(&self) -> HalResult<String> {
        self.record_operation(Operation::LsblkDisks)?;
        Ok(self.state().lsblk_output.clone())
    }
}

impl PrivilegeOps for FakeHal {
    fn effective_uid(&self) -> u32 {
        self.state().euid
    }

    fn relaunch_elevated(&self, program: &Path, args: &[OsString]) -> HalResult<Option<i32>> {
        log::info!("FAKE HAL: sudo {}", program.display());
        self.record_operation(Operation::RelaunchElevated {
            program: program.to_path_buf(),
            args: args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
        })?;
        Ok(self.state().relaunch_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_hal_records_mount() {
        let hal = FakeHal::new();
        let device = Path::new("/dev/sda3");
        let target = Path::new("/mnt/gentoo");

        hal.mount_device(
            device,
            target,
            Some("btrfs"),
            MountOptions::with_options("noatime,compress=zstd,subvol=@"),
            false,
        )
        .unwrap();

        assert_eq!(hal.operation_count(), 1);
        assert!(hal.has_operation(|op| matches!(
            op,
            Operation::Mount { options: Some(o), .. } if o == "noatime,compress=zstd,subvol=@"
        )));
        assert!(hal.is_mounted(target).unwrap());
    }

    #[test]
    fn fake_hal_records_unmount() {
        let hal = FakeHal::new();
        let target = Path::new("/mnt/gentoo");

        hal.mount_device(
            Path::new("/dev/sda3"),
            target,
            Some("btrfs"),
            MountOptions::new(),
            false,
        )
        .unwrap();
        hal.unmount(target, false).unwrap();

        assert_eq!(hal.labels(), vec!["mount", "unmount"]);
        assert!(!hal.is_mounted(target).unwrap());
    }

    #[test]
    fn recursive_unmount_clears_nested_mounts() {
        let hal = FakeHal::new();
        let root = Path::new("/mnt/gentoo");
        hal.mount_device(Path::new("/dev/sda3"), root, None, MountOptions::new(), false)
            .unwrap();
        hal.mount_pseudo("proc", &root.join("proc"), false).unwrap();
        hal.bind_mount(Path::new("/dev"), &root.join("dev"), BindOptions::rslave(), false)
            .unwrap();
        hal.mount_pseudo("proc", Path::new("/mnt/other"), false)
            .unwrap();

        hal.unmount_recursive(root, true, false).unwrap();

        assert_eq!(hal.mounted_paths(), vec![PathBuf::from("/mnt/other")]);
    }

    #[test]
    fn dry_run_records_nothing() {
        let hal = FakeHal::new();
        hal.wipefs_all(Path::new("/dev/sda"), true).unwrap();
        hal.format_btrfs(Path::new("/dev/sda3"), &FormatOptions::new(true))
            .unwrap();
        hal.download(
            "https://example.invalid/stage3.tar.xz",
            Path::new("/mnt/gentoo/stage3.tar.xz"),
            &FetchOptions::default(),
            true,
        )
        .unwrap();
        assert_eq!(hal.operation_count(), 0);
        assert!(!hal.exists(Path::new("/mnt/gentoo/stage3.tar.xz")));
    }

    #[test]
    fn injected_failure_is_recorded_then_returned() {
        let hal = FakeHal::new();
        hal.fail_when(|op| matches!(op, Operation::Swapon { .. }));

        let err = hal.swapon(Path::new("/dev/sda2"), false).unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(hal.labels(), vec!["swapon"]);

        hal.swapoff(Path::new("/dev/sda2"), false).unwrap();
    }

    #[test]
    fn failed_mount_is_not_marked_mounted() {
        let hal = FakeHal::new();
        hal.fail_when(|op| op.label() == "mount");
        let target = Path::new("/mnt/gentoo");
        assert!(hal
            .mount_device(Path::new("/dev/sda3"), target, None, MountOptions::new(), false)
            .is_err());
        assert!(!hal.is_mounted(target).unwrap());
    }

    #[test]
    fn download_makes_file_visible() {
        let hal = FakeHal::new();
        let dest = Path::new("/mnt/gentoo/stage3.tar.xz");
        assert!(!hal.exists(dest));
        hal.download(
            "https://example.invalid/stage3.tar.xz",
            dest,
            &FetchOptions::default(),
            false,
        )
        .unwrap();
        assert!(hal.exists(dest));
    }

    #[test]
    fn privilege_knobs() {
        let hal = FakeHal::new();
        assert_eq!(hal.effective_uid(), 0);
        hal.set_euid(1000);
        assert_eq!(hal.effective_uid(), 1000);

        hal.set_relaunch_code(Some(3));
        let code = hal
            .relaunch_elevated(Path::new("/usr/bin/stagehand"), &[OsString::from("--dry-run")])
            .unwrap();
        assert_eq!(code, Some(3));
        assert!(hal.has_operation(|op| matches!(
            op,
            Operation::RelaunchElevated { args, .. } if args == &["--dry-run".to_string()]
        )));
    }

    #[test]
    fn open_read_returns_stored_contents() {
        let hal = FakeHal::new();
        hal.add_file_contents("/mnt/gentoo/stage3.tar.xz", b"xz".to_vec());
        hal.write_file(Path::new("/mnt/gentoo/root/vars.sh"), b"DISK='/dev/sda'\n", false)
            .unwrap();

        let read = |path: &str| {
            let mut buf = Vec::new();
            hal.open_read(Path::new(path))
                .unwrap()
                .read_to_end(&mut buf)
                .unwrap();
            buf
        };
        assert_eq!(read("/mnt/gentoo/stage3.tar.xz"), b"xz");
        assert_eq!(read("/mnt/gentoo/root/vars.sh"), b"DISK='/dev/sda'\n");
        assert!(hal.open_read(Path::new("/mnt/gentoo/absent")).is_err());
    }
}

//! Linux HAL implementation using real system calls.

use super::{
    archive_ops::tar_args, partition_ops::sgdisk_args, ArchiveOps, BindOptions, BtrfsOps,
    ChrootOps, CopyOptions, DeviceOps, FetchOps, FetchOptions, FormatOps, FormatOptions, FsOps,
    MountOps, MountOptions, PartitionOps, PartitionSpec, PrivilegeOps, SwapOps, TarOptions,
};
use crate::procfs::mountinfo;
use crate::{HalError, HalResult};
use nix::mount::{MntFlags, MsFlags};
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Real HAL implementation for Linux systems.
#[derive(Debug, Clone, Default)]
pub struct LinuxHal;

impl LinuxHal {
    pub fn new() -> Self {
        Self
    }
}

const LSBLK_TIMEOUT: Duration = Duration::from_secs(10);
const WIPEFS_TIMEOUT: Duration = Duration::from_secs(60);
const SGDISK_TIMEOUT: Duration = Duration::from_secs(2 * 60);
const FORMAT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const BTRFS_TIMEOUT: Duration = Duration::from_secs(60);
const SWAP_TIMEOUT: Duration = Duration::from_secs(60);
const TAR_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);
// The chroot script builds a whole system from source.
const CHROOT_TIMEOUT: Duration = Duration::from_secs(72 * 60 * 60);
const RELAUNCH_TIMEOUT: Duration = Duration::from_secs(96 * 60 * 60);

const MOUNTINFO: &str = "/proc/self/mountinfo";

fn map_command_err(program: &str, err: io::Error) -> HalError {
    if err.kind() == io::ErrorKind::NotFound {
        return HalError::CommandNotFound(program.to_string());
    }
    HalError::Io(err)
}

fn output_failed(program: &str, output: &Output) -> HalError {
    HalError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn output_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<Output> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // Drain pipes concurrently to avoid deadlocks on large output.
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout.take() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr.take() {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let status = match child.wait_timeout(timeout).map_err(HalError::Io)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn status_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<()> {
    let output = output_with_timeout(program, cmd, timeout)?;
    if !output.status.success() {
        return Err(output_failed(program, &output));
    }
    Ok(())
}

/// Run with the terminal attached (interactive children) and a hard upper bound.
fn inherited_with_timeout(
    program: &str,
    cmd: &mut Command,
    timeout: Duration,
) -> HalResult<ExitStatus> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;
    match child.wait_timeout(timeout).map_err(HalError::Io)? {
        Some(status) => Ok(status),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}

fn map_nix_err(err: nix::errno::Errno) -> HalError {
    use nix::errno::Errno;
    match err {
        Errno::EBUSY => HalError::Busy,
        Errno::EACCES | Errno::EPERM => HalError::PermissionDenied,
        other => HalError::Nix(other),
    }
}

/// Split a `mount(8)` style option string into kernel flags and the
/// filesystem-specific data string handed to `mount(2)`.
fn split_mount_options(options: Option<&str>) -> (MsFlags, Option<String>) {
    let mut flags = MsFlags::empty();
    let mut data: Vec<&str> = Vec::new();
    for opt in options
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
    {
        match opt {
            "noatime" => flags |= MsFlags::MS_NOATIME,
            "relatime" => flags |= MsFlags::MS_RELATIME,
            "ro" => flags |= MsFlags::MS_RDONLY,
            "nosuid" => flags |= MsFlags::MS_NOSUID,
            "nodev" => flags |= MsFlags::MS_NODEV,
            "noexec" => flags |= MsFlags::MS_NOEXEC,
            "rw" | "defaults" => {}
            other => data.push(other),
        }
    }
    let data = if data.is_empty() {
        None
    } else {
        Some(data.join(","))
    };
    (flags, data)
}

fn read_mountinfo() -> HalResult<Vec<mountinfo::MountInfo>> {
    let content = fs::read_to_string(MOUNTINFO)?;
    Ok(mountinfo::parse_mountinfo(&content))
}

impl PartitionOps for LinuxHal {
    fn wipefs_all(&self, disk: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: wipefs -a {}", disk.display());
            return Ok(());
        }
        let mut cmd = Command::new("wipefs");
        cmd.arg("-a").arg(disk);
        status_with_timeout("wipefs", &mut cmd, WIPEFS_TIMEOUT)
    }

    fn sgdisk_gpt(&self, disk: &Path, layout: &[PartitionSpec], dry_run: bool) -> HalResult<()> {
        let args = sgdisk_args(disk, layout);
        if dry_run {
            log::info!("DRY RUN: sgdisk {}", args.join(" "));
            return Ok(());
        }
        let mut cmd = Command::new("sgdisk");
        cmd.args(&args);
        status_with_timeout("sgdisk", &mut cmd, SGDISK_TIMEOUT)
    }
}

impl FormatOps for LinuxHal {
    fn format_vfat(&self, device: &Path, label: &str, opts: &FormatOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: mkfs.vfat {} ({})", device.display(), label);
            return Ok(());
        }

        let mut args: Vec<String> = vec!["-F".to_string(), "32".to_string()];
        args.push("-n".to_string());
        args.push(label.to_string());
        args.extend(opts.extra_args.iter().cloned());
        args.push(device.display().to_string());

        let mut cmd = Command::new("mkfs.vfat");
        cmd.args(&args);
        status_with_timeout("mkfs.vfat", &mut cmd, FORMAT_TIMEOUT)
    }

    fn format_swap(&self, device: &Path, opts: &FormatOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: mkswap {}", device.display());
            return Ok(());
        }

        let mut cmd = Command::new("mkswap");
        cmd.args(&opts.extra_args).arg(device);
        status_with_timeout("mkswap", &mut cmd, FORMAT_TIMEOUT)
    }

    fn format_btrfs(&self, device: &Path, opts: &FormatOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!(
                "DRY RUN: mkfs.btrfs {} {}",
                opts.extra_args.join(" "),
                device.display()
            );
            return Ok(());
        }

        let mut cmd = Command::new("mkfs.btrfs");
        cmd.args(&opts.extra_args).arg(device);
        status_with_timeout("mkfs.btrfs", &mut cmd, FORMAT_TIMEOUT)
    }
}

impl MountOps for LinuxHal {
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
                "DRY RUN: mount {} -> {} ({})",
                device.display(),
                target.display(),
                options.options.as_deref().unwrap_or("defaults")
            );
            return Ok(());
        }

        let (flags, data) = split_mount_options(options.options.as_deref());
        nix::mount::mount(Some(device), target, fstype, flags, data.as_deref())
            .map_err(map_nix_err)?;
        Ok(())
    }

    fn mount_pseudo(&self, fstype: &str, target: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: mount -t {} {} {}", fstype, fstype, target.display());
            return Ok(());
        }

        nix::mount::mount(
            Some(fstype),
            target,
            Some(fstype),
            MsFlags::empty(),
            None::<&str>,
        )
        .map_err(map_nix_err)?;
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
                "DRY RUN: mount {} {} {}",
                if opts.recursive { "--rbind" } else { "--bind" },
                source.display(),
                target.display()
            );
            return Ok(());
        }

        let mut flags = MsFlags::MS_BIND;
        if opts.recursive {
            flags |= MsFlags::MS_REC;
        }
        nix::mount::mount(Some(source), target, None::<&str>, flags, None::<&str>)
            .map_err(map_nix_err)?;

        if opts.slave {
            nix::mount::mount(
                None::<&str>,
                target,
                None::<&str>,
                MsFlags::MS_SLAVE | MsFlags::MS_REC,
                None::<&str>,
            )
            .map_err(map_nix_err)?;
        }
        Ok(())
    }

    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: umount {}", target.display());
            return Ok(());
        }

        nix::mount::umount2(target, MntFlags::empty()).map_err(map_nix_err)?;
        Ok(())
    }

    fn unmount_recursive(&self, target: &Path, lazy: bool, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!(
                "DRY RUN: umount -R{} {}",
                if lazy { "l" } else { "" },
                target.display()
            );
            return Ok(());
        }

        let flags = if lazy {
            MntFlags::MNT_DETACH
        } else {
            MntFlags::empty()
        };

        let mut first_err = None;
        for mp in mountinfo::mounts_under(target, &read_mountinfo()?) {
            match nix::mount::umount2(&mp, flags) {
                Ok(()) => log::debug!("unmounted {}", mp.display()),
                // Already gone: a lazy detach of a parent takes its children with it.
                Err(nix::errno::Errno::EINVAL) | Err(nix::errno::Errno::ENOENT) => {}
                Err(err) => {
                    log::warn!("umount {} failed: {}", mp.display(), err);
                    first_err.get_or_insert(map_nix_err(err));
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn is_mounted(&self, path: &Path) -> HalResult<bool> {
        Ok(mountinfo::is_mounted_from_info(path, &read_mountinfo()?))
    }
}

impl BtrfsOps for LinuxHal {
    fn btrfs_subvolume_create(&self, path: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: btrfs subvolume create {}", path.display());
            return Ok(());
        }
        let mut cmd = Command::new("btrfs");
        cmd.args(["subvolume", "create"]).arg(path);
        status_with_timeout("btrfs", &mut cmd, BTRFS_TIMEOUT)
    }
}

impl SwapOps for LinuxHal {
    fn swapon(&self, device: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: swapon {}", device.display());
            return Ok(());
        }
        let mut cmd = Command::new("swapon");
        cmd.arg(device);
        status_with_timeout("swapon", &mut cmd, SWAP_TIMEOUT)
    }

    fn swapoff(&self, device: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: swapoff {}", device.display());
            return Ok(());
        }
        let mut cmd = Command::new("swapoff");
        cmd.arg(device);
        status_with_timeout("swapoff", &mut cmd, SWAP_TIMEOUT)
    }
}

impl FsOps for LinuxHal {
    fn ensure_dir(&self, path: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: mkdir -p {}", path.display());
            return Ok(());
        }
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8], dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: write {} ({} bytes)", path.display(), contents.len());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
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
                "DRY RUN: cp{} {} {}",
                if opts.dereference { " -L" } else { "" },
                src.display(),
                dst.display()
            );
            return Ok(());
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }

        let meta = fs::symlink_metadata(src)?;
        if meta.file_type().is_symlink() && !opts.dereference {
            return Err(HalError::SymlinkSource(src.to_path_buf()));
        }

        // fs::copy follows symlinks on the source side.
        fs::copy(src, dst)?;
        Ok(())
    }

    fn open_read(&self, path: &Path) -> HalResult<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl ArchiveOps for LinuxHal {
    fn extract_tar(
        &self,
        archive: &Path,
        dest: &Path,
        opts: &TarOptions,
        dry_run: bool,
    ) -> HalResult<()> {
        let args = tar_args(archive, dest, opts);
        if dry_run {
            log::info!("DRY RUN: tar {}", args.join(" "));
            return Ok(());
        }
        let mut cmd = Command::new("tar");
        cmd.args(&args);
        status_with_timeout("tar", &mut cmd, TAR_TIMEOUT)
    }
}

impl FetchOps for LinuxHal {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        opts: &FetchOptions,
        dry_run: bool,
    ) -> HalResult<u64> {
        if dry_run {
            log::info!("DRY RUN: GET {} -> {}", url, dest.display());
            return Ok(0);
        }

        let download_err = |reason: String| HalError::Download {
            url: url.to_string(),
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(opts.timeout)
            .user_agent(opts.user_agent.clone())
            .build()
            .map_err(|e| download_err(e.to_string()))?;

        let mut response = client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }

        let mut file = fs::File::create(dest)?;
        let written = response
            .copy_to(&mut file)
            .map_err(|e| download_err(e.to_string()))?;
        file.sync_all().ok();
        Ok(written)
    }
}

impl ChrootOps for LinuxHal {
    fn run_in_chroot(
        &self,
        root: &Path,
        program: &str,
        args: &[String],
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "DRY RUN: chroot {} {} {}",
                root.display(),
                program,
                args.join(" ")
            );
            return Ok(());
        }

        let mut cmd = Command::new("chroot");
        cmd.arg(root).arg(program).args(args);
        let status = inherited_with_timeout("chroot", &mut cmd, CHROOT_TIMEOUT)?;
        if !status.success() {
            return Err(HalError::CommandFailed {
                program: "chroot".to_string(),
                code: status.code(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

impl DeviceOps for LinuxHal {
    fn lsblk_disks(&self) -> HalResult<String> {
        let mut cmd = Command::new("lsblk");
        cmd.args(["-d", "-p", "-o", "NAME,SIZE,TYPE,MODEL"]);
        let output = output_with_timeout("lsblk", &mut cmd, LSBLK_TIMEOUT)?;

        if !output.status.success() {
            return Err(output_failed("lsblk", &output));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl PrivilegeOps for LinuxHal {
    fn effective_uid(&self) -> u32 {
        nix::unistd::geteuid().as_raw()
    }

    fn relaunch_elevated(&self, program: &Path, args: &[OsString]) -> HalResult<Option<i32>> {
        log::info!("re-running {} through sudo", program.display());
        let mut cmd = Command::new("sudo");
        cmd.arg(program).args(args);
        let status = inherited_with_timeout("sudo", &mut cmd, RELAUNCH_TIMEOUT)?;
        Ok(status.code())
    }
}

use crate::style::emoji;
use anyhow::{anyhow, bail, Context, Result};
use stagehand_hal::procfs::mountinfo;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// External tools the install shells out to.
pub const REQUIRED_BINARIES: [&str; 11] = [
    "wipefs",
    "sgdisk",
    "mkfs.vfat",
    "mkswap",
    "mkfs.btrfs",
    "btrfs",
    "swapon",
    "swapoff",
    "tar",
    "chroot",
    "sudo",
];

#[derive(Debug, Clone)]
pub struct PreflightConfig {
    pub disk: Option<PathBuf>,
    pub required_binaries: Vec<String>,
    /// Host files the install copies later; checked up front so a typo does
    /// not surface after the disk has been wiped.
    pub required_files: Vec<PathBuf>,
    /// Sources copied without following links; a symlink here would dangle
    /// inside the new root.
    pub no_symlink_files: Vec<PathBuf>,
    pub mountinfo_path: PathBuf,
    pub sys_block_dir: PathBuf,
    pub path_env: String,
    pub require_dev_prefix: bool,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        let path_env = std::env::var("PATH").unwrap_or_default();
        Self {
            disk: None,
            required_binaries: REQUIRED_BINARIES.iter().map(|b| b.to_string()).collect(),
            required_files: Vec::new(),
            no_symlink_files: Vec::new(),
            mountinfo_path: PathBuf::from("/proc/self/mountinfo"),
            sys_block_dir: PathBuf::from("/sys/class/block"),
            path_env,
            require_dev_prefix: true,
        }
    }
}

pub fn run(cfg: &PreflightConfig) -> Result<()> {
    log::info!("{} Preflight checks", emoji::SEARCH);

    check_binaries(cfg)?;
    check_files(cfg)?;

    if let Some(disk) = cfg.disk.as_ref() {
        check_disk(cfg, disk)?;
    }

    log::info!("{} Preflight complete", emoji::SUCCESS);
    Ok(())
}

fn check_binaries(cfg: &PreflightConfig) -> Result<()> {
    let missing: Vec<&str> = cfg
        .required_binaries
        .iter()
        .filter(|bin| find_executable_in_path(bin, &cfg.path_env).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        bail!("Missing required binaries on PATH: {}", missing.join(", "));
    }
    Ok(())
}

fn check_files(cfg: &PreflightConfig) -> Result<()> {
    let missing: Vec<String> = cfg
        .required_files
        .iter()
        .filter(|path| !path.exists())
        .map(|path| path.display().to_string())
        .collect();
    if !missing.is_empty() {
        bail!("Missing install files: {}", missing.join(", "));
    }

    let linked: Vec<String> = cfg
        .no_symlink_files
        .iter()
        .filter(|path| {
            fs::symlink_metadata(path)
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false)
        })
        .map(|path| path.display().to_string())
        .collect();
    if !linked.is_empty() {
        bail!("Install files must not be symlinks: {}", linked.join(", "));
    }
    Ok(())
}

fn check_disk(cfg: &PreflightConfig, disk: &Path) -> Result<()> {
    if cfg.require_dev_prefix && !disk.starts_with("/dev/") {
        bail!("Disk path must be under /dev: {}", disk.display());
    }
    if !disk.exists() {
        bail!("Disk path does not exist: {}", disk.display());
    }

    // by-id and by-path links resolve to the kernel name mountinfo reports.
    let resolved = fs::canonicalize(disk)
        .with_context(|| format!("Unable to resolve {}", disk.display()))?;

    if !is_block_device(&resolved, &cfg.sys_block_dir)? {
        bail!("Disk path is not a block device: {}", disk.display());
    }

    let contents = fs::read_to_string(&cfg.mountinfo_path)
        .with_context(|| format!("Unable to read {}", cfg.mountinfo_path.display()))?;
    let entries = mountinfo::parse_mountinfo(&contents);
    let mut mounts = mountinfo::mounted_under_device(&entries, &resolved);
    if resolved.as_path() != disk {
        mounts.extend(mountinfo::mounted_under_device(&entries, disk));
        mounts.sort();
        mounts.dedup();
    }
    if !mounts.is_empty() {
        let list: Vec<String> = mounts.iter().map(|m| m.display().to_string()).collect();
        bail!(
            "Disk appears mounted: {} (at {})",
            disk.display(),
            list.join(", ")
        );
    }

    Ok(())
}

pub fn find_executable_in_path(binary: &str, path_env: &str) -> Option<PathBuf> {
    for dir in path_env.split(':').filter(|dir| !dir.is_empty()) {
        let candidate = Path::new(dir).join(binary);
        if let Ok(metadata) = fs::metadata(&candidate) {
            if metadata.is_file() && metadata.permissions().mode() & 0o111 != 0 {
                return Some(candidate);
            }
        }
    }
    None
}

fn is_block_device(resolved: &Path, sys_block_dir: &Path) -> Result<bool> {
    let name = resolved
        .file_name()
        .and_then(|value| value.to_str())
        .ok_or_else(|| anyhow!("Unable to resolve disk device name"))?;
    Ok(sys_block_dir.join(name).join("size").exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn create_exec(path: &Path) {
        write_file(path, "#!/bin/true");
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).unwrap();
    }

    fn base_config(tmp: &Path) -> PreflightConfig {
        let mountinfo = tmp.join("proc/self/mountinfo");
        write_file(&mountinfo, "29 0 8:1 / / rw,relatime - ext4 /dev/root rw\n");

        let sys_block = tmp.join("sys/class/block");
        write_file(&sys_block.join("sda/size"), "20971520\n");

        let bin_dir = tmp.join("bin");
        for bin in REQUIRED_BINARIES {
            create_exec(&bin_dir.join(bin));
        }

        let dev_path = tmp.join("dev/sda");
        write_file(&dev_path, "");

        let script = tmp.join("files/chroot.sh");
        write_file(&script, "#!/bin/bash\n");

        PreflightConfig {
            disk: Some(dev_path),
            required_binaries: REQUIRED_BINARIES.iter().map(|b| b.to_string()).collect(),
            required_files: vec![script.clone()],
            no_symlink_files: vec![script],
            mountinfo_path: mountinfo,
            sys_block_dir: sys_block,
            path_env: bin_dir.to_string_lossy().to_string(),
            require_dev_prefix: false,
        }
    }

    #[test]
    fn passes_with_valid_inputs() {
        let tmp = tempdir().unwrap();
        run(&base_config(tmp.path())).unwrap();
    }

    #[test]
    fn fails_on_missing_binary() {
        let tmp = tempdir().unwrap();
        let mut cfg = base_config(tmp.path());
        fs::remove_file(tmp.path().join("bin/sgdisk")).unwrap();
        cfg.required_binaries.push("missing".to_string());

        let err = run(&cfg).unwrap_err().to_string();
        assert!(err.contains("Missing required binaries"), "{err}");
        assert!(err.contains("sgdisk") && err.contains("missing"), "{err}");
    }

    #[test]
    fn non_executable_does_not_count() {
        let tmp = tempdir().unwrap();
        let cfg = base_config(tmp.path());
        let tar = tmp.path().join("bin/tar");
        let mut perms = fs::metadata(&tar).unwrap().permissions();
        perms.set_mode(0o644);
        fs::set_permissions(&tar, perms).unwrap();

        assert!(find_executable_in_path("tar", &cfg.path_env).is_none());
        assert!(run(&cfg).is_err());
    }

    #[test]
    fn fails_on_missing_install_file() {
        let tmp = tempdir().unwrap();
        let mut cfg = base_config(tmp.path());
        cfg.required_files.push(tmp.path().join("files/hosts"));
        let err = run(&cfg).unwrap_err().to_string();
        assert!(err.contains("files/hosts"), "{err}");
    }

    #[test]
    fn fails_on_symlinked_install_file() {
        let tmp = tempdir().unwrap();
        let mut cfg = base_config(tmp.path());
        let real = tmp.path().join("elsewhere/hosts");
        write_file(&real, "127.0.0.1 localhost\n");
        let link = tmp.path().join("files/hosts");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        cfg.required_files.push(link.clone());
        cfg.no_symlink_files.push(link);

        let err = run(&cfg).unwrap_err().to_string();
        assert!(err.contains("must not be symlinks"), "{err}");
        assert!(err.contains("files/hosts"), "{err}");
    }

    #[test]
    fn symlinks_allowed_outside_plain_copies() {
        let tmp = tempdir().unwrap();
        let mut cfg = base_config(tmp.path());
        let real = tmp.path().join("run/resolv.conf");
        write_file(&real, "nameserver 1.1.1.1\n");
        let link = tmp.path().join("etc/resolv.conf");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();
        cfg.required_files.push(link);

        run(&cfg).unwrap();
    }

    #[test]
    fn fails_outside_dev() {
        let tmp = tempdir().unwrap();
        let mut cfg = base_config(tmp.path());
        cfg.require_dev_prefix = true;
        let err = run(&cfg).unwrap_err().to_string();
        assert!(err.contains("must be under /dev"), "{err}");
    }

    #[test]
    fn fails_on_non_block_device() {
        let tmp = tempdir().unwrap();
        let mut cfg = base_config(tmp.path());
        let other = tmp.path().join("dev/loopy");
        write_file(&other, "");
        cfg.disk = Some(other);
        let err = run(&cfg).unwrap_err().to_string();
        assert!(err.contains("not a block device"), "{err}");
    }

    fn mount_partition_at_boot(tmp: &Path, cfg: &PreflightConfig, partition: &str) {
        let dev_dir = fs::canonicalize(tmp.join("dev")).unwrap();
        let source = format!(
            "29 0 8:1 / /boot rw,relatime - vfat {}/{} rw\n",
            dev_dir.display(),
            partition
        );
        write_file(&cfg.mountinfo_path, &source);
    }

    #[test]
    fn fails_on_mounted_disk() {
        let tmp = tempdir().unwrap();
        let cfg = base_config(tmp.path());
        mount_partition_at_boot(tmp.path(), &cfg, "sda1");

        let err = run(&cfg).unwrap_err().to_string();
        assert!(err.contains("Disk appears mounted"), "{err}");
        assert!(err.contains("/boot"), "{err}");
    }

    #[test]
    fn symlinked_disk_path_still_detects_mounts() {
        let tmp = tempdir().unwrap();
        let mut cfg = base_config(tmp.path());
        let by_id = tmp.path().join("dev/disk/by-id/ata-SAMSUNG_SSD");
        fs::create_dir_all(by_id.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("dev/sda"), &by_id).unwrap();
        cfg.disk = Some(by_id);
        mount_partition_at_boot(tmp.path(), &cfg, "sda1");

        let err = run(&cfg).unwrap_err().to_string();
        assert!(err.contains("Disk appears mounted"), "{err}");
        assert!(err.contains("ata-SAMSUNG_SSD"), "{err}");
    }

    #[test]
    fn similarly_named_disk_does_not_count_as_mounted() {
        let tmp = tempdir().unwrap();
        let cfg = base_config(tmp.path());
        mount_partition_at_boot(tmp.path(), &cfg, "sdaa1");

        run(&cfg).unwrap();
    }

    #[test]
    fn skips_disk_checks_without_disk() {
        let tmp = tempdir().unwrap();
        let mut cfg = base_config(tmp.path());
        cfg.disk = None;
        cfg.sys_block_dir = tmp.path().join("nowhere");
        run(&cfg).unwrap();
    }
}

use crate::errors::{InstallError, InstallResult};
use crate::style::emoji;
use stagehand_hal::{BindOptions, CopyOptions, FsOps, MountOps};
use std::path::{Path, PathBuf};

/// Shell fragment the chroot script sources for installer-derived values.
pub const VARS_FILE: &str = "/root/stagehand-vars.sh";

/// Host interfaces bound into the tree, in order.
const BIND_SOURCES: [&str; 3] = ["/dev", "/sys", "/run"];

/// One host file copied into the target tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCopySpec {
    pub source: PathBuf,
    /// Absolute path inside the new system (e.g. `/etc/hosts`).
    pub target: PathBuf,
    /// Copy what a symlinked source points at rather than the link.
    pub dereference: bool,
}

impl FileCopySpec {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            dereference: false,
        }
    }

    pub fn dereferenced(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            dereference: true,
            ..Self::new(source, target)
        }
    }
}

/// The standard set of files: portage and host configuration from
/// `files_dir`, the host resolver config, and the chroot script itself.
pub fn default_copy_specs(
    files_dir: &Path,
    resolv_conf: &Path,
    chroot_script: &str,
) -> Vec<FileCopySpec> {
    vec![
        FileCopySpec::new(
            files_dir.join("package.use"),
            "/etc/portage/package.use/stagehand",
        ),
        FileCopySpec::new(files_dir.join("hosts"), "/etc/hosts"),
        FileCopySpec::new(files_dir.join("locale.gen"), "/etc/locale.gen"),
        // Often a symlink into /run on the host, which is meaningless in the tree.
        FileCopySpec::dereferenced(resolv_conf, "/etc/resolv.conf"),
        FileCopySpec::new(files_dir.join("make.conf"), "/etc/portage/make.conf"),
        FileCopySpec::new(
            files_dir.join(chroot_script),
            format!("/root/{}", chroot_script),
        ),
    ]
}

/// Map an absolute path inside the new system onto the mounted tree.
pub fn within(root: &Path, path: &Path) -> PathBuf {
    root.join(path.strip_prefix("/").unwrap_or(path))
}

/// Quote `value` for POSIX shells: `it's` becomes `'it'\''s'`.
pub fn shell_single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn vars_file_contents(disk: &Path) -> String {
    format!("DISK={}\n", shell_single_quote(&disk.to_string_lossy()))
}

/// Write the vars file, copy every file, then mount proc and bind the host's
/// dev, sys and run trees (recursive, slave). Stops at the first failure.
pub fn prepare_chroot<H>(
    hal: &H,
    disk: &Path,
    mount_point: &Path,
    copies: &[FileCopySpec],
    dry_run: bool,
) -> InstallResult<()>
where
    H: FsOps + MountOps + ?Sized,
{
    log::info!("{} Preparing chroot at {}", emoji::ACTION, mount_point.display());

    let vars = within(mount_point, Path::new(VARS_FILE));
    hal.write_file(&vars, vars_file_contents(disk).as_bytes(), dry_run)
        .map_err(InstallError::command(format!("write {}", vars.display())))?;

    for spec in copies {
        let dst = within(mount_point, &spec.target);
        let opts = CopyOptions {
            dereference: spec.dereference,
        };
        hal.copy_file(&spec.source, &dst, &opts, dry_run)
            .map_err(InstallError::command(format!(
                "copy {} to {}",
                spec.source.display(),
                dst.display()
            )))?;
    }

    let proc_target = mount_point.join("proc");
    hal.mount_pseudo("proc", &proc_target, dry_run)
        .map_err(InstallError::command(format!(
            "mount proc at {}",
            proc_target.display()
        )))?;

    for source in BIND_SOURCES {
        let target = within(mount_point, Path::new(source));
        hal.bind_mount(Path::new(source), &target, BindOptions::rslave(), dry_run)
            .map_err(InstallError::command(format!(
                "bind {} at {}",
                source,
                target.display()
            )))?;
    }

    Ok(())
}

//! Install profile loading.
//!
//! The profile keys live at the top level of the TOML file:
//!
//! ```toml
//! disk = "/dev/sda"
//! hostname = "gentoo"
//! username = "alice"
//! desktop = "gnome"
//! usergroups = ["wheel", "audio", "video"]
//!
//! [packages]
//! system = ["app-admin/sudo"]
//! gnome = ["gnome-base/gnome-light"]
//! apps = ["www-client/firefox-bin"]
//! fonts = ["media-fonts/noto"]
//!
//! [installer]   # optional
//! stage3_url = "https://..."
//! ```
//!
//! Every failure names the key at fault and no partial profile is returned.

use crate::errors::{InstallError, InstallResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

pub const DEFAULT_STAGE3_URL: &str = "https://distfiles.gentoo.org/releases/amd64/autobuilds/current-stage3-amd64-desktop-systemd/stage3-amd64-desktop-systemd.tar.xz";

/// Package groups that are always installed, around the desktop's own list.
const FIXED_PACKAGE_GROUPS: [&str; 3] = ["system", "apps", "fonts"];

/// Everything the install needs to know about the target system.
///
/// Built once by [`load`] and passed by reference afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallProfile {
    pub disk: PathBuf,
    pub hostname: String,
    pub username: String,
    pub desktop: String,
    pub groups: Vec<String>,
    /// `packages.system ++ packages.<desktop> ++ packages.apps ++ packages.fonts`
    pub packages: Vec<String>,
}

impl InstallProfile {
    /// Positional arguments for the chroot script:
    /// hostname, username, desktop, each group, then each package.
    pub fn handoff_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(3 + self.groups.len() + self.packages.len());
        args.push(self.hostname.clone());
        args.push(self.username.clone());
        args.push(self.desktop.clone());
        args.extend(self.groups.iter().cloned());
        args.extend(self.packages.iter().cloned());
        args
    }

    /// Same profile aimed at a different disk.
    pub fn with_disk(&self, disk: impl Into<PathBuf>) -> Self {
        Self {
            disk: disk.into(),
            ..self.clone()
        }
    }
}

/// Optional `[installer]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerSettings {
    pub stage3_url: String,
    /// Hex SHA-256 of the archive; verified after download when set.
    pub stage3_sha256: Option<String>,
    pub mount_point: PathBuf,
    /// Directory holding the files copied into the new system.
    pub files_dir: PathBuf,
    /// File name of the chroot script inside `files_dir`.
    pub chroot_script: String,
    pub resolv_conf: PathBuf,
    pub download_timeout_secs: u64,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            stage3_url: DEFAULT_STAGE3_URL.to_string(),
            stage3_sha256: None,
            mount_point: PathBuf::from("/mnt/gentoo"),
            files_dir: PathBuf::from("files"),
            chroot_script: "chroot.sh".to_string(),
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
            download_timeout_secs: 3600,
        }
    }
}

impl InstallerSettings {
    fn validate(&self) -> InstallResult<()> {
        let url = url::Url::parse(&self.stage3_url)
            .map_err(|e| InstallError::config("installer.stage3_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(InstallError::config(
                "installer.stage3_url",
                format!("unsupported scheme '{}', expected http or https", url.scheme()),
            ));
        }

        if let Some(sum) = &self.stage3_sha256 {
            if sum.len() != 64 || !sum.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(InstallError::config(
                    "installer.stage3_sha256",
                    "expected 64 hex characters",
                ));
            }
        }

        if !self.mount_point.is_absolute() {
            return Err(InstallError::config(
                "installer.mount_point",
                "must be an absolute path",
            ));
        }

        if self.chroot_script.is_empty() || self.chroot_script.contains('/') {
            return Err(InstallError::config(
                "installer.chroot_script",
                "must be a plain file name",
            ));
        }

        if self.download_timeout_secs == 0 {
            return Err(InstallError::config(
                "installer.download_timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// A fully validated config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub profile: InstallProfile,
    pub settings: InstallerSettings,
}

/// Read and validate the config file at `path`.
pub fn load(path: &Path) -> InstallResult<LoadedConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        InstallError::config("config", format!("cannot read {}: {}", path.display(), e))
    })?;
    parse(&content)
}

/// Read only the install profile from `path`.
pub fn load_profile(path: &Path) -> InstallResult<InstallProfile> {
    load(path).map(|cfg| cfg.profile)
}

pub fn parse(content: &str) -> InstallResult<LoadedConfig> {
    let table: Table = content
        .parse()
        .map_err(|e: toml::de::Error| InstallError::config("config", e.message().to_string()))?;

    let disk = require_str(&table, "disk", "disk")?;
    let hostname = require_str(&table, "hostname", "hostname")?;
    let username = require_str(&table, "username", "username")?;
    let desktop = require_str(&table, "desktop", "desktop")?;
    let groups = require_list(&table, "usergroups", "usergroups")?;

    if FIXED_PACKAGE_GROUPS.contains(&desktop.as_str()) {
        return Err(InstallError::config(
            "desktop",
            format!("'{}' names a fixed package group, not a desktop", desktop),
        ));
    }

    let packages_table = match table.get("packages") {
        Some(Value::Table(t)) => t,
        Some(other) => {
            return Err(InstallError::config(
                "packages",
                format!("expected a table, found {}", other.type_str()),
            ))
        }
        None => return Err(InstallError::config("packages", "missing")),
    };

    let system = require_list(packages_table, "system", "packages.system")?;
    let apps = require_list(packages_table, "apps", "packages.apps")?;
    let fonts = require_list(packages_table, "fonts", "packages.fonts")?;
    let desktop_key = format!("packages.{}", desktop);
    if !packages_table.contains_key(&desktop) {
        return Err(InstallError::config(
            desktop_key,
            format!("desktop '{}' has no package list", desktop),
        ));
    }
    let desktop_packages = require_list(packages_table, &desktop, &desktop_key)?;

    let mut packages =
        Vec::with_capacity(system.len() + desktop_packages.len() + apps.len() + fonts.len());
    packages.extend(system);
    packages.extend(desktop_packages);
    packages.extend(apps);
    packages.extend(fonts);

    let settings = match table.get("installer") {
        Some(value) => value
            .clone()
            .try_into::<InstallerSettings>()
            .map_err(|e| InstallError::config("installer", e.message().to_string()))?,
        None => InstallerSettings::default(),
    };
    settings.validate()?;

    Ok(LoadedConfig {
        profile: InstallProfile {
            disk: PathBuf::from(disk),
            hostname,
            username,
            desktop,
            groups,
            packages,
        },
        settings,
    })
}

fn require_str(table: &Table, key: &str, name: &str) -> InstallResult<String> {
    match table.get(key) {
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(InstallError::config(name, "must not be empty"))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(InstallError::config(
            name,
            format!("expected a string, found {}", other.type_str()),
        )),
        None => Err(InstallError::config(name, "missing")),
    }
}

fn require_list(table: &Table, key: &str, name: &str) -> InstallResult<Vec<String>> {
    let items = match table.get(key) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(InstallError::config(
                name,
                format!("expected a list, found {}", other.type_str()),
            ))
        }
        None => return Err(InstallError::config(name, "missing")),
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(InstallError::config(
                format!("{}[{}]", name, idx),
                format!("expected a string, found {}", other.type_str()),
            )),
        })
        .collect()
}

//! CLI argument parsing for stagehand.
//!
//! Every flag is optional; a bare `stagehand` reads `config.toml` from the
//! working directory and installs.

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_LOCK_FILE: &str = "/run/stagehand.lock";

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "stagehand")]
#[command(about = "🧱 stagehand - provision a Gentoo system onto a single disk")]
#[command(version)]
pub struct Cli {
    /// Install profile (TOML)
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Log every step without touching the system
    #[arg(long)]
    pub dry_run: bool,

    /// List disks and pick the target interactively (overrides `disk`)
    #[arg(long)]
    pub select_disk: bool,

    /// Write logs here instead of /var/log/stagehand/install.log
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Lock file guarding against concurrent installs
    #[arg(long, default_value = DEFAULT_LOCK_FILE)]
    pub lock_file: PathBuf,

    /// Skip the host checks (binaries on PATH, target disk sanity)
    #[arg(long)]
    pub skip_preflight: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_uses_defaults() {
        let cli = Cli::try_parse_from(["stagehand"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(cli.lock_file, PathBuf::from(DEFAULT_LOCK_FILE));
        assert!(!cli.dry_run);
        assert!(!cli.select_disk);
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "stagehand",
            "--config",
            "/etc/stagehand/box.toml",
            "--dry-run",
            "--select-disk",
            "--log-file",
            "/tmp/install.log",
            "--skip-preflight",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/stagehand/box.toml"));
        assert!(cli.dry_run && cli.select_disk && cli.skip_preflight);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/install.log")));
    }
}

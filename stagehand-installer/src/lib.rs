use anyhow::Context;
use clap::Parser;
use stagehand_core::chroot::default_copy_specs;
use stagehand_core::cli::Cli;
use stagehand_core::lock::InstallLock;
use stagehand_core::preflight::{self, PreflightConfig};
use stagehand_core::privilege::{self, Elevation};
use stagehand_core::style::{self, emoji};
use stagehand_core::{config, logging, select};
use stagehand_hal::{DeviceOps, InstallHal, LinuxHal, PrivilegeOps};
use stagehand_workflow::pipeline;
use std::io::{self, BufRead, Write};

/// Parse the command line, set up logging and install with the real HAL.
/// Returns the process exit code.
pub fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref());

    let hal = LinuxHal::new();
    let stdin = io::stdin();
    execute(&cli, &hal, &mut stdin.lock(), &mut io::stdout())
}

/// Everything after argument parsing: privilege guard, lock, profile,
/// optional disk prompt, preflight, then the install pipeline.
pub fn execute<H>(
    cli: &Cli,
    hal: &H,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> anyhow::Result<i32>
where
    H: InstallHal + PrivilegeOps + DeviceOps,
{
    if let Elevation::Relaunched(code) = privilege::ensure_elevated(hal, cli.dry_run)? {
        log::info!("elevated run exited with {}", code);
        return Ok(code);
    }

    let _lock = if cli.dry_run {
        None
    } else {
        let lock = InstallLock::acquire(&cli.lock_file)?;
        log::info!("{} holding {}", emoji::LOCK, lock.path().display());
        Some(lock)
    };

    let loaded = config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let settings = loaded.settings;
    let profile = if cli.select_disk {
        let disk = select::select_disk(hal, input, output)?;
        loaded.profile.with_disk(disk)
    } else {
        loaded.profile
    };

    if cli.skip_preflight {
        log::warn!("preflight checks skipped");
    } else {
        let copies =
            default_copy_specs(&settings.files_dir, &settings.resolv_conf, &settings.chroot_script);
        let no_symlink_files = copies
            .iter()
            .filter(|copy| !copy.dereference)
            .map(|copy| copy.source.clone())
            .collect();
        let cfg = PreflightConfig {
            disk: Some(profile.disk.clone()),
            required_files: copies.into_iter().map(|copy| copy.source).collect(),
            no_symlink_files,
            ..PreflightConfig::default()
        };
        preflight::run(&cfg)?;
    }

    style::info(&format!(
        "Installing {} ({}) onto {}",
        profile.hostname,
        profile.desktop,
        profile.disk.display()
    ));

    let state = pipeline::run(hal, &profile, &settings, cli.dry_run)?;
    for (stage, message) in &state.warnings {
        style::warning(&format!("{}: {}", stage, message));
    }

    if cli.dry_run {
        style::success(&format!(
            "Dry run complete: {} stages, nothing was changed",
            state.completed_stages.len()
        ));
    } else {
        style::success(&format!("Install complete {}", emoji::PARTY));
    }
    Ok(0)
}

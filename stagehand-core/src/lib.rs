//! stagehand core library.
//!
//! The individual install steps (profile loading, disk provisioning, stage
//! archive handling, chroot preparation and handoff) plus the pieces every
//! front end needs: CLI, logging, preflight checks, the privilege guard and
//! the single-instance lock. Sequencing lives in `stagehand-workflow`.

pub mod chroot;
pub mod cli;
pub mod config;
pub mod disk_ops;
pub mod errors;
pub mod lock;
pub mod logging;
pub mod preflight;
pub mod privilege;
pub mod rootfs;
pub mod select;
pub mod style;

pub use config::{InstallProfile, InstallerSettings, LoadedConfig};
pub use errors::{InstallError, InstallResult};

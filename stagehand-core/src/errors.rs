use stagehand_hal::HalError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for install steps.
pub type InstallResult<T> = std::result::Result<T, InstallError>;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Elevation failed: {0}")]
    Privilege(String),

    #[error("Config error ({key}): {message}")]
    Config { key: String, message: String },

    #[error("{step} failed: {source}")]
    Command {
        step: String,
        #[source]
        source: HalError,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Another install is already running (lock held on {})", .0.display())]
    AlreadyRunning(PathBuf),
}

impl InstallError {
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        InstallError::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Adapter for `map_err` that tags a HAL failure with the step it broke.
    pub fn command(step: impl Into<String>) -> impl FnOnce(HalError) -> InstallError {
        let step = step.into();
        move |source| InstallError::Command { step, source }
    }

    /// Exit code of the external command behind this error, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            InstallError::Command { source, .. } => source.exit_code(),
            _ => None,
        }
    }
}

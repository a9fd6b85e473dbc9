use thiserror::Error;

pub type HalResult<T> = std::result::Result<T, HalError>;

#[derive(Error, Debug)]
pub enum HalError {
    #[error("Device or mount point is busy")]
    Busy,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("Refusing to copy symlink {}: it would dangle inside the new root", .0.display())]
    SymlinkSource(std::path::PathBuf),

    #[error("Download failed: {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("nix errno: {0}")]
    Nix(#[from] nix::errno::Errno),
}

impl HalError {
    /// Exit code reported by the failed program, if there was one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            HalError::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }
}

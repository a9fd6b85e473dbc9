use env_logger::Target;
use std::fs;
use std::io;
use std::path::Path;

pub const DEFAULT_LOG_FILE: &str = "/var/log/stagehand/install.log";

/// Initialise the global logger.
///
/// Logs go to `log_file` when given, otherwise to [`DEFAULT_LOG_FILE`]. If the
/// file cannot be opened (not root yet, read-only FS) they fall back to stderr.
/// `RUST_LOG` overrides the default `info` level.
pub fn init(log_file: Option<&Path>) {
    let path = log_file.unwrap_or_else(|| Path::new(DEFAULT_LOG_FILE));
    let target = open_target(path).unwrap_or(Target::Stderr);

    let mut builder = env_logger::Builder::new();
    builder.target(target).filter_level(log::LevelFilter::Info);
    builder.parse_default_env();
    // A second init (tests, re-entry) keeps the first logger.
    let _ = builder.try_init();
}

fn open_target(path: &Path) -> io::Result<Target> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(Target::Pipe(Box::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn log_file_and_parents_are_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/install.log");
        assert!(matches!(open_target(&path), Ok(Target::Pipe(_))));
        assert!(path.exists());
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        assert!(open_target(&blocker.join("install.log")).is_err());
    }
}

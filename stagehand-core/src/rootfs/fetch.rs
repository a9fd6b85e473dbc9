use crate::errors::{InstallError, InstallResult};
use crate::style::emoji;
use sha2::{Digest, Sha256};
use stagehand_hal::{FetchOps, FetchOptions, FsOps};
use std::io::Read;
use std::path::{Path, PathBuf};

pub const STAGE3_FILENAME: &str = "stage3.tar.xz";

pub fn archive_path(dest_dir: &Path) -> PathBuf {
    dest_dir.join(STAGE3_FILENAME)
}

/// Stream `url` into `<dest_dir>/stage3.tar.xz`.
///
/// One attempt only. An interrupted transfer can leave a truncated archive,
/// which extraction (or the checksum, when configured) will reject.
pub fn download_archive(
    hal: &dyn FetchOps,
    url: &str,
    dest_dir: &Path,
    opts: &FetchOptions,
    dry_run: bool,
) -> InstallResult<PathBuf> {
    let dest = archive_path(dest_dir);
    log::info!("{} Downloading {} -> {}", emoji::DOWNLOAD, url, dest.display());

    let bytes = hal
        .download(url, &dest, opts, dry_run)
        .map_err(InstallError::command("download stage archive"))?;
    if !dry_run {
        log::info!("downloaded {} bytes", bytes);
    }
    Ok(dest)
}

/// Compare the SHA-256 of `path` with the expected hex digest.
pub fn verify_sha256(hal: &dyn FsOps, path: &Path, expected: &str) -> InstallResult<()> {
    let read_err = |reason: String| {
        InstallError::Precondition(format!("cannot read {}: {}", path.display(), reason))
    };

    let mut file = hal.open_read(path).map_err(|e| read_err(e.to_string()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| read_err(e.to_string()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let actual = format!("{:x}", hasher.finalize());
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(InstallError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    log::info!("{} checksum verified for {}", emoji::SUCCESS, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use stagehand_hal::{FakeHal, LinuxHal, Operation};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn downloads_to_fixed_name() {
        let server = MockServer::start();
        let body = b"not really xz";
        let mock = server.mock(|when, then| {
            when.method(GET).path("/stage3.tar.xz");
            then.status(200).body(body);
        });

        let dir = tempdir().unwrap();
        let path = download_archive(
            &LinuxHal::new(),
            &server.url("/stage3.tar.xz"),
            dir.path(),
            &FetchOptions::default(),
            false,
        )
        .unwrap();

        mock.assert();
        assert_eq!(path, dir.path().join("stage3.tar.xz"));
        assert_eq!(fs::read(&path).unwrap(), body);

        let checksum = format!("{:x}", Sha256::digest(body));
        let hal = LinuxHal::new();
        verify_sha256(&hal, &path, &checksum).unwrap();
        verify_sha256(&hal, &path, &checksum.to_uppercase()).unwrap();
    }

    #[test]
    fn server_error_is_a_command_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/stage3.tar.xz");
            then.status(503);
        });

        let dir = tempdir().unwrap();
        let err = download_archive(
            &LinuxHal::new(),
            &server.url("/stage3.tar.xz"),
            dir.path(),
            &FetchOptions::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, InstallError::Command { .. }));
        assert!(err.to_string().contains("download stage archive"));
    }

    #[test]
    fn checksum_mismatch_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(STAGE3_FILENAME);
        fs::write(&path, b"truncated").unwrap();
        let err = verify_sha256(&LinuxHal::new(), &path, &"0".repeat(64)).unwrap_err();
        assert!(matches!(err, InstallError::ChecksumMismatch { .. }));
    }

    #[test]
    fn checksum_reads_through_the_hal() {
        let hal = FakeHal::new();
        let path = Path::new("/mnt/gentoo/stage3.tar.xz");
        hal.add_file_contents(path, b"stage3".to_vec());
        let checksum = format!("{:x}", Sha256::digest(b"stage3"));

        verify_sha256(&hal, path, &checksum).unwrap();
        let err = verify_sha256(&hal, Path::new("/mnt/gentoo/absent"), &checksum).unwrap_err();
        assert!(matches!(err, InstallError::Precondition(_)));
    }

    #[test]
    fn records_download_on_fake() {
        let hal = FakeHal::new();
        download_archive(
            &hal,
            "https://mirror.invalid/stage3.tar.xz",
            Path::new("/mnt/gentoo"),
            &FetchOptions::default(),
            false,
        )
        .unwrap();
        assert_eq!(
            hal.operations(),
            vec![Operation::Download {
                url: "https://mirror.invalid/stage3.tar.xz".to_string(),
                dest: PathBuf::from("/mnt/gentoo/stage3.tar.xz"),
            }]
        );
    }
}

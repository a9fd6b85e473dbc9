//! Network downloads.

use crate::HalResult;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Upper bound for the whole request, body included.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60 * 60),
            user_agent: concat!("stagehand/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub trait FetchOps {
    /// Stream `url` into the file at `dest`, returning the number of bytes written.
    ///
    /// No retries and no resume: a failed transfer may leave a truncated file.
    fn download(
        &self,
        url: &str,
        dest: &Path,
        opts: &FetchOptions,
        dry_run: bool,
    ) -> HalResult<u64>;
}

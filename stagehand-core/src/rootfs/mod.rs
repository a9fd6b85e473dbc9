//! Stage archive download and extraction.

pub mod extract;
pub mod fetch;

pub use extract::extract_archive;
pub use fetch::{archive_path, download_archive, verify_sha256, STAGE3_FILENAME};

//! stagehand Hardware Abstraction Layer (HAL).
//!
//! Everything the installer does to the outside world (block devices, mounts,
//! external tools, the network) goes through the traits in [`hal`]. The real
//! backend is [`LinuxHal`]; [`FakeHal`] records operations so the install
//! sequence can be tested without root or hardware.

pub mod error;
pub mod hal;
pub mod path;
pub mod procfs;

pub use error::{HalError, HalResult};
pub use hal::*;

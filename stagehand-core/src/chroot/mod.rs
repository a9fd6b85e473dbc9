//! Chroot preparation, script handoff and teardown.

pub mod handoff;
pub mod prepare;

pub use handoff::{run_chroot, teardown};
pub use prepare::{default_copy_specs, prepare_chroot, FileCopySpec};

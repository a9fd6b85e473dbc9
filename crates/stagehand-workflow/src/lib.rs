//! Sequencing for stagehand: an ordered list of named stages run once each,
//! with required stages aborting the run and best-effort stages only warning.

pub mod install_state;
pub mod pipeline;
pub mod stage_runner;

pub use install_state::InstallState;
pub use stage_runner::{StageDefinition, StagePolicy, StageRunner, WorkflowState};

use crate::stage_runner::WorkflowState;
use anyhow::{anyhow, Result};
use stagehand_core::disk_ops::PartitionSet;

/// In-memory progress of one install run. Never written to disk: an
/// interrupted install is restarted from scratch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallState {
    pub dry_run: bool,
    pub current_stage: Option<String>,
    pub completed_stages: Vec<String>,
    /// `(stage, message)` for best-effort stages that failed.
    pub warnings: Vec<(String, String)>,
    pub partitions: Option<PartitionSet>,
}

impl InstallState {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn is_completed(&self, stage: &str) -> bool {
        self.completed_stages.iter().any(|s| s == stage)
    }

    /// Partition paths, available once the partition stage has run.
    pub fn partitions(&self) -> Result<&PartitionSet> {
        self.partitions
            .as_ref()
            .ok_or_else(|| anyhow!("disk has not been partitioned yet"))
    }
}

impl WorkflowState for InstallState {
    fn set_current(&mut self, stage: &str) {
        self.current_stage = Some(stage.to_string());
    }

    fn mark_completed(&mut self, stage: &str) {
        self.completed_stages.push(stage.to_string());
    }

    fn record_warning(&mut self, stage: &str, message: String) {
        self.warnings.push((stage.to_string(), message));
    }
}

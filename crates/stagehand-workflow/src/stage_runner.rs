use anyhow::Result;

pub type StageFn<'a, S> = Box<dyn Fn(&mut S, bool) -> Result<()> + 'a>;

/// What a failed stage means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePolicy {
    /// Abort the run.
    Required,
    /// Log a warning, record it, and continue with the next stage.
    BestEffort,
}

pub struct StageDefinition<'a, S> {
    pub name: &'a str,
    pub policy: StagePolicy,
    pub run: StageFn<'a, S>,
}

impl<'a, S> StageDefinition<'a, S> {
    pub fn required(name: &'a str, run: impl Fn(&mut S, bool) -> Result<()> + 'a) -> Self {
        Self {
            name,
            policy: StagePolicy::Required,
            run: Box::new(run),
        }
    }

    pub fn best_effort(name: &'a str, run: impl Fn(&mut S, bool) -> Result<()> + 'a) -> Self {
        Self {
            name,
            policy: StagePolicy::BestEffort,
            run: Box::new(run),
        }
    }
}

pub trait WorkflowState {
    fn set_current(&mut self, stage: &str);
    fn mark_completed(&mut self, stage: &str);
    fn record_warning(&mut self, stage: &str, message: String);
}

/// Runs stages strictly in order, once each. Nothing is persisted: every run
/// starts from the state it is given.
pub struct StageRunner {
    dry_run: bool,
}

impl StageRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn run<S: WorkflowState>(&self, mut state: S, stages: &[StageDefinition<'_, S>]) -> Result<S> {
        let total = stages.len();
        for (idx, stage) in stages.iter().enumerate() {
            log::info!("[{}/{}] {}", idx + 1, total, stage.name);
            state.set_current(stage.name);

            match (stage.run)(&mut state, self.dry_run) {
                Ok(()) => state.mark_completed(stage.name),
                Err(err) if stage.policy == StagePolicy::BestEffort => {
                    log::warn!("{} failed (continuing): {:#}", stage.name, err);
                    state.record_warning(stage.name, format!("{:#}", err));
                }
                Err(err) => return Err(err.context(format!("stage '{}' failed", stage.name))),
            }
        }
        Ok(state)
    }
}

use crate::{
    forced_deletion::{
        context::ForcedDeletionContext,
        steps::{
            AttemptDeleteStep, CheckRetryBudgetStep, ResetAccessStep,
            TerminateLockingProcessesStep,
        },
    },
    pipeline::Pipeline,
};

impl Pipeline<ForcedDeletionContext> {
    /// One retry pass: check bounds, attempt, then remediate the failure class just seen.
    pub fn new() -> Self {
        Self::with_steps(vec![
            Box::new(CheckRetryBudgetStep),
            Box::new(AttemptDeleteStep),
            Box::new(TerminateLockingProcessesStep),
            Box::new(ResetAccessStep),
        ])
    }
}

impl Default for Pipeline<ForcedDeletionContext> {
    fn default() -> Self {
        Self::new()
    }
}

use crate::error::Error;

/// What the pipeline does after a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Run the next step.
    Continue,
    /// End the pass successfully without running the remaining steps.
    Skip,
    /// End the pass with an error.
    Abort(Error),
}

/// One unit of work in a [`Pipeline`](super::Pipeline).
///
/// Steps keep no state of their own; everything they read or produce lives in the context.
#[async_trait::async_trait]
pub trait PipelineStep<T>: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &'static str;

    /// Checked before `execute`. A step returning `false` is passed over without affecting the
    /// rest of the pass.
    fn should_execute(&self, _context: &T) -> bool {
        true
    }

    async fn execute(&self, context: &mut T) -> StepAction;
}

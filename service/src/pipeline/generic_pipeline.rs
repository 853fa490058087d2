use super::pipeline_step::{PipelineStep, StepAction};
use crate::error::Error;

/// Runs a fixed list of steps against a shared context.
///
/// A pipeline is one pass. Callers that need to repeat the pass, like the forced deletion
/// retry loop, execute the same pipeline again with the same context.
///
/// ```ignore
/// struct CountingContext {
///     attempts: u32,
/// }
///
/// struct CountStep;
///
/// #[async_trait::async_trait]
/// impl PipelineStep<CountingContext> for CountStep {
///     fn name(&self) -> &'static str {
///         "count"
///     }
///
///     async fn execute(&self, context: &mut CountingContext) -> StepAction {
///         context.attempts += 1;
///         StepAction::Continue
///     }
/// }
///
/// let pipeline = Pipeline::with_steps(vec![Box::new(CountStep)]);
/// let mut context = CountingContext { attempts: 0 };
/// pipeline.execute(&mut context).await?;
/// ```
pub struct Pipeline<T> {
    pub steps: Vec<Box<dyn PipelineStep<T>>>,
}

impl<T> Pipeline<T> {
    pub fn with_steps(steps: Vec<Box<dyn PipelineStep<T>>>) -> Self {
        Self { steps }
    }

    /// Executes the steps in order.
    ///
    /// Returns `Ok(())` when every step ran or one of them returned `Skip`, and the step's
    /// error when one returned `Abort`.
    pub async fn execute(&self, context: &mut T) -> Result<(), Error> {
        for step in &self.steps {
            if !step.should_execute(context) {
                tracing::trace!("Step {} not applicable", step.name());
                continue;
            }

            tracing::debug!("Executing step: {}", step.name());

            match step.execute(context).await {
                StepAction::Continue => continue,
                StepAction::Skip => {
                    tracing::debug!("Step {} finished the pass early", step.name());
                    return Ok(());
                }
                StepAction::Abort(error) => {
                    tracing::error!("Step {} aborted the pipeline: {}", step.name(), error);
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}

use access_control::AccessResetError;
use core_types::{ErrorClass, RemediationAction, events::DeletionEvent};
use process_locks::LockResolverError;

use crate::{
    best_effort,
    error::Error,
    forced_deletion::{context::ForcedDeletionContext, model::DeleteFailure},
    pipeline::pipeline_step::{PipelineStep, StepAction},
};

/// Step 1: Stop the loop when cancelled or when the retry bounds are spent
pub struct CheckRetryBudgetStep;

#[async_trait::async_trait]
impl PipelineStep<ForcedDeletionContext> for CheckRetryBudgetStep {
    fn name(&self) -> &'static str {
        "check_retry_budget"
    }

    async fn execute(&self, context: &mut ForcedDeletionContext) -> StepAction {
        if context.cancellation.is_cancelled() {
            tracing::warn!("Deletion of {} was cancelled", context.target().display());
            return StepAction::Abort(Error::OperationCancelled);
        }

        // The first attempt is always made.
        if context.retry_state.attempt == 0 {
            return StepAction::Continue;
        }

        match exhausted_budget(context) {
            Some(error) => StepAction::Abort(error),
            None => StepAction::Continue,
        }
    }
}

/// Returns the error to stop with once the attempt limit or the deadline has been reached.
fn exhausted_budget(context: &ForcedDeletionContext) -> Option<Error> {
    let attempts = context.retry_state.attempt;
    let last_error = context.retry_state.last_error_class;

    if let Some(max_attempts) = context.retry_policy.max_attempts {
        if attempts >= max_attempts {
            return Some(Error::RetryLimitReached {
                path: context.failing_path().to_path_buf(),
                attempts,
                last_error,
            });
        }
    }

    if let Some(deadline) = context.retry_policy.deadline {
        if context.started_at.elapsed() >= deadline {
            return Some(Error::DeadlineExceeded {
                path: context.failing_path().to_path_buf(),
                attempts,
                last_error,
            });
        }
    }

    None
}

/// Step 2: Try to remove the whole tree and classify the failure
pub struct AttemptDeleteStep;

#[async_trait::async_trait]
impl PipelineStep<ForcedDeletionContext> for AttemptDeleteStep {
    fn name(&self) -> &'static str {
        "attempt_delete"
    }

    async fn execute(&self, context: &mut ForcedDeletionContext) -> StepAction {
        context.retry_state.attempt += 1;
        let attempt = context.retry_state.attempt;
        let target = context.target().to_path_buf();
        context.outcome.attempts = attempt;

        tracing::info!("Delete attempt {} for {}", attempt, target.display());
        context
            .send_progress(DeletionEvent::AttemptStarted {
                path: target.clone(),
                attempt,
            })
            .await;

        match context.ops.fs_ops.remove_tree(&target) {
            Ok(()) => {
                tracing::info!("Delete of {} reported success", target.display());
                context.deleted = true;
                StepAction::Skip
            }
            Err(e) => {
                let class = e.error_class();
                let message = e.to_string();
                tracing::warn!("Attempt {} failed ({}): {}", attempt, class, message);

                context.retry_state.last_error_class = class;
                context.last_failure = Some(DeleteFailure {
                    class,
                    path: e.path.clone(),
                    message: message.clone(),
                });
                context
                    .send_progress(DeletionEvent::AttemptFailed {
                        path: e.path.clone(),
                        attempt,
                        error_class: class,
                        message: message.clone(),
                    })
                    .await;

                if !class.is_recoverable() {
                    StepAction::Abort(Error::FatalIo {
                        path: e.path,
                        message,
                    })
                } else if let Some(error) = exhausted_budget(context) {
                    // No remediation when no further attempt will follow.
                    StepAction::Abort(error)
                } else {
                    StepAction::Continue
                }
            }
        }
    }
}

/// Step 3: Terminate the processes holding the failing entry open
pub struct TerminateLockingProcessesStep;

impl TerminateLockingProcessesStep {
    fn plan(
        lockers: &[core_types::LockingProcessInfo],
        always_terminate: &[String],
    ) -> Vec<RemediationAction> {
        let mut actions: Vec<RemediationAction> = Vec::new();
        let candidates = lockers
            .iter()
            .map(|p| (Some(p.process_id), p.executable_name.as_str()))
            .chain(always_terminate.iter().map(|name| (None, name.as_str())));

        for (pid, name) in candidates {
            let already_planned = actions.iter().any(|action| {
                matches!(action, RemediationAction::KillProcess { executable_name, .. }
                    if executable_name.eq_ignore_ascii_case(name))
            });
            if !already_planned && !name.is_empty() {
                actions.push(RemediationAction::KillProcess {
                    pid,
                    executable_name: name.to_string(),
                });
            }
        }
        actions
    }
}

#[async_trait::async_trait]
impl PipelineStep<ForcedDeletionContext> for TerminateLockingProcessesStep {
    fn name(&self) -> &'static str {
        "terminate_locking_processes"
    }

    fn should_execute(&self, context: &ForcedDeletionContext) -> bool {
        context.retry_state.last_error_class == ErrorClass::Busy
    }

    async fn execute(&self, context: &mut ForcedDeletionContext) -> StepAction {
        let locked_path = context.failing_path().to_path_buf();
        tracing::info!(
            "{} is in use, looking for processes holding it open",
            locked_path.display()
        );

        let lockers = match context
            .ops
            .lock_resolver
            .find_locking_processes(&locked_path)
            .await
        {
            Ok(lockers) => lockers,
            Err(e @ LockResolverError::ToolUnavailable { .. }) => {
                return StepAction::Abort(e.into());
            }
            Err(e) => {
                best_effort::attempt::<(), _>("Finding locking processes", Err(e));
                Vec::new()
            }
        };

        for action in Self::plan(&lockers, &context.settings.always_terminate) {
            let RemediationAction::KillProcess {
                executable_name, ..
            } = &action
            else {
                continue;
            };

            let result = context.ops.process_killer.terminate_by_name(executable_name);
            if let Some(count) = best_effort::attempt(&action, result) {
                tracing::info!("{}: {} process(es) terminated", action, count);
                context.outcome.record_termination(executable_name);
                context
                    .send_progress(DeletionEvent::ProcessTerminated {
                        executable_name: executable_name.clone(),
                        count,
                    })
                    .await;
            }
        }

        let settle_delay = context.settings.settle_delay();
        if !settle_delay.is_zero() {
            async_std::task::sleep(settle_delay).await;
        }
        StepAction::Continue
    }
}

/// Step 4: Take ownership of the failing entry and reset its permissions
pub struct ResetAccessStep;

#[async_trait::async_trait]
impl PipelineStep<ForcedDeletionContext> for ResetAccessStep {
    fn name(&self) -> &'static str {
        "reset_access"
    }

    fn should_execute(&self, context: &ForcedDeletionContext) -> bool {
        context.retry_state.last_error_class == ErrorClass::AccessDenied
    }

    async fn execute(&self, context: &mut ForcedDeletionContext) -> StepAction {
        let path = context.failing_path().to_path_buf();
        let principal = context.settings.acl_principal.clone();
        tracing::info!(
            "Access to {} was denied, resetting permissions for {}",
            path.display(),
            principal
        );

        let result = context
            .ops
            .access_resetter
            .reset_access(&path, &principal)
            .await;
        match result {
            Ok(()) => {
                context.outcome.acl_resets.push(path.clone());
                context
                    .send_progress(DeletionEvent::AccessReset { path, principal })
                    .await;
            }
            Err(e @ AccessResetError::ToolUnavailable { .. }) => {
                return StepAction::Abort(e.into());
            }
            Err(e) => {
                let action = RemediationAction::ResetAcl { path, principal };
                best_effort::attempt::<(), _>(action, Err(e));
            }
        }
        StepAction::Continue
    }
}

//! Retrying forced deletion of a directory tree.
//!
//! Each retry is one pass of a [`Pipeline`](crate::pipeline::Pipeline) over a
//! [`ForcedDeletionContext`](context::ForcedDeletionContext):
//!
//! 1. `CheckRetryBudgetStep` stops the loop on cancellation or when the retry bounds are spent
//! 2. `AttemptDeleteStep` tries the delete and classifies a failure
//! 3. `TerminateLockingProcessesStep` runs after a busy failure
//! 4. `ResetAccessStep` runs after an access denied failure

pub mod context;
pub mod model;
pub mod pipeline;
pub mod service;
pub mod steps;

pub use model::DeletionOutcome;
pub use service::ForcedDeletionService;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use access_control::AccessResetter;
use async_std::channel::Sender;
use core_types::{DeletionTarget, RetryState, events::DeletionEvent};
use file_system::FileSystemOps;
use process_locks::{ProcessKiller, ProcessLockResolver};

use crate::{
    cancellation::CancellationFlag,
    forced_deletion::model::{DeleteFailure, DeletionOutcome},
    settings::{DeletionSettings, RetryPolicy},
};

/// Collaborators the engine drives.
#[derive(Clone)]
pub struct DeletionOps {
    pub fs_ops: Arc<dyn FileSystemOps>,
    pub lock_resolver: Arc<dyn ProcessLockResolver>,
    pub process_killer: Arc<dyn ProcessKiller>,
    pub access_resetter: Arc<dyn AccessResetter>,
}

/// Context object that flows through every pass of the pipeline, accumulating state
pub struct ForcedDeletionContext {
    pub ops: DeletionOps,
    pub settings: Arc<DeletionSettings>,
    pub retry_policy: RetryPolicy,
    pub cancellation: CancellationFlag,
    pub progress_tx: Option<Sender<DeletionEvent>>,
    pub started_at: Instant,

    // Accumulated state as the retry loop progresses
    pub retry_state: RetryState,
    pub last_failure: Option<DeleteFailure>,
    pub deleted: bool,
    pub outcome: DeletionOutcome,
}

impl ForcedDeletionContext {
    pub fn new(
        target: DeletionTarget,
        ops: DeletionOps,
        settings: Arc<DeletionSettings>,
        retry_policy: RetryPolicy,
        cancellation: CancellationFlag,
        progress_tx: Option<Sender<DeletionEvent>>,
    ) -> Self {
        let outcome = DeletionOutcome {
            target: target.path().to_path_buf(),
            ..Default::default()
        };
        Self {
            ops,
            settings,
            retry_policy,
            cancellation,
            progress_tx,
            started_at: Instant::now(),
            retry_state: RetryState::new(target),
            last_failure: None,
            deleted: false,
            outcome,
        }
    }

    pub fn target(&self) -> &Path {
        self.retry_state.target.path()
    }

    /// Path remediation should act on: the failing entry when known, else the target.
    pub fn failing_path(&self) -> &Path {
        self.last_failure
            .as_ref()
            .map(|failure| failure.path.as_path())
            .unwrap_or_else(|| self.target())
    }

    pub async fn send_progress(&self, event: DeletionEvent) {
        if let Some(tx) = &self.progress_tx {
            if let Err(e) = tx.send(event).await {
                tracing::debug!("Progress receiver is gone: {}", e);
            }
        }
    }
}

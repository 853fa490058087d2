use std::path::PathBuf;
use std::sync::Arc;

use async_std::channel::Sender;
use core_types::{DeletionTarget, events::CacheClearEvent};

use crate::{
    cancellation::CancellationFlag,
    error::Error,
    forced_deletion::ForcedDeletionService,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheClearReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl CacheClearReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Empties cache directories while keeping the directories themselves.
pub struct CacheClearingService {
    deletion_service: Arc<ForcedDeletionService>,
}

impl CacheClearingService {
    pub fn new(deletion_service: Arc<ForcedDeletionService>) -> Self {
        Self { deletion_service }
    }

    /// Force-deletes every direct child of each directory, then recreates the directory if it
    /// is missing.
    ///
    /// A failing entry is recorded in the report and the run moves on. A missing tool or a
    /// cancellation ends the whole run since every later entry would fail the same way.
    pub async fn clear_caches(
        &self,
        dirs: &[DeletionTarget],
        cancellation: CancellationFlag,
        progress_tx: Option<Sender<CacheClearEvent>>,
    ) -> Result<CacheClearReport, Error> {
        let fs_ops = self.deletion_service.ops().fs_ops.clone();
        let retry_policy = self.deletion_service.settings().retry_policy();
        let mut report = CacheClearReport::default();

        send(&progress_tx, CacheClearEvent::ClearStarted {
            total_dirs: dirs.len(),
        })
        .await;

        for dir in dirs {
            let children = if fs_ops.exists(dir.path()) {
                match fs_ops.list_children(dir.path()) {
                    Ok(children) => children,
                    Err(e) => {
                        tracing::warn!("Cannot list {}: {}", dir, e);
                        report
                            .failed
                            .push((dir.path().to_path_buf(), Error::from(e)));
                        continue;
                    }
                }
            } else {
                Vec::new()
            };

            tracing::info!("Clearing {} ({} entries)", dir, children.len());
            send(&progress_tx, CacheClearEvent::DirStarted {
                dir: dir.path().to_path_buf(),
                entries: children.len(),
            })
            .await;

            for child in children {
                let target = DeletionTarget::new(&child)?;
                let result = self
                    .deletion_service
                    .delete_with_progress(&target, retry_policy, cancellation.clone(), None)
                    .await;
                match result {
                    Ok(_) => {
                        send(&progress_tx, CacheClearEvent::EntryDeleted {
                            path: child.clone(),
                        })
                        .await;
                        report.deleted.push(child);
                    }
                    Err(e) if e.is_run_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!("Could not clear {}: {}", child.display(), e);
                        send(&progress_tx, CacheClearEvent::EntryFailed {
                            path: child.clone(),
                            error: e.to_string(),
                        })
                        .await;
                        report.failed.push((child, e));
                    }
                }
            }

            if let Err(e) = fs_ops.ensure_dir(dir.path()) {
                tracing::warn!("Could not recreate {}: {}", dir, e);
                report
                    .failed
                    .push((dir.path().to_path_buf(), Error::from(e)));
            }
        }

        tracing::info!(
            "Cache clearing finished: {} deleted, {} failed",
            report.deleted.len(),
            report.failed.len()
        );
        send(&progress_tx, CacheClearEvent::ClearCompleted {
            deleted: report.deleted.len(),
            failed: report.failed.len(),
        })
        .await;
        Ok(report)
    }
}

async fn send(progress_tx: &Option<Sender<CacheClearEvent>>, event: CacheClearEvent) {
    if let Some(tx) = progress_tx {
        if let Err(e) = tx.send(event).await {
            tracing::debug!("Progress receiver is gone: {}", e);
        }
    }
}

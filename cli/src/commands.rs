use std::io::Write;
use std::path::{Path, PathBuf};

use access_control::AccessResetter;
use core_types::{DeletionTarget, LockingProcessInfo};
use process_locks::ProcessLockResolver;
use service::{
    cache_clearing::{CacheClearReport, CacheClearingService},
    cancellation::CancellationFlag,
    error::Error,
    forced_deletion::{DeletionOutcome, ForcedDeletionService},
    settings::RetryPolicy,
};

/// Turns command line paths into deletion targets, anchoring relative ones at `cwd`.
pub fn resolve_targets(paths: &[PathBuf], cwd: &Path) -> Result<Vec<DeletionTarget>, Error> {
    paths
        .iter()
        .map(|path| DeletionTarget::resolve(path, cwd).map_err(Error::from))
        .collect()
}

/// Deletes every target in turn, continuing past failures. Returns the number of failures.
pub async fn delete_targets(
    service: &ForcedDeletionService,
    targets: &[DeletionTarget],
    retry_policy: RetryPolicy,
    out: &mut impl Write,
) -> Result<usize, Error> {
    let mut failures = 0;
    for target in targets {
        let result = service
            .delete_with_progress(target, retry_policy, CancellationFlag::new(), None)
            .await;
        match result {
            Ok(outcome) => writeln!(out, "{}", describe_outcome(&outcome))?,
            Err(e) if e.is_run_fatal() => return Err(e),
            Err(e) => {
                tracing::error!("{}", e);
                writeln!(out, "FAILED {}: {}", target, e)?;
                failures += 1;
            }
        }
    }
    Ok(failures)
}

pub fn describe_outcome(outcome: &DeletionOutcome) -> String {
    if outcome.already_absent {
        return format!("{} does not exist", outcome.target.display());
    }
    let mut line = format!(
        "Deleted {} ({} attempt{})",
        outcome.target.display(),
        outcome.attempts,
        if outcome.attempts == 1 { "" } else { "s" }
    );
    if !outcome.terminated_processes.is_empty() {
        line.push_str(&format!(
            ", terminated {}",
            outcome.terminated_processes.join(", ")
        ));
    }
    if !outcome.acl_resets.is_empty() {
        line.push_str(&format!(", reset ACL on {} path(s)", outcome.acl_resets.len()));
    }
    line
}

pub async fn list_locks(
    resolver: &dyn ProcessLockResolver,
    target: &DeletionTarget,
    json: bool,
    out: &mut impl Write,
) -> Result<(), Error> {
    let processes = resolver.find_locking_processes(target.path()).await?;
    if json {
        let json = serde_json::to_string_pretty(&processes)
            .map_err(|e| Error::IoError(e.to_string()))?;
        writeln!(out, "{}", json)?;
    } else {
        write_lock_table(&processes, out)?;
    }
    Ok(())
}

fn write_lock_table(processes: &[LockingProcessInfo], out: &mut impl Write) -> Result<(), Error> {
    if processes.is_empty() {
        writeln!(out, "No processes hold handles beneath the path")?;
        return Ok(());
    }
    writeln!(out, "{:>8}  {:<28} {:<10} PATH", "PID", "EXECUTABLE", "TYPE")?;
    for process in processes {
        writeln!(
            out,
            "{:>8}  {:<28} {:<10} {}",
            process.process_id, process.executable_name, process.handle_type, process.locked_path
        )?;
        if !process.command_line.is_empty() {
            writeln!(out, "{:>8}  {}", "", process.command_line)?;
        }
    }
    Ok(())
}

pub async fn reset_acl(
    resetter: &dyn AccessResetter,
    target: &DeletionTarget,
    principal: &str,
    out: &mut impl Write,
) -> Result<(), Error> {
    resetter.reset_access(target.path(), principal).await?;
    writeln!(out, "Reset ownership and permissions of {} to {}", target, principal)?;
    Ok(())
}

pub async fn clear_caches(
    service: &CacheClearingService,
    dirs: &[DeletionTarget],
    out: &mut impl Write,
) -> Result<CacheClearReport, Error> {
    if dirs.is_empty() {
        return Err(Error::InvalidInput(
            "no cache directories given or configured".to_string(),
        ));
    }
    let report = service
        .clear_caches(dirs, CancellationFlag::new(), None)
        .await?;
    for (path, error) in &report.failed {
        writeln!(out, "FAILED {}: {}", path.display(), error)?;
    }
    writeln!(
        out,
        "Cleared {} entr{}, {} failed",
        report.deleted.len(),
        if report.deleted.len() == 1 { "y" } else { "ies" },
        report.failed.len()
    )?;
    Ok(report)
}

pub fn ensure_dir(
    fs_ops: &dyn file_system::FileSystemOps,
    target: &DeletionTarget,
    out: &mut impl Write,
) -> Result<(), Error> {
    if fs_ops.ensure_dir(target.path())? {
        writeln!(out, "Created {}", target)?;
    } else {
        writeln!(out, "{} already exists", target)?;
    }
    Ok(())
}

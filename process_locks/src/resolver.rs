use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use core_types::LockingProcessInfo;
use executable_runner::ToolSpec;
use executable_runner::locate_tool;
use executable_runner::ops::ToolRunnerOps;

use crate::error::LockResolverError;
use crate::inspector::ProcessInspector;
use crate::parser::{dedupe_by_executable, parse_handle_output};

pub const HANDLE_TOOL: ToolSpec = ToolSpec {
    name: "handle",
    file_names: &["handle64.exe", "handle.exe", "handle"],
};

const NO_MATCHES_NOTICE: &str = "No matching handles found";

/// Finds the processes holding open handles beneath a path.
///
/// Every call takes a fresh snapshot. The result holds one record per distinct executable, and
/// an empty result is a normal answer rather than an error.
#[async_trait::async_trait]
pub trait ProcessLockResolver: Send + Sync {
    async fn find_locking_processes(
        &self,
        path: &Path,
    ) -> Result<Vec<LockingProcessInfo>, LockResolverError>;
}

/// Resolver backed by the Sysinternals handle tool.
pub struct HandleLockResolver {
    runner: Arc<dyn ToolRunnerOps>,
    inspector: Arc<dyn ProcessInspector>,
    configured_tool: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
}

impl HandleLockResolver {
    pub fn new(
        runner: Arc<dyn ToolRunnerOps>,
        inspector: Arc<dyn ProcessInspector>,
        configured_tool: Option<PathBuf>,
        search_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            runner,
            inspector,
            configured_tool,
            search_dirs,
        }
    }

    fn arguments(path: &Path) -> Vec<String> {
        vec![
            "-accepteula".to_string(),
            "-nobanner".to_string(),
            "-u".to_string(),
            path.to_string_lossy().into_owned(),
        ]
    }

    fn enrich(&self, mut record: LockingProcessInfo) -> LockingProcessInfo {
        match self.inspector.details(record.process_id) {
            Some(details) => {
                record.executable_path = details
                    .executable_path
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                record.command_line = details.command_line;
            }
            None => tracing::debug!(
                "Process {} (pid {}) exited before it could be inspected",
                record.executable_name,
                record.process_id
            ),
        }
        record
    }
}

#[async_trait::async_trait]
impl ProcessLockResolver for HandleLockResolver {
    async fn find_locking_processes(
        &self,
        path: &Path,
    ) -> Result<Vec<LockingProcessInfo>, LockResolverError> {
        let tool = locate_tool(
            &HANDLE_TOOL,
            self.configured_tool.as_deref(),
            &self.search_dirs,
        )?;
        let output = self.runner.run(&tool, &Self::arguments(path)).await?;

        let records = parse_handle_output(&output.stdout);
        if records.is_empty() && !output.success() && !output.stdout.contains(NO_MATCHES_NOTICE) {
            return Err(LockResolverError::ToolFailed(format!(
                "{} exited with {:?}: {}",
                tool.display(),
                output.status_code,
                output.stderr.trim()
            )));
        }

        let handle_count = records.len();
        let processes: Vec<LockingProcessInfo> = dedupe_by_executable(records)
            .into_iter()
            .map(|record| self.enrich(record))
            .collect();

        if processes.is_empty() {
            tracing::info!("No processes hold handles beneath {}", path.display());
        } else {
            tracing::info!(
                "{} handle(s) from {} executable(s) beneath {}: {}",
                handle_count,
                processes.len(),
                path.display(),
                processes
                    .iter()
                    .map(|p| format!("{} (pid {})", p.executable_name, p.process_id))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Ok(processes)
    }
}

/// Mock resolver answering from a queue of scripted results.
///
/// When the queue is empty it reports no locking processes.
#[derive(Clone, Default)]
pub struct MockLockResolver {
    responses: Arc<Mutex<VecDeque<Result<Vec<LockingProcessInfo>, LockResolverError>>>>,
    queried_paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockLockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_processes(&self, processes: Vec<LockingProcessInfo>) {
        self.responses.lock().unwrap().push_back(Ok(processes));
    }

    pub fn push_error(&self, error: LockResolverError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn queried_paths(&self) -> Vec<PathBuf> {
        self.queried_paths.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.queried_paths.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ProcessLockResolver for MockLockResolver {
    async fn find_locking_processes(
        &self,
        path: &Path,
    ) -> Result<Vec<LockingProcessInfo>, LockResolverError> {
        self.queried_paths.lock().unwrap().push(path.to_path_buf());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

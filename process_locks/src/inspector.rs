use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use core_types::ProcessId;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessDetails {
    pub executable_path: Option<PathBuf>,
    pub command_line: String,
}

/// Looks up details of a running process. `None` when the process is gone.
pub trait ProcessInspector: Send + Sync {
    fn details(&self, pid: ProcessId) -> Option<ProcessDetails>;
}

/// Process introspection through the OS process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoProcessInspector;

impl ProcessInspector for SysinfoProcessInspector {
    fn details(&self, pid: ProcessId) -> Option<ProcessDetails> {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing()
                .with_exe(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );

        let process = system.process(pid)?;
        let command_line = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        Some(ProcessDetails {
            executable_path: process.exe().map(|p| p.to_path_buf()),
            command_line,
        })
    }
}

/// Mock inspector answering from a fixed table.
#[derive(Clone, Default)]
pub struct MockProcessInspector {
    processes: Arc<Mutex<HashMap<ProcessId, ProcessDetails>>>,
}

impl MockProcessInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process(&self, pid: ProcessId, details: ProcessDetails) {
        self.processes.lock().unwrap().insert(pid, details);
    }
}

impl ProcessInspector for MockProcessInspector {
    fn details(&self, pid: ProcessId) -> Option<ProcessDetails> {
        self.processes.lock().unwrap().get(&pid).cloned()
    }
}

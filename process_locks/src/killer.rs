use std::sync::{Arc, Mutex};

use sysinfo::{Process, ProcessesToUpdate, System};

use crate::error::KillError;

/// Forceful process termination.
///
/// Finding nothing to terminate is not an error; the result is how many processes were actually
/// signalled.
pub trait ProcessKiller: Send + Sync {
    /// Terminates every process whose executable name matches, ignoring case and a missing
    /// `.exe` suffix. The calling process is never terminated.
    fn terminate_by_name(&self, executable_name: &str) -> Result<usize, KillError>;
}

/// Compares a process table name with a requested executable name.
pub fn matches_executable_name(process_name: &str, requested: &str) -> bool {
    fn stem(name: &str) -> &str {
        let len = name.len();
        if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
            &name[..len - 4]
        } else {
            name
        }
    }
    stem(process_name).eq_ignore_ascii_case(stem(requested))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoProcessKiller;

impl SysinfoProcessKiller {
    fn snapshot() -> System {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
    }

    fn kill(process: &Process) -> Result<(), KillError> {
        if process.kill() {
            tracing::info!(
                "Terminated {} (pid {})",
                process.name().to_string_lossy(),
                process.pid()
            );
            Ok(())
        } else {
            Err(KillError::RefusedToTerminate {
                name: process.name().to_string_lossy().into_owned(),
                pid: process.pid().as_u32(),
            })
        }
    }
}

impl ProcessKiller for SysinfoProcessKiller {
    fn terminate_by_name(&self, executable_name: &str) -> Result<usize, KillError> {
        let system = Self::snapshot();
        let own_pid = std::process::id();

        let mut terminated = 0;
        let mut first_error = None;
        for process in system.processes().values().filter(|p| {
            p.pid().as_u32() != own_pid
                && matches_executable_name(&p.name().to_string_lossy(), executable_name)
        }) {
            match Self::kill(process) {
                Ok(()) => terminated += 1,
                Err(e) => {
                    tracing::warn!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if terminated == 0 => Err(e),
            _ => Ok(terminated),
        }
    }
}

/// Mock killer recording every request.
#[derive(Clone, Default)]
pub struct MockProcessKiller {
    terminated_names: Arc<Mutex<Vec<String>>>,
    refusing: Arc<Mutex<Vec<String>>>,
}

impl MockProcessKiller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes termination of the given executable fail.
    pub fn refuse(&self, executable_name: impl Into<String>) {
        self.refusing.lock().unwrap().push(executable_name.into());
    }

    /// Names passed to `terminate_by_name`, in call order.
    pub fn terminated_names(&self) -> Vec<String> {
        self.terminated_names.lock().unwrap().clone()
    }
}

impl ProcessKiller for MockProcessKiller {
    fn terminate_by_name(&self, executable_name: &str) -> Result<usize, KillError> {
        self.terminated_names
            .lock()
            .unwrap()
            .push(executable_name.to_string());

        if self
            .refusing
            .lock()
            .unwrap()
            .iter()
            .any(|name| matches_executable_name(name, executable_name))
        {
            return Err(KillError::RefusedToTerminate {
                name: executable_name.to_string(),
                pid: 0,
            });
        }
        Ok(1)
    }
}

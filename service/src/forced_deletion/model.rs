use std::path::PathBuf;

use core_types::ErrorClass;

/// The most recent failed delete attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFailure {
    pub class: ErrorClass,
    /// The entry that refused to go away; a descendant of the target for tree deletes.
    pub path: PathBuf,
    pub message: String,
}

/// Summary of a successful forced deletion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeletionOutcome {
    pub target: PathBuf,
    /// The target did not exist, so nothing was attempted.
    pub already_absent: bool,
    pub attempts: u32,
    /// Executables a termination was issued for, in order, without repeats.
    pub terminated_processes: Vec<String>,
    /// Paths whose ownership and permissions were reset, in order.
    pub acl_resets: Vec<PathBuf>,
}

impl DeletionOutcome {
    pub fn already_absent(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            already_absent: true,
            ..Default::default()
        }
    }

    pub fn record_termination(&mut self, executable_name: &str) {
        if !self
            .terminated_processes
            .iter()
            .any(|name| name.eq_ignore_ascii_case(executable_name))
        {
            self.terminated_processes.push(executable_name.to_string());
        }
    }
}

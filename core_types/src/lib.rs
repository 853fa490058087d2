use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumIter};

pub mod events;

pub type ProcessId = u32;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreTypeError {
    InvalidTarget(String),
}

impl std::fmt::Display for CoreTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreTypeError::InvalidTarget(msg) => write!(f, "Invalid deletion target: {}", msg),
        }
    }
}

impl std::error::Error for CoreTypeError {}

/// An absolute path handed to the forced deletion engine.
///
/// The only ways to build one are [`DeletionTarget::new`], which rejects relative paths, and
/// [`DeletionTarget::resolve`], which anchors relative paths to a known absolute root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeletionTarget(PathBuf);

impl DeletionTarget {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CoreTypeError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(CoreTypeError::InvalidTarget("path is empty".to_string()));
        }
        if !path.is_absolute() {
            return Err(CoreTypeError::InvalidTarget(format!(
                "{} is not an absolute path",
                path.display()
            )));
        }
        Ok(Self(path))
    }

    /// Resolves `path` against `root` when it is relative. `root` must be absolute.
    pub fn resolve(path: impl AsRef<Path>, root: &Path) -> Result<Self, CoreTypeError> {
        let path = path.as_ref();
        if path.is_absolute() {
            return Self::new(path);
        }
        if !root.is_absolute() {
            return Err(CoreTypeError::InvalidTarget(format!(
                "cannot resolve {} against relative root {}",
                path.display(),
                root.display()
            )));
        }
        Self::new(root.join(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for DeletionTarget {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for DeletionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Classification of a failed delete attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, Display)]
pub enum ErrorClass {
    #[default]
    None,
    /// Sharing violation / file in use.
    Busy,
    #[strum(serialize = "Access Denied")]
    AccessDenied,
    Other,
}

impl ErrorClass {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorClass::Busy | ErrorClass::AccessDenied)
    }
}

/// A process holding an open handle beneath a deletion target.
///
/// `executable_path` and `command_line` are empty when the process exited before it could be
/// inspected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockingProcessInfo {
    pub process_id: ProcessId,
    pub executable_name: String,
    pub executable_path: String,
    pub command_line: String,
    pub handle_type: String,
    pub owner_user: String,
    pub locked_path: String,
}

/// Per-invocation retry bookkeeping of the forced deletion engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    pub target: DeletionTarget,
    pub attempt: u32,
    pub last_error_class: ErrorClass,
}

impl RetryState {
    pub fn new(target: DeletionTarget) -> Self {
        Self {
            target,
            attempt: 0,
            last_error_class: ErrorClass::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationAction {
    /// Terminate an executable. `pid` is unknown for processes targeted by name only.
    KillProcess {
        pid: Option<ProcessId>,
        executable_name: String,
    },
    ResetAcl {
        path: PathBuf,
        principal: String,
    },
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemediationAction::KillProcess {
                pid: Some(pid),
                executable_name,
            } => write!(f, "kill {} (pid {})", executable_name, pid),
            RemediationAction::KillProcess {
                pid: None,
                executable_name,
            } => write!(f, "kill {}", executable_name),
            RemediationAction::ResetAcl { path, principal } => {
                write!(f, "reset ACL of {} for {}", path.display(), principal)
            }
        }
    }
}

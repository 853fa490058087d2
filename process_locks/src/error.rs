use executable_runner::error::ExecutableRunnerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LockResolverError {
    #[error("Tool {tool} is not available (searched: {searched})")]
    ToolUnavailable { tool: String, searched: String },
    #[error("Handle enumeration failed: {0}")]
    ToolFailed(String),
}

impl From<ExecutableRunnerError> for LockResolverError {
    fn from(err: ExecutableRunnerError) -> Self {
        match err {
            ExecutableRunnerError::ToolUnavailable { tool, searched } => {
                LockResolverError::ToolUnavailable { tool, searched }
            }
            ExecutableRunnerError::IoError(message) => LockResolverError::ToolFailed(message),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KillError {
    #[error("Process {name} (pid {pid}) refused to terminate")]
    RefusedToTerminate { name: String, pid: u32 },
}

use executable_runner::error::ExecutableRunnerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessResetError {
    #[error("Tool {tool} is not available (searched: {searched})")]
    ToolUnavailable { tool: String, searched: String },
    #[error("ACL reset failed: {0}")]
    AclResetFailed(String),
}

impl From<ExecutableRunnerError> for AccessResetError {
    fn from(err: ExecutableRunnerError) -> Self {
        match err {
            ExecutableRunnerError::ToolUnavailable { tool, searched } => {
                AccessResetError::ToolUnavailable { tool, searched }
            }
            ExecutableRunnerError::IoError(message) => AccessResetError::AclResetFailed(message),
        }
    }
}

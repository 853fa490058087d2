use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutableRunnerError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Tool {tool} is not available (searched: {searched})")]
    ToolUnavailable { tool: String, searched: String },
}

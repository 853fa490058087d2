use std::fmt::{Display, Formatter, Result};
use std::path::PathBuf;

use access_control::AccessResetError;
use core_types::{CoreTypeError, ErrorClass};
use file_system::FileSystemError;
use process_locks::LockResolverError;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A delete attempt failed with an error that no remediation can fix.
    FatalIo {
        path: PathBuf,
        message: String,
    },
    RetryLimitReached {
        path: PathBuf,
        attempts: u32,
        last_error: ErrorClass,
    },
    DeadlineExceeded {
        path: PathBuf,
        attempts: u32,
        last_error: ErrorClass,
    },
    /// The delete reported success but the target is still present.
    PostconditionFailed(PathBuf),
    ToolUnavailable(String),
    LockResolutionFailed(String),
    AclResetFailed(String),
    IoError(String),
    SettingsError(String),
    OperationCancelled,
    InvalidInput(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Error::FatalIo { path, message } => {
                write!(f, "Cannot delete {}: {}", path.display(), message)
            }
            Error::RetryLimitReached {
                path,
                attempts,
                last_error,
            } => write!(
                f,
                "Gave up deleting {} after {} attempts (last error: {})",
                path.display(),
                attempts,
                last_error
            ),
            Error::DeadlineExceeded {
                path,
                attempts,
                last_error,
            } => write!(
                f,
                "Deadline exceeded deleting {} after {} attempts (last error: {})",
                path.display(),
                attempts,
                last_error
            ),
            Error::PostconditionFailed(path) => write!(
                f,
                "Delete of {} reported success but the path still exists",
                path.display()
            ),
            Error::ToolUnavailable(message) => write!(f, "Tool unavailable: {}", message),
            Error::LockResolutionFailed(message) => {
                write!(f, "Lock resolution failed: {}", message)
            }
            Error::AclResetFailed(message) => write!(f, "ACL reset failed: {}", message),
            Error::IoError(message) => write!(f, "IO error: {}", message),
            Error::SettingsError(message) => write!(f, "Settings error: {}", message),
            Error::OperationCancelled => write!(f, "Operation was cancelled"),
            Error::InvalidInput(message) => write!(f, "Invalid input: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether retrying further work of the same kind is pointless.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Error::ToolUnavailable(_) | Error::OperationCancelled)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<FileSystemError> for Error {
    fn from(err: FileSystemError) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<CoreTypeError> for Error {
    fn from(err: CoreTypeError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<LockResolverError> for Error {
    fn from(err: LockResolverError) -> Self {
        match err {
            LockResolverError::ToolUnavailable { .. } => Error::ToolUnavailable(err.to_string()),
            LockResolverError::ToolFailed(message) => Error::LockResolutionFailed(message),
        }
    }
}

impl From<AccessResetError> for Error {
    fn from(err: AccessResetError) -> Self {
        match err {
            AccessResetError::ToolUnavailable { .. } => Error::ToolUnavailable(err.to_string()),
            AccessResetError::AclResetFailed(message) => Error::AclResetFailed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_unavailable_maps_from_both_collaborators() {
        let from_resolver: Error = LockResolverError::ToolUnavailable {
            tool: "handle".to_string(),
            searched: "PATH".to_string(),
        }
        .into();
        let from_resetter: Error = AccessResetError::ToolUnavailable {
            tool: "SetACL".to_string(),
            searched: "PATH".to_string(),
        }
        .into();

        assert!(matches!(from_resolver, Error::ToolUnavailable(_)));
        assert!(matches!(from_resetter, Error::ToolUnavailable(_)));
        assert!(from_resolver.is_run_fatal());
    }

    #[test]
    fn test_retry_limit_message_names_path_and_class() {
        let error = Error::RetryLimitReached {
            path: PathBuf::from("/data/cache"),
            attempts: 3,
            last_error: ErrorClass::Busy,
        };
        assert_eq!(
            error.to_string(),
            "Gave up deleting /data/cache after 3 attempts (last error: Busy)"
        );
        assert!(!error.is_run_fatal());
    }
}

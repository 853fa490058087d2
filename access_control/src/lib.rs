//! Forcible reset of ownership and permissions on a directory tree.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use executable_runner::ops::ToolRunnerOps;
use executable_runner::{ToolSpec, locate_tool};

pub mod error;

pub use error::AccessResetError;

pub const ACL_TOOL: ToolSpec = ToolSpec {
    name: "SetACL",
    file_names: &["SetACL.exe", "SetACL"],
};

/// Well-known local administrators group.
pub const DEFAULT_PRINCIPAL: &str = "Administrators";

#[async_trait::async_trait]
pub trait AccessResetter: Send + Sync {
    /// Gives `principal` ownership and full control of `path` and re-propagates inherited
    /// permissions to every descendant.
    async fn reset_access(&self, path: &Path, principal: &str) -> Result<(), AccessResetError>;
}

/// Builds the ordered SetACL action list.
///
/// The order matters: explicit entries are cleared, the principal is granted full control and
/// made owner, the DACL is unprotected so it inherits again (SACL untouched) across containers
/// and objects, and finally inherited entries are reset on all children. Per-object errors are
/// ignored by the tool itself.
pub fn set_acl_arguments(path: &Path, principal: &str) -> Vec<String> {
    let path = path.to_string_lossy();
    let grant = format!("n:{};p:full", principal);
    let owner = format!("n:{}", principal);
    [
        "-on",
        &*path,
        "-ot",
        "file",
        "-actn",
        "clear",
        "-clr",
        "dacl,sacl",
        "-actn",
        "ace",
        "-ace",
        grant.as_str(),
        "-actn",
        "setowner",
        "-ownr",
        owner.as_str(),
        "-actn",
        "setprot",
        "-op",
        "dacl:np;sacl:nc",
        "-rec",
        "cont_obj",
        "-actn",
        "rstchldrn",
        "-rst",
        "dacl,sacl",
        "-ignoreerr",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect()
}

/// Resetter backed by the SetACL command line tool.
pub struct SetAclAccessResetter {
    runner: Arc<dyn ToolRunnerOps>,
    configured_tool: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
}

impl SetAclAccessResetter {
    pub fn new(
        runner: Arc<dyn ToolRunnerOps>,
        configured_tool: Option<PathBuf>,
        search_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            runner,
            configured_tool,
            search_dirs,
        }
    }
}

#[async_trait::async_trait]
impl AccessResetter for SetAclAccessResetter {
    async fn reset_access(&self, path: &Path, principal: &str) -> Result<(), AccessResetError> {
        let tool = locate_tool(&ACL_TOOL, self.configured_tool.as_deref(), &self.search_dirs)?;
        tracing::info!(
            "Resetting ownership and permissions of {} to {}",
            path.display(),
            principal
        );

        let output = self
            .runner
            .run(&tool, &set_acl_arguments(path, principal))
            .await?;
        for line in output.lines() {
            tracing::debug!("SetACL: {}", line);
        }

        if output.success() {
            Ok(())
        } else {
            Err(AccessResetError::AclResetFailed(format!(
                "SetACL exited with {:?} for {}",
                output.status_code,
                path.display()
            )))
        }
    }
}

/// Represents a recorded call to the access resetter.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetCall {
    pub path: PathBuf,
    pub principal: String,
}

/// Mock implementation for testing access reset operations.
#[derive(Clone, Default)]
pub struct MockAccessResetter {
    failure: Option<AccessResetError>,
    calls: Arc<Mutex<Vec<ResetCall>>>,
}

impl MockAccessResetter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock failing every reset with `error`.
    pub fn with_failure(error: AccessResetError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<ResetCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl AccessResetter for MockAccessResetter {
    async fn reset_access(&self, path: &Path, principal: &str) -> Result<(), AccessResetError> {
        self.calls.lock().unwrap().push(ResetCall {
            path: path.to_path_buf(),
            principal: principal.to_string(),
        });
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

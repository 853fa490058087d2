use std::path::PathBuf;
use std::time::Duration;

use access_control::DEFAULT_PRINCIPAL;
use serde::{Deserialize, Serialize};

/// Background indexer that opens files under freshly written trees.
pub const DEFAULT_ALWAYS_TERMINATE: &str = "SearchProtocolHost.exe";

pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Application settings as stored in the JSON settings file.
///
/// Every field has a default, so a partial or missing file is valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub deletion: DeletionSettings,
    pub tools: ToolSettings,
    /// Directories emptied by `clear-cache` when none are given on the command line.
    pub cache_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeletionSettings {
    /// Upper bound on delete attempts; `None` retries until success or a fatal error.
    pub max_attempts: Option<u32>,
    /// Wall-clock budget for one deletion; `None` means no deadline.
    pub timeout_secs: Option<u64>,
    /// Pause after terminating processes so their handles are released.
    pub settle_delay_ms: u64,
    /// Executables terminated on every busy failure whether or not they hold a handle.
    pub always_terminate: Vec<String>,
    /// Principal given ownership and full control on access denied failures.
    pub acl_principal: String,
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            max_attempts: None,
            timeout_secs: None,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            always_terminate: vec![DEFAULT_ALWAYS_TERMINATE.to_string()],
            acl_principal: DEFAULT_PRINCIPAL.to_string(),
        }
    }
}

impl DeletionSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            deadline: self.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Locations of the external tools.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub handle_path: Option<PathBuf>,
    pub set_acl_path: Option<PathBuf>,
    /// Extra directories searched before `PATH`.
    pub search_dirs: Vec<PathBuf>,
}

/// Bounds of the retry loop. Both unset means retry until success or a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

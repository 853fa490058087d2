use std::path::PathBuf;

use directories_next::ProjectDirs;

pub mod classify;
pub mod error;
pub mod ops;

pub use classify::classify_io_error;
pub use error::{FileSystemError, RemoveError};
pub use ops::{FileSystemOps, StdFileSystemOps};

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Returns path to the settings file located in the default config dir for application.
pub fn get_settings_path() -> Result<PathBuf, FileSystemError> {
    Ok(get_project_dirs()?.config_dir().join(SETTINGS_FILE_NAME))
}

/// Returns path to the directory where log files are written.
pub fn get_log_dir() -> Result<PathBuf, FileSystemError> {
    Ok(get_project_dirs()?.data_local_dir().join("logs"))
}

/// Returns path to the directory searched for external tools before `PATH`.
pub fn get_tools_dir() -> Result<PathBuf, FileSystemError> {
    Ok(get_project_dirs()?.data_local_dir().join("tools"))
}

fn get_project_dirs() -> Result<ProjectDirs, FileSystemError> {
    ProjectDirs::from("org", "purgekit", "purgekit").ok_or(FileSystemError::NoProjectDirs)
}

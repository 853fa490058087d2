use std::path::PathBuf;

use crate::ErrorClass;

#[derive(Debug, Clone, PartialEq)]
pub enum DeletionEvent {
    AttemptStarted {
        path: PathBuf,
        attempt: u32,
    },
    AttemptFailed {
        path: PathBuf,
        attempt: u32,
        error_class: ErrorClass,
        message: String,
    },
    ProcessTerminated {
        executable_name: String,
        count: usize,
    },
    AccessReset {
        path: PathBuf,
        principal: String,
    },
    Completed {
        path: PathBuf,
        attempts: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheClearEvent {
    ClearStarted { total_dirs: usize },
    DirStarted { dir: PathBuf, entries: usize },
    EntryDeleted { path: PathBuf },
    EntryFailed { path: PathBuf, error: String },
    ClearCompleted { deleted: usize, failed: usize },
}

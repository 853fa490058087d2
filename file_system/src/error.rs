use std::{io, path::PathBuf};

use core_types::ErrorClass;
use thiserror::Error;

use crate::classify::classify_io_error;

#[derive(Error, Debug)]
pub enum FileSystemError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("{} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Could not determine application directories")]
    NoProjectDirs,
}

/// A failed removal, carrying the entry that actually refused to go away.
///
/// When removing a tree, `path` is the failing descendant rather than the root of the tree.
#[derive(Error, Debug)]
#[error("Failed to remove {}: {source}", .path.display())]
pub struct RemoveError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl RemoveError {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    pub fn error_class(&self) -> ErrorClass {
        classify_io_error(&self.source)
    }
}

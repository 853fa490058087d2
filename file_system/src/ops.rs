//! File system operations abstraction for testing
//!
//! Services take an `Arc<dyn FileSystemOps>` so the forced deletion engine can be driven through
//! scripted failures in tests without touching the real file system.
//!
//! ```rust,ignore
//! use file_system::ops::mock::{MockFileSystemOps, ScriptedRemoval};
//!
//! let mock_fs = MockFileSystemOps::new();
//! mock_fs.add_path("/data/locked/file.txt");
//! mock_fs.push_removal(ScriptedRemoval::busy("/data/locked/file.txt"));
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::error::{FileSystemError, RemoveError};

pub trait FileSystemOps: Send + Sync {
    /// Whether anything (file, directory or dangling link) is present at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Recursively and forcibly removes `path`.
    ///
    /// On failure the returned error names the entry that could not be removed.
    fn remove_tree(&self, path: &Path) -> Result<(), RemoveError>;

    /// Creates `path` and its parents when missing. Returns `true` if the directory was created.
    fn ensure_dir(&self, path: &Path) -> Result<bool, FileSystemError>;

    /// Direct children of a directory.
    fn list_children(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Production implementation using std::fs
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystemOps;

impl FileSystemOps for StdFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        match fs::symlink_metadata(path) {
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            // Cannot prove absence, so report presence.
            Err(_) => true,
        }
    }

    fn remove_tree(&self, path: &Path) -> Result<(), RemoveError> {
        remove_entry(path)
    }

    fn ensure_dir(&self, path: &Path) -> Result<bool, FileSystemError> {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => Ok(false),
            Ok(_) => Err(FileSystemError::NotADirectory(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(path)?;
                tracing::debug!("Created directory {}", path.display());
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list_children(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

fn remove_entry(path: &Path) -> Result<(), RemoveError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        // Somebody else got there first.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(RemoveError::new(path, e)),
    };
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        let entries = fs::read_dir(path).map_err(|e| RemoveError::new(path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| RemoveError::new(path, e))?;
            remove_entry(&entry.path())?;
        }
        clear_readonly(path, &metadata);
        ignore_not_found(fs::remove_dir(path)).map_err(|e| RemoveError::new(path, e))
    } else if file_type.is_symlink() {
        // Directory links on Windows need remove_dir, everything else remove_file.
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(_) => ignore_not_found(fs::remove_dir(path)).map_err(|e| RemoveError::new(path, e)),
        }
    } else {
        clear_readonly(path, &metadata);
        ignore_not_found(fs::remove_file(path)).map_err(|e| RemoveError::new(path, e))
    }
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(windows)]
fn clear_readonly(path: &Path, metadata: &fs::Metadata) {
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        if let Err(e) = fs::set_permissions(path, permissions) {
            tracing::debug!(
                "Could not clear read-only flag on {}: {}",
                path.display(),
                e
            );
        }
    }
}

#[cfg(not(windows))]
fn clear_readonly(_path: &Path, _metadata: &fs::Metadata) {}

pub mod mock {
    use super::*;
    use std::collections::{BTreeSet, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Outcome of one scripted `remove_tree` call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum ScriptedRemoval {
        /// Remove the requested path and everything beneath it.
        Succeed,
        /// Report success but leave the tree in place.
        SucceedWithoutRemoving,
        /// Fail with the given error kind, reporting `path` as the offending entry.
        Fail { path: PathBuf, kind: io::ErrorKind },
    }

    impl ScriptedRemoval {
        pub fn busy(path: impl Into<PathBuf>) -> Self {
            ScriptedRemoval::Fail {
                path: path.into(),
                kind: io::ErrorKind::ResourceBusy,
            }
        }

        pub fn access_denied(path: impl Into<PathBuf>) -> Self {
            ScriptedRemoval::Fail {
                path: path.into(),
                kind: io::ErrorKind::PermissionDenied,
            }
        }

        pub fn fatal(path: impl Into<PathBuf>) -> Self {
            ScriptedRemoval::Fail {
                path: path.into(),
                kind: io::ErrorKind::Other,
            }
        }
    }

    /// Mock implementation for testing.
    ///
    /// Removals are answered from a script in call order; once the script is exhausted every
    /// removal succeeds.
    #[derive(Clone, Default)]
    pub struct MockFileSystemOps {
        existing: Arc<Mutex<BTreeSet<PathBuf>>>,
        removals: Arc<Mutex<VecDeque<ScriptedRemoval>>>,
        remove_calls: Arc<Mutex<Vec<PathBuf>>>,
        created_dirs: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl MockFileSystemOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a path to the mock file system. Its ancestors count as existing too.
        pub fn add_path(&self, path: impl Into<PathBuf>) {
            self.existing.lock().unwrap().insert(path.into());
        }

        pub fn push_removal(&self, removal: ScriptedRemoval) {
            self.removals.lock().unwrap().push_back(removal);
        }

        pub fn remove_calls(&self) -> Vec<PathBuf> {
            self.remove_calls.lock().unwrap().clone()
        }

        pub fn created_dirs(&self) -> Vec<PathBuf> {
            self.created_dirs.lock().unwrap().clone()
        }
    }

    impl FileSystemOps for MockFileSystemOps {
        fn exists(&self, path: &Path) -> bool {
            self.existing
                .lock()
                .unwrap()
                .iter()
                .any(|p| p.starts_with(path))
        }

        fn remove_tree(&self, path: &Path) -> Result<(), RemoveError> {
            self.remove_calls.lock().unwrap().push(path.to_path_buf());
            let removal = self
                .removals
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ScriptedRemoval::Succeed);

            match removal {
                ScriptedRemoval::Succeed => {
                    self.existing
                        .lock()
                        .unwrap()
                        .retain(|p| !p.starts_with(path));
                    Ok(())
                }
                ScriptedRemoval::SucceedWithoutRemoving => Ok(()),
                ScriptedRemoval::Fail { path, kind } => Err(RemoveError::new(
                    path,
                    io::Error::new(kind, "Simulated removal failure"),
                )),
            }
        }

        fn ensure_dir(&self, path: &Path) -> Result<bool, FileSystemError> {
            let created = !self.exists(path);
            if created {
                self.add_path(path);
                self.created_dirs.lock().unwrap().push(path.to_path_buf());
            }
            Ok(created)
        }

        fn list_children(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            let children: BTreeSet<PathBuf> = self
                .existing
                .lock()
                .unwrap()
                .iter()
                .filter_map(|p| {
                    let relative = p.strip_prefix(path).ok()?;
                    let first = relative.components().next()?;
                    Some(path.join(first))
                })
                .collect();
            Ok(children.into_iter().collect())
        }
    }
}

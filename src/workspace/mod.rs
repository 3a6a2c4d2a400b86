// file: src/workspace/mod.rs
// version: 1.1.0
// guid: a6e83b52-0d94-4c7f-b2a1-76f4c09d8e25

//! Workspace lifecycle
//!
//! The child command always executes inside a workspace directory. A
//! persistent workspace is a caller-specified directory or a timestamped
//! directory under the log directory; an ephemeral one is a `tempfile`
//! temporary directory removed when the run finishes. Removal rides on
//! `TempDir`'s drop guard, so even an early error path cannot leak it.

use crate::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory in which the child command executes
pub struct Workspace {
    kind: WorkspaceKind,
}

enum WorkspaceKind {
    /// Removed at the end of the run
    Ephemeral(TempDir),
    /// Survives the run
    Persistent(PathBuf),
}

impl Workspace {
    /// Create the workspace for a run
    ///
    /// `explicit` wins when given; otherwise a persistent run gets a
    /// fresh directory named after the run id under the log directory,
    /// and a non-persistent run gets a temporary directory.
    pub fn create(
        explicit: Option<&Path>,
        persist: bool,
        log_dir: &Path,
        dir_name: &str,
    ) -> Result<Self> {
        if let Some(dir) = explicit {
            ensure_dir(dir)?;
            debug!("Using caller-specified workspace: {}", dir.display());
            return Ok(Self {
                kind: WorkspaceKind::Persistent(dir.to_path_buf()),
            });
        }

        if persist {
            let dir = log_dir.join(dir_name);
            ensure_dir(&dir)?;
            debug!("Created persistent workspace: {}", dir.display());
            return Ok(Self {
                kind: WorkspaceKind::Persistent(dir),
            });
        }

        let temp = tempfile::Builder::new()
            .prefix("runstage-")
            .tempdir()
            .map_err(|e| {
                crate::error::RunnerError::workspace(format!(
                    "Failed to create temporary workspace: {}",
                    e
                ))
            })?;
        debug!("Created temporary workspace: {}", temp.path().display());

        Ok(Self {
            kind: WorkspaceKind::Ephemeral(temp),
        })
    }

    /// Absolute path of the workspace directory
    pub fn path(&self) -> &Path {
        match &self.kind {
            WorkspaceKind::Ephemeral(temp) => temp.path(),
            WorkspaceKind::Persistent(path) => path,
        }
    }

    /// Whether the workspace is removed at the end of the run
    pub fn is_ephemeral(&self) -> bool {
        matches!(self.kind, WorkspaceKind::Ephemeral(_))
    }

    /// Remove an ephemeral workspace; a persistent one is left in place
    pub fn cleanup(self) -> Result<()> {
        match self.kind {
            WorkspaceKind::Ephemeral(temp) => {
                let path = temp.path().to_path_buf();
                temp.close().map_err(|e| {
                    crate::error::RunnerError::workspace(format!(
                        "Failed to remove temporary workspace {}: {}",
                        path.display(),
                        e
                    ))
                })
            }
            WorkspaceKind::Persistent(_) => Ok(()),
        }
    }
}

/// Create a directory, rejecting a path occupied by a non-directory
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(crate::error::RunnerError::workspace(format!(
                "{} exists but is not a directory",
                path.display()
            )));
        }
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| {
        crate::error::RunnerError::workspace(format!(
            "Failed to create directory {}: {}",
            path.display(),
            e
        ))
    })
}

/// Recorded set of paths inside the workspace at one point in time
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSnapshot {
    files: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

impl WorkspaceSnapshot {
    /// Walk the workspace and record every file and directory,
    /// workspace-relative
    pub fn capture(root: &Path) -> Result<Self> {
        let mut files = BTreeSet::new();
        let mut dirs = BTreeSet::new();

        for entry in WalkDir::new(root).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable workspace entry: {}", e);
                    continue;
                }
            };

            let relative = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };

            if entry.file_type().is_dir() {
                dirs.insert(relative);
            } else {
                files.insert(relative);
            }
        }

        Ok(Self { files, dirs })
    }

    /// Paths present in `after` but not in `self`
    pub fn diff(&self, after: &Self) -> SideEffects {
        SideEffects {
            created_files: after.files.difference(&self.files).cloned().collect(),
            created_dirs: after.dirs.difference(&self.dirs).cloned().collect(),
        }
    }
}

/// Files and directories the run created inside the workspace
#[derive(Debug, Clone, Default)]
pub struct SideEffects {
    pub created_files: Vec<PathBuf>,
    pub created_dirs: Vec<PathBuf>,
}

impl SideEffects {
    pub fn is_empty(&self) -> bool {
        self.created_files.is_empty() && self.created_dirs.is_empty()
    }
}

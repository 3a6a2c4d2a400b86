// file: src/artifacts/mod.rs
// version: 1.1.0
// guid: 3f0d7c6e-52b8-4a14-9e07-c1d25a86f4b9

//! Artifact staging
//!
//! After the child command finishes, glob patterns are evaluated relative
//! to the workspace and every match is staged into the artifacts
//! directory, preserving its workspace-relative path. Staging never aborts
//! the run: each failure is collected into the report and the remaining
//! matches are still processed.

use crate::error::RunnerError;
use crate::workspace::ensure_dir;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a matched path is placed into the artifacts directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageMode {
    /// Copy the file or directory tree
    Copy,
    /// Create a symlink pointing back at the workspace path
    Symlink,
}

impl fmt::Display for StageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageMode::Copy => write!(f, "copy"),
            StageMode::Symlink => write!(f, "symlink"),
        }
    }
}

/// One successfully staged artifact
#[derive(Debug, Clone, Serialize)]
pub struct StagedArtifact {
    /// Workspace-relative source path
    pub source: PathBuf,
    /// Absolute destination path
    pub dest: PathBuf,
    pub mode: StageMode,
    pub size_bytes: u64,
    /// SHA256 of the staged copy; absent for directories and symlinks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Outcome of a staging pass
#[derive(Debug, Default)]
pub struct StagingReport {
    pub staged: Vec<StagedArtifact>,
    /// Human-readable description per path that could not be staged
    pub failures: Vec<String>,
    /// Patterns that matched nothing in the workspace
    pub unmatched_patterns: Vec<String>,
}

impl StagingReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Evaluates artifact patterns and stages the matches
pub struct ArtifactStager {
    artifacts_dir: PathBuf,
    mode: StageMode,
}

impl ArtifactStager {
    pub fn new(artifacts_dir: PathBuf, mode: StageMode) -> Self {
        Self {
            artifacts_dir,
            mode,
        }
    }

    /// Evaluate every pattern against the workspace and stage all matches
    ///
    /// The artifacts directory is only created when at least one pattern
    /// was given. Matches are deduplicated across patterns, so overlapping
    /// patterns stage each path once.
    pub async fn stage_all(
        &self,
        workspace: &Path,
        patterns: &[String],
    ) -> Result<StagingReport> {
        let mut report = StagingReport::default();
        if patterns.is_empty() {
            return Ok(report);
        }

        ensure_dir(&self.artifacts_dir)
            .map_err(|e| RunnerError::staging(e.to_string()))?;

        let mut matched = BTreeSet::new();
        // The workspace path must match itself literally even when it
        // contains glob metacharacters; only the pattern part globs
        let root = glob::Pattern::escape(&workspace.to_string_lossy());
        for pattern in patterns {
            let full = format!("{}{}{}", root, std::path::MAIN_SEPARATOR, pattern);
            let mut count = 0usize;

            match glob::glob(&full) {
                Ok(paths) => {
                    for path in paths {
                        match path {
                            Ok(path) => {
                                matched.insert(path);
                                count += 1;
                            }
                            Err(e) => {
                                report
                                    .failures
                                    .push(format!("Pattern '{}': {}", pattern, e));
                            }
                        }
                    }
                }
                Err(e) => {
                    report
                        .failures
                        .push(format!("Invalid pattern '{}': {}", pattern, e));
                    continue;
                }
            }

            if count == 0 {
                warn!("Artifact pattern '{}' matched nothing", pattern);
                report.unmatched_patterns.push(pattern.to_string());
            }
        }

        for source in matched {
            let relative = match source.strip_prefix(workspace) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => {
                    report.failures.push(format!(
                        "{} resolved outside the workspace",
                        source.display()
                    ));
                    continue;
                }
            };

            match self.stage_one(&source, &relative).await {
                Ok(artifact) => {
                    debug!(
                        "Staged {} -> {} ({})",
                        artifact.source.display(),
                        artifact.dest.display(),
                        artifact.mode
                    );
                    report.staged.push(artifact);
                }
                Err(e) => {
                    warn!("Failed to stage {}: {}", relative.display(), e);
                    report.failures.push(format!("{}: {}", relative.display(), e));
                }
            }
        }

        Ok(report)
    }

    async fn stage_one(&self, source: &Path, relative: &Path) -> Result<StagedArtifact> {
        let dest = self.artifacts_dir.join(relative);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RunnerError::staging(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        remove_existing(&dest).await?;

        let metadata = tokio::fs::symlink_metadata(source).await.map_err(|e| {
            RunnerError::staging(format!("Failed to stat {}: {}", source.display(), e))
        })?;

        match self.mode {
            StageMode::Symlink => {
                make_symlink(source, &dest, metadata.is_dir()).await?;
                let size_bytes = if metadata.is_dir() { 0 } else { metadata.len() };
                Ok(StagedArtifact {
                    source: relative.to_path_buf(),
                    dest,
                    mode: StageMode::Symlink,
                    size_bytes,
                    sha256: None,
                })
            }
            StageMode::Copy => {
                if metadata.is_dir() {
                    let size_bytes = copy_dir(source, &dest).await?;
                    Ok(StagedArtifact {
                        source: relative.to_path_buf(),
                        dest,
                        mode: StageMode::Copy,
                        size_bytes,
                        sha256: None,
                    })
                } else {
                    let size_bytes =
                        tokio::fs::copy(source, &dest).await.map_err(|e| {
                            RunnerError::staging(format!(
                                "Failed to copy {}: {}",
                                source.display(),
                                e
                            ))
                        })?;
                    let sha256 = compute_sha256(&dest).await?;
                    Ok(StagedArtifact {
                        source: relative.to_path_buf(),
                        dest,
                        mode: StageMode::Copy,
                        size_bytes,
                        sha256: Some(sha256),
                    })
                }
            }
        }
    }
}

/// Remove whatever currently occupies the destination path
async fn remove_existing(path: &Path) -> Result<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => {
            let removal = if metadata.is_dir() {
                tokio::fs::remove_dir_all(path).await
            } else {
                tokio::fs::remove_file(path).await
            };
            removal.map_err(|e| {
                RunnerError::staging(format!(
                    "Failed to replace existing {}: {}",
                    path.display(),
                    e
                ))
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RunnerError::staging(format!(
            "Failed to stat {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(unix)]
async fn make_symlink(source: &Path, dest: &Path, _is_dir: bool) -> Result<()> {
    tokio::fs::symlink(source, dest).await.map_err(|e| {
        RunnerError::staging(format!("Failed to symlink {}: {}", dest.display(), e))
    })
}

#[cfg(windows)]
async fn make_symlink(source: &Path, dest: &Path, is_dir: bool) -> Result<()> {
    let result = if is_dir {
        tokio::fs::symlink_dir(source, dest).await
    } else {
        tokio::fs::symlink_file(source, dest).await
    };
    result.map_err(|e| {
        RunnerError::staging(format!("Failed to symlink {}: {}", dest.display(), e))
    })
}

/// Copy a directory tree, returning the number of bytes copied
async fn copy_dir(source: &Path, dest: &Path) -> Result<u64> {
    tokio::fs::create_dir_all(dest).await.map_err(|e| {
        RunnerError::staging(format!("Failed to create {}: {}", dest.display(), e))
    })?;

    let source = source.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.overwrite = true;
        options.content_only = true;
        fs_extra::dir::copy(&source, &dest, &options)
    })
    .await
    .map_err(|e| RunnerError::staging(format!("Directory copy task failed: {}", e)))?
    .map_err(|e| RunnerError::staging(format!("Failed to copy directory: {}", e)))
}

/// SHA256 of a staged file, hex-encoded
async fn compute_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        RunnerError::staging(format!(
            "Failed to open {} for checksum: {}",
            path.display(),
            e
        ))
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).await.map_err(|e| {
            RunnerError::staging(format!("Failed to read {}: {}", path.display(), e))
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

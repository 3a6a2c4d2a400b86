// file: src/config/request.rs
// version: 1.1.0
// guid: 6b84d1f0-3c29-47a5-9d7e-508f2ab6c913

//! Resolution of a CLI invocation into an executable run request

use crate::artifacts::StageMode;
use crate::cli::args::Cli;
use crate::config::RunnerConfig;
use crate::Result;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// A fully resolved invocation
///
/// Paths are absolute, defaults merged, patterns validated. Immutable
/// once built; the runner takes it as its single input.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Command and its arguments, in order
    pub command: Vec<String>,
    /// Directory receiving the event log, stream captures and summary
    pub log_dir: PathBuf,
    /// Glob patterns selecting artifacts inside the workspace
    pub artifact_patterns: Vec<String>,
    /// Destination directory for staged artifacts
    pub artifacts_dir: PathBuf,
    /// Copy or symlink artifacts into place
    pub stage_mode: StageMode,
    /// Fail when no pattern matches anything at all
    pub strict_artifacts: bool,
    /// Caller-specified workspace directory, if any
    pub workspace_dir: Option<PathBuf>,
    /// Keep the workspace after the run
    pub persist_workspace: bool,
    /// Kill the child after this long
    pub timeout: Option<Duration>,
    /// Echo captured output and events to the terminal
    pub verbose: bool,
}

impl RunRequest {
    /// Merge CLI flags with loaded defaults into a request
    pub fn from_cli(cli: &Cli, defaults: &RunnerConfig) -> Result<Self> {
        if cli.command.is_empty() {
            return Err(crate::error::RunnerError::invalid_argument(
                "No command provided".to_string(),
            ));
        }

        for pattern in &cli.artifacts {
            validate_artifact_pattern(pattern)?;
        }

        let log_dir = resolve_dir(cli.log_dir.as_deref().unwrap_or(&defaults.log_dir))?;
        let artifacts_dir =
            resolve_dir(cli.artifacts_dir.as_deref().unwrap_or(&defaults.artifacts_dir))?;

        let workspace_dir = match cli.workspace.as_deref() {
            Some(raw) => Some(resolve_dir(raw)?),
            None => None,
        };

        // --workspace implies persistence; --no-persist conflicts with it
        // at the CLI level, so the order of these checks never lies.
        let persist_workspace = if cli.no_persist {
            false
        } else if workspace_dir.is_some() {
            true
        } else {
            defaults.persist_workspace
        };

        let timeout_secs = cli.timeout.or(defaults.timeout_secs);
        if timeout_secs == Some(0) {
            return Err(crate::error::RunnerError::invalid_argument(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        let stage_mode = if cli.symlink_to_artifacts || defaults.symlink_to_artifacts {
            StageMode::Symlink
        } else {
            StageMode::Copy
        };

        Ok(Self {
            command: cli.command.clone(),
            log_dir,
            artifact_patterns: cli.artifacts.clone(),
            artifacts_dir,
            stage_mode,
            strict_artifacts: cli.strict_artifacts,
            workspace_dir,
            persist_workspace,
            timeout: timeout_secs.map(Duration::from_secs),
            verbose: cli.verbose,
        })
    }

    /// The program to execute
    pub fn program(&self) -> &str {
        &self.command[0]
    }

    /// Arguments passed to the program
    pub fn args(&self) -> &[String] {
        &self.command[1..]
    }

    /// Command line as a single displayable string
    pub fn display_command(&self) -> String {
        self.command.join(" ")
    }
}

/// Check an artifact pattern before anything is executed
///
/// Patterns are globs evaluated relative to the workspace root; absolute
/// paths and parent-directory traversal would escape it and are rejected.
pub fn validate_artifact_pattern(pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(crate::error::RunnerError::invalid_argument(
            "Artifact pattern must not be empty".to_string(),
        ));
    }

    glob::Pattern::new(pattern).map_err(|e| {
        crate::error::RunnerError::invalid_argument(format!(
            "Invalid artifact pattern '{}': {}",
            pattern, e
        ))
    })?;

    let path = Path::new(pattern);
    if path.is_absolute() {
        return Err(crate::error::RunnerError::invalid_argument(format!(
            "Artifact pattern '{}' must be relative to the workspace",
            pattern
        )));
    }

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(crate::error::RunnerError::invalid_argument(format!(
            "Artifact pattern '{}' must not leave the workspace",
            pattern
        )));
    }

    Ok(())
}

/// Expand `~` and environment variables in a path-valued flag
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).map_err(|e| {
        crate::error::RunnerError::config(format!("Failed to expand path '{}': {}", raw, e))
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Expand a directory flag, then absolutize against the invocation
/// working directory
fn resolve_dir(raw: &str) -> Result<PathBuf> {
    let path = expand_path(raw)?;
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

// file: src/config/settings.rs
// version: 1.0.0
// guid: 5d07f3b9-4a26-4c81-b5e0-92d18c6a7f34

//! Defaults file structure

use serde::{Deserialize, Serialize};

/// Defaults applied to every invocation, overridable per flag on the
/// command line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Destination directory for staged artifacts
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,

    /// Symlink artifacts instead of copying them
    #[serde(default)]
    pub symlink_to_artifacts: bool,

    /// Keep the workspace directory after the run
    #[serde(default = "default_persist")]
    pub persist_workspace: bool,

    /// Kill the command after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_artifacts_dir() -> String {
    "artifacts".to_string()
}

fn default_persist() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            artifacts_dir: default_artifacts_dir(),
            symlink_to_artifacts: false,
            persist_workspace: default_persist(),
            timeout_secs: None,
        }
    }
}

impl RunnerConfig {
    /// Validate the loaded defaults
    pub fn validate(&self) -> crate::Result<()> {
        if self.log_dir.trim().is_empty() {
            return Err(crate::error::RunnerError::config(
                "log_dir must not be empty".to_string(),
            ));
        }

        if self.artifacts_dir.trim().is_empty() {
            return Err(crate::error::RunnerError::config(
                "artifacts_dir must not be empty".to_string(),
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(crate::error::RunnerError::config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

// file: src/runner/summary.rs
// version: 1.1.0
// guid: e49b0c7d-861a-4f25-b3e9-0a5d72c48f16

//! Run summary metadata
//!
//! Each run writes a `<run id>.json` file next to its logs describing
//! what ran, how it ended and which artifacts were staged. The file is
//! the machine-readable counterpart of the event log.

use crate::artifacts::StagedArtifact;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Child exited with code 0
    Succeeded,
    /// Child exited non-zero or died to a signal
    Failed,
    /// Child exceeded the timeout and was killed
    TimedOut,
    /// Run was canceled by Ctrl-C
    Interrupted,
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Succeeded)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::TimedOut => write!(f, "timed out"),
            RunStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Machine-readable record of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub command: Vec<String>,
    pub workspace: PathBuf,
    pub workspace_persisted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    /// Child exit code; 128+signal when the child died to a signal,
    /// absent when it never ran to completion (timeout, interrupt)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
    pub artifacts: Vec<StagedArtifact>,
}

impl RunSummary {
    /// Write the summary as pretty-printed JSON
    pub async fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

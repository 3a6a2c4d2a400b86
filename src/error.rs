// file: src/error.rs
// version: 1.1.0
// guid: 3f8c2a91-5d47-4e02-b6a8-9c1e74d0f235

use std::io::ErrorKind;
use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Error types for the command runner
///
/// A non-zero exit of the child command is deliberately not represented
/// here: it is an outcome, reported through [`crate::runner::RunOutcome`],
/// and its exit code is propagated untouched.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Artifact staging error: {0}")]
    Staging(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RunnerError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a launch error for a command that could not be started
    pub fn launch(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            command: command.into(),
            source,
        }
    }

    /// Create a launch error for a command that was not found on PATH
    pub fn command_not_found(command: impl Into<String>) -> Self {
        let command = command.into();
        let source =
            std::io::Error::new(ErrorKind::NotFound, format!("no such command: {command}"));
        Self::Launch { command, source }
    }

    /// Create a new workspace error
    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::Workspace(msg.into())
    }

    /// Create a new artifact staging error
    pub fn staging(msg: impl Into<String>) -> Self {
        Self::Staging(msg.into())
    }

    /// Process exit code for this error, following shell conventions:
    /// 127 for a missing command, 126 for a command that exists but
    /// cannot be executed, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Launch { source, .. } => match source.kind() {
                ErrorKind::PermissionDenied => 126,
                _ => 127,
            },
            _ => 1,
        }
    }
}

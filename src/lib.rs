// file: src/lib.rs
// version: 1.1.0
// guid: 1c29f7b6-84d0-4a3e-95c8-7e61d20a4f83

//! # runstage
//!
//! Run a command inside a managed workspace, capture its stdout and
//! stderr byte-for-byte into log files, and stage the artifacts it
//! produced into an artifacts directory by copy or symlink. Workspaces
//! are persistent by default; `--no-persist` runs in a temporary
//! directory removed at exit. The child's exit code is propagated.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod workspace;

pub use error::{Result, RunnerError};

/// Version information for the utility
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

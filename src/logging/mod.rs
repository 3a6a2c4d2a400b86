// file: src/logging/mod.rs
// version: 1.0.0
// guid: 8b1f6d24-9a3c-4e57-8d02-c5f90a7e3b61

//! Logging for the command runner
//!
//! Two distinct concerns live here: `logger` initializes the tracing
//! subscriber that carries the tool's own diagnostics to the terminal,
//! while `runlog` is the per-run event log file written under the log
//! directory. The event log is product output and is written regardless
//! of the tracing filter level.

pub mod logger;
pub mod runlog;

pub use logger::init_logger;
pub use runlog::RunLog;

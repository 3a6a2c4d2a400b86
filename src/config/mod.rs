// file: src/config/mod.rs
// version: 1.0.0
// guid: 2e9a4c17-8b50-4f3d-9e61-a7c2d85b0f49

//! Configuration module for the command runner
//!
//! Handles the optional YAML defaults file and the resolution of a CLI
//! invocation into an executable run request.

pub mod loader;
pub mod request;
pub mod settings;

pub use loader::ConfigLoader;
pub use request::RunRequest;
pub use settings::RunnerConfig;

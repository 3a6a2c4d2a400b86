// file: src/cli/mod.rs
// version: 1.1.0
// guid: 9a50e2d7-b384-46fc-91c6-2e7f08a4d5c1

//! Command line interface for the runner

pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::*;

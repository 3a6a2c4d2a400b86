// file: src/cli/args.rs
// version: 1.1.0
// guid: b2c4e8f1-6a93-4d57-8e20-f17c5a94d6b8

//! Command line argument definitions

use clap::Parser;

#[derive(Parser)]
#[command(name = "runstage")]
#[command(about = "Run a command in a managed workspace, capture its logs and stage its artifacts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Directory for log files
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<String>,

    /// Artifact glob patterns to stage after the run, relative to the workspace
    #[arg(long, value_name = "PATTERN", num_args = 1..)]
    pub artifacts: Vec<String>,

    /// Destination directory for staged artifacts
    #[arg(long, value_name = "DIR")]
    pub artifacts_dir: Option<String>,

    /// Symlink artifacts into place instead of copying them
    #[arg(long)]
    pub symlink_to_artifacts: bool,

    /// Fail when no artifact pattern matches anything
    #[arg(long)]
    pub strict_artifacts: bool,

    /// Use (and keep) this directory as the workspace
    #[arg(long, value_name = "DIR", conflicts_with = "no_persist")]
    pub workspace: Option<String>,

    /// Run in a temporary workspace removed at exit
    #[arg(long)]
    pub no_persist: bool,

    /// Kill the command after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Defaults file (YAML)
    #[arg(long, value_name = "FILE", env = "RUNSTAGE_CONFIG")]
    pub config: Option<String>,

    /// Echo captured output and runner events to the terminal
    #[arg(short, long)]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// The command to run, with its arguments
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

// file: src/main.rs
// version: 1.1.0
// guid: f05a8d23-6b71-4c49-ae92-d84f17c6b035

//! runstage - Main entry point
//!
//! Ctrl-C is observed inside the runner itself so a canceled run still
//! writes its logs, stages what it can and cleans up its workspace;
//! `main` only translates the outcome into the process exit code.

use clap::Parser;
use runstage::{
    cli::{args::Cli, commands::run_command},
    logging::logger,
};
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logger::init_logger(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(1);
    }

    match run_command(&cli).await {
        Ok(outcome) => ExitCode::from(outcome.process_exit_code()),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

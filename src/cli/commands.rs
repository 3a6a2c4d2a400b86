// file: src/cli/commands.rs
// version: 1.1.0
// guid: d7f92c05-4e16-48b3-a9d1-6c80e35b72fa

//! Command implementation for the CLI

use crate::{
    config::{loader::ConfigLoader, request::expand_path, RunRequest},
    runner::{RunOutcome, Runner},
    Result,
};
use tracing::{debug, info};

/// Execute the run described by the parsed command line
pub async fn run_command(cli: &crate::cli::Cli) -> Result<RunOutcome> {
    // The config path takes the same expansion as every other
    // path-valued flag, so RUNSTAGE_CONFIG='~/cfg.yaml' resolves
    let config_path = cli.config.as_deref().map(expand_path).transpose()?;

    let loader = ConfigLoader::new();
    let defaults = loader.load(config_path.as_deref())?;
    debug!("Defaults: {:?}", defaults);

    let request = RunRequest::from_cli(cli, &defaults)?;
    info!("Running: {}", request.display_command());

    let runner = Runner::new(request);
    runner.run().await
}

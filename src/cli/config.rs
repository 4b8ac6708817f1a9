//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::PrepConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a validated `PrepConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Layering: defaults + `OUTPAINT_INCOMING_DIR`, then `--config`, then explicit flags
    pub(crate) fn from_cli(cli: &Cli) -> Result<PrepConfig> {
        let mut config = match &cli.config {
            Some(path) => PrepConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PrepConfig::from_env(),
        };

        if let Some(dir) = &cli.incoming_dir {
            config.incoming_dir.clone_from(dir);
        }
        if let Some(attempts) = cli.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(ms) = cli.timeout_ms {
            config.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = cli.retry_delay_ms {
            config.retry = crate::config::RetryPolicy::Fixed {
                delay: Duration::from_millis(ms),
            };
        }

        config.validate()?;
        Ok(config)
    }
}

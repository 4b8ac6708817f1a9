//! Outpaint preparation CLI
//!
//! Command-line front end over [`PreparationProcessor`].

use super::config::CliConfigBuilder;
use crate::{
    processor::PreparationProcessor,
    tracing_config::{init_cli_tracing, TracingFormat},
    types::{PreparedImages, Resolution, Upload},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Prepare an expanded canvas and outpainting mask from an image file or URL
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "outpaint-prep")]
pub struct Cli {
    /// Local image to treat as an upload
    #[arg(short, long, value_name = "PATH", conflicts_with = "url", required_unless_present = "url")]
    pub file: Option<PathBuf>,

    /// Remote image URL to download
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Canvas size: 256, 512 or 1024 [default: 1024, or the config file value]
    #[arg(short, long, value_name = "PIXELS")]
    pub resolution: Option<u32>,

    /// Working directory for incoming and generated files [default: ./api_incoming]
    #[arg(long, value_name = "DIR")]
    pub incoming_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fetch attempts before giving up
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Per-attempt fetch timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Fixed pause between failed attempts in milliseconds
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,

    /// Request identifier recorded in logs
    #[arg(long)]
    pub id: Option<String>,

    /// Print the resulting paths as JSON
    #[arg(long)]
    pub json: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => Self::Console,
            CliLogFormat::Compact => Self::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Self::Json,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id =
        init_cli_tracing(cli.verbose, cli.log_format.into()).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid configuration")?;
    let processor = PreparationProcessor::new(config).context("Failed to create processor")?;
    let resolution = match cli.resolution {
        Some(value) => Resolution::try_from(value).context("Unsupported resolution")?,
        None => processor.config().resolution,
    };

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            ctrl_c_token.cancel();
        }
    });

    let upload = match &cli.file {
        Some(path) => Some(open_upload(path).await?),
        None => None,
    };

    let request_id = cli.id.clone().unwrap_or_else(|| session_id.clone());
    let span = tracing::info_span!("request", id = %request_id);

    let spinner = create_spinner(cli.json);
    let prepared = processor
        .prepare_with_cancel(upload, cli.url.as_deref(), resolution, &cancel)
        .instrument(span)
        .await;
    spinner.finish_and_clear();

    let prepared = prepared.context("Failed to prepare outpainting inputs")?;
    print_result(&prepared, cli.json)?;
    Ok(())
}

/// Open a local file as an upload stream named after the file
async fn open_upload(path: &Path) -> Result<Upload> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Input path has no file name: {}", path.display()))?;
    Ok(Upload::new(filename, file))
}

fn create_spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Preparing canvas and mask...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_result(prepared: &PreparedImages, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(prepared).context("Failed to serialize result")?;
        println!("{}", out);
    } else {
        println!("source:   {}", prepared.source_path.display());
        println!("expanded: {}", prepared.expanded_path.display());
        println!("mask:     {}", prepared.mask_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_file_and_url_conflict() {
        let result = Cli::try_parse_from(["outpaint-prep", "--file", "a.png", "--url", "https://x/a.png"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_one_source_required() {
        assert!(Cli::try_parse_from(["outpaint-prep"]).is_err());
        let cli = Cli::try_parse_from(["outpaint-prep", "--url", "https://x/a.png", "-r", "512"]).unwrap();
        assert_eq!(cli.resolution, Some(512));
        assert_eq!(cli.log_format, CliLogFormat::Console);
    }
}

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Outpaint Prep
//!
//! Prepares images for AI outpainting (image expansion) requests.
//!
//! A request supplies a source image, either uploaded directly or referenced
//! by URL. The image is persisted into a working directory, then centered on a
//! larger square white canvas. Alongside the canvas a binary alpha mask is
//! written that marks which pixels are original content and which must be
//! generated. An image-edit service consumes both files together with a short
//! text description of the source.
//!
//! ## Features
//!
//! - **Resilient acquisition**: URL downloads retry on a bounded budget with a
//!   configurable pause schedule and honour cancellation
//! - **Safe naming**: upload and URL filenames are reduced to a single
//!   allow-listed path component
//! - **Exact geometry**: floor-centered placement, clipping for oversized
//!   sources, binarized mask alpha
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use outpaint_prep::{prepare_for_expansion, PrepConfig, Resolution};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = PrepConfig::builder()
//!     .incoming_dir("./api_incoming")
//!     .build()?;
//!
//! let prepared = prepare_for_expansion(
//!     None,
//!     Some("https://example.com/photos/cat%20on%20sofa.png"),
//!     Resolution::R1024,
//!     &config,
//! )
//! .await?;
//!
//! println!("canvas: {}", prepared.expanded_path.display());
//! println!("mask:   {}", prepared.mask_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP source images
//! - `tracing-json`: JSON log output for the CLI

pub mod acquire;
pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod download;
pub mod error;
pub mod filename;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

// Public API exports
pub use acquire::FileAcquirer;
pub use canvas::{alpha_stencil, centering_offset, expand_image, CanvasExpander, ExpansionOutput};
pub use collaborators::{
    EditRequest, ImageDescriber, ImageEditor, OutpaintOutcome, OutpaintPipeline, DESCRIPTION_PROMPT,
};
pub use config::{PrepConfig, PrepConfigBuilder, RetryPolicy};
pub use download::{AttemptError, HttpSource, ReqwestSource, RetryingFetcher};
pub use error::{OutpaintError, Result};
pub use filename::{filename_from_url, resolve_filename, sanitize_filename, FALLBACK_FILENAME};
pub use processor::PreparationProcessor;
pub use services::ImageIOService;
pub use types::{ImageBytes, PreparedImages, Resolution, Upload};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Acquire a source image and write its expanded canvas and mask
///
/// This is the one-shot form of [`PreparationProcessor::prepare`]: it builds a
/// processor (and its HTTP client) for this call only.
///
/// # Arguments
///
/// * `upload` - Uploaded image; takes precedence over `url`
/// * `url` - Remote image location, fetched with retries
/// * `resolution` - Canvas side length
/// * `config` - Working directory and retry settings
///
/// # Returns
///
/// The source, expanded and mask paths.
pub async fn prepare_for_expansion(
    upload: Option<Upload>,
    url: Option<&str>,
    resolution: Resolution,
    config: &PrepConfig,
) -> Result<PreparedImages> {
    let processor = PreparationProcessor::new(config.clone())?;
    processor.prepare(upload, url, resolution).await
}

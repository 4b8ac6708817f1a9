//! Preparation processor
//!
//! `PreparationProcessor` ties acquisition and canvas expansion together into
//! the single operation the surrounding service calls per request. It is used
//! by the CLI and by [`crate::collaborators::OutpaintPipeline`].

use crate::{
    acquire::FileAcquirer,
    canvas::CanvasExpander,
    config::PrepConfig,
    download::{HttpSource, ReqwestSource, RetryingFetcher},
    error::{OutpaintError, Result},
    types::{PreparedImages, Resolution, Upload},
};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Acquires a source image and renders its expanded canvas and mask
#[derive(Debug)]
pub struct PreparationProcessor<S = ReqwestSource> {
    config: PrepConfig,
    acquirer: FileAcquirer<S>,
}

impl PreparationProcessor<ReqwestSource> {
    /// Create a processor that fetches URLs over a fresh reqwest client
    ///
    /// Validates the configuration and creates the incoming directory.
    pub fn new(config: PrepConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = RetryingFetcher::from_config(&config)?;
        Self::from_fetcher(config, fetcher)
    }
}

impl<S: HttpSource> PreparationProcessor<S> {
    /// Create a processor over a custom HTTP source
    pub fn with_source(config: PrepConfig, source: S) -> Result<Self> {
        let fetcher = RetryingFetcher::new(source, &config);
        Self::from_fetcher(config, fetcher)
    }

    fn from_fetcher(config: PrepConfig, fetcher: RetryingFetcher<S>) -> Result<Self> {
        config.validate()?;
        config.ensure_incoming_dir()?;
        tracing::debug!(
            incoming_dir = %config.incoming_dir.display(),
            max_attempts = fetcher.max_attempts(),
            "Created preparation processor"
        );
        let acquirer = FileAcquirer::new(&config, fetcher);
        Ok(Self { config, acquirer })
    }

    #[must_use]
    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Acquire the source and expand it to `resolution`
    pub async fn prepare(
        &self,
        upload: Option<Upload>,
        url: Option<&str>,
        resolution: Resolution,
    ) -> Result<PreparedImages> {
        self.prepare_with_cancel(upload, url, resolution, &CancellationToken::new())
            .await
    }

    /// Acquire and expand, aborting a remote fetch when `cancel` fires
    ///
    /// # Errors
    /// Propagates acquisition errors (`InvalidInput`, `FetchExhausted`,
    /// `Cancelled`, `Io`) and expansion errors (`ImageDecode`, `ImageEncode`).
    pub async fn prepare_with_cancel(
        &self,
        upload: Option<Upload>,
        url: Option<&str>,
        resolution: Resolution,
        cancel: &CancellationToken,
    ) -> Result<PreparedImages> {
        let start = Instant::now();
        let source_path = self.acquirer.acquire_with_cancel(upload, url, cancel).await?;

        let expand_source = source_path.clone();
        let output = tokio::task::spawn_blocking(move || CanvasExpander::expand(&expand_source, resolution))
            .await
            .map_err(|e| OutpaintError::internal(format!("Expansion task failed: {}", e)))??;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            resolution = resolution.side(),
            "Prepared outpainting inputs"
        );

        Ok(PreparedImages {
            source_path,
            expanded_path: output.expanded_path,
            mask_path: output.mask_path,
            resolution,
        })
    }

    /// Validate a raw resolution before doing any work, then prepare
    ///
    /// # Errors
    /// - `InvalidResolution` before anything is fetched or written
    pub async fn prepare_checked(
        &self,
        upload: Option<Upload>,
        url: Option<&str>,
        resolution: u32,
    ) -> Result<PreparedImages> {
        let resolution = Resolution::try_from(resolution)?;
        self.prepare(upload, url, resolution).await
    }
}

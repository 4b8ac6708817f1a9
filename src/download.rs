//! Remote image fetching with bounded retries
//!
//! A single GET attempt goes through the [`HttpSource`] seam so the retry loop
//! can be driven by scripted sources in tests. [`RetryingFetcher`] owns the
//! attempt budget, the pause schedule between attempts and cancellation.

use crate::config::{PrepConfig, RetryPolicy};
use crate::error::{OutpaintError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Why a single attempt failed; every variant is retried
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// No complete response within the per-attempt timeout
    #[error("timed out")]
    Timeout,
    /// Server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),
    /// Connection, TLS or body read failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// One HTTP GET attempt
#[async_trait]
pub trait HttpSource: Send + Sync {
    /// Fetch the full response body of `url` within `timeout`
    async fn get(&self, url: &str, timeout: Duration) -> std::result::Result<Vec<u8>, AttemptError>;
}

/// `HttpSource` backed by a `reqwest::Client`
///
/// The client is owned by this value rather than shared process-wide; pass one
/// in with [`ReqwestSource::with_client`] to reuse a connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestSource {
    client: Client,
}

impl ReqwestSource {
    /// Create a source with a fresh HTTP client
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| OutpaintError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSource for ReqwestSource {
    async fn get(&self, url: &str, timeout: Duration) -> std::result::Result<Vec<u8>, AttemptError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify_reqwest_error)?;
        Ok(body.to_vec())
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> AttemptError {
    if error.is_timeout() {
        AttemptError::Timeout
    } else if let Some(status) = error.status() {
        AttemptError::Status(status.as_u16())
    } else {
        AttemptError::Transport(error.to_string())
    }
}

/// Downloads a URL, retrying failed attempts on a bounded budget
#[derive(Debug, Clone)]
pub struct RetryingFetcher<S> {
    source: S,
    timeout: Duration,
    max_attempts: u32,
    retry: RetryPolicy,
}

impl RetryingFetcher<ReqwestSource> {
    /// Fetcher over a fresh reqwest client using the config's retry settings
    pub fn from_config(config: &PrepConfig) -> Result<Self> {
        Ok(Self::new(ReqwestSource::new()?, config))
    }
}

impl<S: HttpSource> RetryingFetcher<S> {
    pub fn new(source: S, config: &PrepConfig) -> Self {
        Self {
            source,
            timeout: config.fetch_timeout,
            max_attempts: config.max_attempts.max(1),
            retry: config.retry,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetch `url`, retrying until success or the attempt budget is spent
    ///
    /// # Errors
    /// - `FetchExhausted` after `max_attempts` failed attempts
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch_with_cancel(url, &CancellationToken::new()).await
    }

    /// Like [`fetch`](Self::fetch), but stops early once `cancel` fires
    ///
    /// Cancellation is checked before every attempt and interrupts the pause
    /// between attempts. An attempt already in flight is also abandoned.
    ///
    /// # Errors
    /// - `Cancelled` when the token fires first
    /// - `FetchExhausted` after `max_attempts` failed attempts
    pub async fn fetch_with_cancel(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let span = tracing::info_span!("fetch", url = %url, max_attempts = self.max_attempts);
        self.run_attempts(url, cancel).instrument(span).await
    }

    async fn run_attempts(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let mut last_error = AttemptError::Transport("no attempt made".to_string());

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(cancelled(url));
            }

            let outcome = tokio::select! {
                () = cancel.cancelled() => return Err(cancelled(url)),
                outcome = tokio::time::timeout(self.timeout, self.source.get(url, self.timeout)) => {
                    outcome.unwrap_or(Err(AttemptError::Timeout))
                },
            };

            match outcome {
                Ok(body) => {
                    tracing::debug!(attempt, bytes = body.len(), "Fetched remote image");
                    return Ok(body);
                },
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = self.max_attempts, error = %e, "Fetch attempt failed");
                    last_error = e;
                },
            }

            if attempt < self.max_attempts {
                let delay = self.retry.delay_after(attempt);
                tokio::select! {
                    () = cancel.cancelled() => return Err(cancelled(url)),
                    () = tokio::time::sleep(delay) => {},
                }
            }
        }

        Err(OutpaintError::FetchExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last_error: last_error.to_string(),
        })
    }
}

fn cancelled(url: &str) -> OutpaintError {
    OutpaintError::Cancelled {
        url: url.to_string(),
    }
}

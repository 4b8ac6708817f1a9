//! Error types for acquisition and canvas expansion

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for outpaint preparation operations
pub type Result<T> = std::result::Result<T, OutpaintError>;

/// Error taxonomy for outpaint preparation
#[derive(Error, Debug)]
pub enum OutpaintError {
    /// Neither an upload nor a URL was supplied, or the URL is unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested canvas size is not one of the supported resolutions
    #[error("Invalid resolution {0}: must be one of 256, 512 or 1024")]
    InvalidResolution(u32),

    /// Remote download failed on every attempt of the retry budget
    #[error("Failed to retrieve {url} after {attempts} attempts: {last_error}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// The caller cancelled an in-flight fetch
    #[error("Fetch of {url} was cancelled")]
    Cancelled { url: String },

    /// Source image could not be decoded
    #[error("Failed to decode image '{}': {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Output image could not be encoded or written
    #[error("Failed to encode image '{}': {source}", path.display())]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// HTTP client construction or other network setup failure
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OutpaintError {
    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether resubmitting the same request could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchExhausted { .. } | Self::Network(_))
    }
}

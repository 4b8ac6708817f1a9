//! Configuration types for acquisition and expansion

use crate::error::{OutpaintError, Result};
use crate::types::Resolution;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default working directory for incoming and generated files
pub const DEFAULT_INCOMING_DIR: &str = "./api_incoming";

/// Environment variable overriding the working directory
pub const INCOMING_DIR_ENV: &str = "OUTPAINT_INCOMING_DIR";

/// Delay schedule between failed fetch attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Same pause after every failed attempt
    Fixed {
        #[serde(with = "duration_ms")]
        delay: Duration,
    },
    /// Pause doubles after each failed attempt, capped at `max`
    Exponential {
        #[serde(with = "duration_ms")]
        initial: Duration,
        #[serde(with = "duration_ms")]
        max: Duration,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Pause to take after the given failed attempt (1-based)
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay } => delay,
            Self::Exponential { initial, max } => {
                let shift = failed_attempt.saturating_sub(1).min(31);
                initial.saturating_mul(1u32 << shift).min(max)
            },
        }
    }
}

/// Configuration for preparing outpainting inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Directory holding sources and generated canvases/masks
    pub incoming_dir: PathBuf,

    /// Per-attempt HTTP timeout
    #[serde(with = "duration_ms")]
    pub fetch_timeout: Duration,

    /// Number of fetch attempts before giving up (>= 1)
    pub max_attempts: u32,

    /// Pause schedule between failed attempts
    pub retry: RetryPolicy,

    /// Canvas size for expansion
    pub resolution: Resolution,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            incoming_dir: PathBuf::from(DEFAULT_INCOMING_DIR),
            fetch_timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry: RetryPolicy::default(),
            resolution: Resolution::default(),
        }
    }
}

impl PrepConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use outpaint_prep::{PrepConfig, Resolution};
    ///
    /// let config = PrepConfig::builder()
    ///     .incoming_dir("/tmp/outpaint")
    ///     .resolution(Resolution::R512)
    ///     .max_attempts(5)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.max_attempts, 5);
    /// ```
    #[must_use]
    pub fn builder() -> PrepConfigBuilder {
        PrepConfigBuilder::default()
    }

    /// Defaults with the working directory taken from `OUTPAINT_INCOMING_DIR` when set
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(INCOMING_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.incoming_dir = PathBuf::from(dir);
            }
        }
        config
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| OutpaintError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            OutpaintError::invalid_config(format!(
                "Failed to parse config '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - `max_attempts` is zero
    /// - `fetch_timeout` is zero
    /// - exponential retry cap is below its initial delay
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(OutpaintError::config_value_error(
                "max attempts",
                self.max_attempts,
                ">= 1",
                Some(3),
            ));
        }

        if self.fetch_timeout.is_zero() {
            return Err(OutpaintError::config_value_error(
                "fetch timeout (ms)",
                self.fetch_timeout.as_millis(),
                "> 0",
                Some(5000),
            ));
        }

        if let RetryPolicy::Exponential { initial, max } = self.retry {
            if max < initial {
                return Err(OutpaintError::invalid_config(format!(
                    "Invalid exponential retry: max delay {}ms is below initial delay {}ms",
                    max.as_millis(),
                    initial.as_millis()
                )));
            }
        }

        Ok(())
    }

    /// Create the working directory if it does not exist yet
    pub fn ensure_incoming_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.incoming_dir).map_err(|e| {
            OutpaintError::file_io_error("create incoming directory", &self.incoming_dir, &e)
        })
    }
}

/// Builder for `PrepConfig`
#[derive(Debug, Default)]
pub struct PrepConfigBuilder {
    config: PrepConfig,
}

impl PrepConfigBuilder {
    #[must_use]
    pub fn incoming_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.incoming_dir = dir.into();
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Shorthand for a fixed delay between attempts
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry = RetryPolicy::Fixed { delay };
        self
    }

    #[must_use]
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.config.resolution = resolution;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<PrepConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Serialize durations as integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(crate) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = PrepConfig::default();
        assert_eq!(config.incoming_dir, PathBuf::from("./api_incoming"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(
            config.retry,
            RetryPolicy::Fixed {
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(config.resolution, Resolution::R1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let err = PrepConfig::builder().max_attempts(0).build().unwrap_err();
        assert!(err.to_string().contains("max attempts"));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let result = PrepConfig::builder().fetch_timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(OutpaintError::InvalidConfig(_))));
    }

    #[test]
    fn test_validation_rejects_inverted_exponential_bounds() {
        let result = PrepConfig::builder()
            .retry(RetryPolicy::Exponential {
                initial: Duration::from_secs(4),
                max: Duration::from_secs(1),
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_exponential_delay_doubles_and_caps() {
        let policy = RetryPolicy::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(350));
        assert_eq!(policy.delay_after(40), Duration::from_millis(350));
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), policy.delay_after(7));
    }

    #[test]
    fn test_json_round_trip_uses_milliseconds() {
        let config = PrepConfig::builder()
            .fetch_timeout(Duration::from_millis(1500))
            .resolution(Resolution::R256)
            .build()
            .unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["fetch_timeout"], 1500);
        assert_eq!(json["resolution"], 256);
        assert_eq!(json["retry"]["kind"], "fixed");
        assert_eq!(json["retry"]["delay"], 2000);
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_attempts": 5, "resolution": 512}"#).unwrap();

        let config = PrepConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.resolution, Resolution::R512);
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_json_file_rejects_bad_resolution() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"resolution": 300}"#).unwrap();

        assert!(matches!(
            PrepConfig::from_json_file(&path),
            Err(OutpaintError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_ensure_incoming_dir_creates_nested() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a").join("b");
        let config = PrepConfig::builder().incoming_dir(&target).build().unwrap();
        config.ensure_incoming_dir().unwrap();
        assert!(target.is_dir());
    }
}

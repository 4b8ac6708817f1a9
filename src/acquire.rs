//! Persisting the request's source image into the incoming directory

use crate::config::PrepConfig;
use crate::download::{HttpSource, RetryingFetcher};
use crate::error::{OutpaintError, Result};
use crate::filename::resolve_incoming_path;
use crate::types::{ImageBytes, Upload};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Takes an upload or a URL and writes the image bytes to a local path
#[derive(Debug)]
pub struct FileAcquirer<S> {
    incoming_dir: PathBuf,
    fetcher: RetryingFetcher<S>,
}

impl<S: HttpSource> FileAcquirer<S> {
    pub fn new(config: &PrepConfig, fetcher: RetryingFetcher<S>) -> Self {
        Self {
            incoming_dir: config.incoming_dir.clone(),
            fetcher,
        }
    }

    #[must_use]
    pub fn incoming_dir(&self) -> &Path {
        &self.incoming_dir
    }

    /// Acquire the source image and return where it was written
    ///
    /// An upload takes precedence over a URL. The target file is truncated and
    /// overwritten; a failure mid-write can leave a partial file.
    ///
    /// # Errors
    /// - `InvalidInput` when neither source is given
    /// - `FetchExhausted` / `Cancelled` from the remote fetch
    /// - `Io` when reading the upload or writing the file fails
    pub async fn acquire(&self, upload: Option<Upload>, url: Option<&str>) -> Result<PathBuf> {
        self.acquire_with_cancel(upload, url, &CancellationToken::new())
            .await
    }

    /// Like [`acquire`](Self::acquire), with a token that aborts a remote fetch
    pub async fn acquire_with_cancel(
        &self,
        upload: Option<Upload>,
        url: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let path = resolve_incoming_path(
            &self.incoming_dir,
            upload.as_ref().map(|u| u.filename.as_str()),
            url,
        )?;
        let kind = if upload.is_some() { "upload" } else { "url" };
        let span = tracing::info_span!("acquire", source = kind, path = %path.display());

        async {
            let bytes = match (upload, url) {
                (Some(upload), _) => upload
                    .read_all()
                    .await
                    .map_err(|e| OutpaintError::file_io_error("read upload stream", &path, &e))?,
                (None, Some(url)) => ImageBytes::new(self.fetcher.fetch_with_cancel(url, cancel).await?),
                (None, None) => {
                    return Err(OutpaintError::invalid_input(
                        "Either file or URL must be provided",
                    ))
                },
            };

            if bytes.is_empty() {
                tracing::warn!("Incoming image is empty, decoding will fail");
            }
            write_incoming(&path, &bytes).await?;
            tracing::info!(
                bytes = bytes.len(),
                format = ?bytes.format(),
                "Stored incoming image"
            );
            Ok::<PathBuf, OutpaintError>(path.clone())
        }
        .instrument(span)
        .await
    }
}

async fn write_incoming(path: &Path, bytes: &ImageBytes) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| OutpaintError::file_io_error("create incoming directory", parent, &e))?;
    }
    tokio::fs::write(path, bytes.as_slice())
        .await
        .map_err(|e| OutpaintError::file_io_error("write incoming file", path, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::AttemptError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone)]
    struct FixedSource {
        body: Option<Vec<u8>>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl HttpSource for FixedSource {
        async fn get(&self, _url: &str, _timeout: Duration) -> std::result::Result<Vec<u8>, AttemptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone().ok_or(AttemptError::Status(404))
        }
    }

    fn acquirer(dir: &Path, body: Option<Vec<u8>>) -> (FileAcquirer<FixedSource>, Arc<AtomicU32>) {
        let config = PrepConfig::builder()
            .incoming_dir(dir)
            .retry_delay(Duration::from_millis(1))
            .build()
            .unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let source = FixedSource {
            body,
            calls: Arc::clone(&calls),
        };
        (FileAcquirer::new(&config, RetryingFetcher::new(source, &config)), calls)
    }

    #[tokio::test]
    async fn test_upload_written_verbatim() {
        let dir = TempDir::new().unwrap();
        let (acquirer, calls) = acquirer(dir.path(), Some(b"remote".to_vec()));

        let upload = Upload::from_bytes("shot.png", b"local-bytes".to_vec());
        let path = acquirer
            .acquire(Some(upload), Some("https://x/other.png"))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("shot.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"local-bytes");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_url_fetched_and_written() {
        let dir = TempDir::new().unwrap();
        let (acquirer, calls) = acquirer(dir.path(), Some(b"remote".to_vec()));

        let path = acquirer.acquire(None, Some("https://x/a%20b.png")).await.unwrap();

        assert_eq!(path, dir.path().join("a b.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"remote");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_existing_file_is_truncated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pic.png"), vec![0u8; 64]).unwrap();
        let (acquirer, _) = acquirer(dir.path(), None);

        let upload = Upload::from_bytes("pic.png", vec![1, 2, 3]);
        let path = acquirer.acquire(Some(upload), None).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("api_incoming");
        let (acquirer, _) = acquirer(&nested, None);
        assert_eq!(acquirer.incoming_dir(), nested.as_path());

        let upload = Upload::from_bytes("a.png", vec![9]);
        let path = acquirer.acquire(Some(upload), None).await.unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_neither_source_fails() {
        let dir = TempDir::new().unwrap();
        let (acquirer, _) = acquirer(dir.path(), None);

        let err = acquirer.acquire(None, None).await.unwrap_err();
        assert!(matches!(err, OutpaintError::InvalidInput(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_fetch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (acquirer, calls) = acquirer(dir.path(), None);

        let err = acquirer.acquire(None, Some("https://x/gone.png")).await.unwrap_err();
        assert!(matches!(err, OutpaintError::FetchExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!dir.path().join("gone.png").exists());
    }

    #[tokio::test]
    async fn test_traversal_in_upload_name_is_contained() {
        let dir = TempDir::new().unwrap();
        let (acquirer, _) = acquirer(dir.path(), None);

        let upload = Upload::from_bytes("../../escape.png", vec![1]);
        let path = acquirer.acquire(Some(upload), None).await.unwrap();
        assert_eq!(path, dir.path().join("escape.png"));
    }
}

//! Source video download over HTTP.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};

/// Streaming downloader with a wall-clock timeout and a size cap.
#[derive(Clone)]
pub struct SourceDownloader {
    http: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl SourceDownloader {
    pub fn new(timeout: Duration, max_bytes: u64) -> WorkerResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("vidpress-worker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WorkerError::config_error(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            timeout,
            max_bytes,
        })
    }

    /// Fetch `url` into `dest`, streaming to disk.
    ///
    /// Returns the number of bytes written. The timeout covers the
    /// whole transfer, not just the first byte; the size cap aborts
    /// the transfer as soon as it is crossed.
    pub async fn fetch(&self, url: &str, dest: impl AsRef<Path>) -> WorkerResult<u64> {
        let dest = dest.as_ref();
        debug!("Downloading {} to {}", url, dest.display());

        let result = tokio::time::timeout(self.timeout, self.fetch_inner(url, dest)).await;

        match result {
            Ok(inner) => inner,
            Err(_) => {
                // Remove the partial file; the workspace guard would get
                // it too, but not before validation could see it.
                tokio::fs::remove_file(dest).await.ok();
                Err(WorkerError::DownloadTimeout(self.timeout.as_secs()))
            }
        }
    }

    async fn fetch_inner(&self, url: &str, dest: &Path) -> WorkerResult<u64> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WorkerError::download_failed(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(WorkerError::SourceNotFound(url.to_string()));
            }
            StatusCode::FORBIDDEN => {
                return Err(WorkerError::SourceForbidden(url.to_string()));
            }
            status if !status.is_success() => {
                return Err(WorkerError::download_failed(format!(
                    "{} returned HTTP {}",
                    url, status
                )));
            }
            _ => {}
        }

        // Reject early when the server announces an oversized body.
        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(WorkerError::download_failed(format!(
                    "content length {} exceeds cap of {} bytes",
                    len, self.max_bytes
                )));
            }
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| WorkerError::download_failed(e.to_string()))?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                drop(file);
                tokio::fs::remove_file(dest).await.ok();
                return Err(WorkerError::download_failed(format!(
                    "download exceeded cap of {} bytes",
                    self.max_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        info!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn downloader() -> SourceDownloader {
        SourceDownloader::new(Duration::from_secs(5), 1024 * 1024).unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_host_is_download_failure() {
        let dir = TempDir::new().unwrap();
        let err = downloader()
            .fetch("http://127.0.0.1:1/v.mp4", dir.path().join("v.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::DownloadFailed(_) | WorkerError::DownloadTimeout(_)
        ));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("v.mp4");
        let d = SourceDownloader::new(Duration::from_millis(50), 1024).unwrap();
        // Non-routable address: either the connect fails outright or the
        // transfer timeout fires; neither may leave a file behind.
        let err = d.fetch("http://10.255.255.1/v.mp4", &dest).await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::DownloadTimeout(_) | WorkerError::DownloadFailed(_)
        ));
        assert!(!dest.exists());
    }
}

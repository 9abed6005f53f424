//! Recording Sources
//!
//! The [`Downloader`] seam and its HTTP and local-file implementations.
//! The Telegram implementation lives with the Telegram channel.

use crate::error::DownloadError;
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the bytes of a source recording.
///
/// Implementations must surface HTTP-style failures as
/// [`DownloadError::Status`] rather than returning partial bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Downloads a recording from a URL.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    max_bytes: u64,
}

impl HttpDownloader {
    /// `timeout` bounds the whole request, body included.
    pub fn new(max_bytes: u64, timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| DownloadError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, max_bytes))
    }

    pub fn with_client(client: Client, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    fn too_large(&self, size: u64) -> DownloadError {
        DownloadError::TooLarge {
            size,
            limit: self.max_bytes,
        }
    }
}

fn request_error(e: reqwest::Error) -> DownloadError {
    if e.is_timeout() {
        DownloadError::TimedOut
    } else {
        DownloadError::Request(e.without_url().to_string())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let mut response = self.client.get(url).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len > self.max_bytes
        {
            return Err(self.too_large(len));
        }

        // The length header is optional, so the limit is enforced while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            let total = (bytes.len() + chunk.len()) as u64;
            if total > self.max_bytes {
                return Err(self.too_large(total));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(DownloadError::Empty);
        }

        tracing::debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes)
    }
}

/// Reads a recording from the local filesystem. Used by `voicemorph apply`.
#[derive(Debug, Clone, Default)]
pub struct FileSource;

#[async_trait]
impl Downloader for FileSource {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, DownloadError> {
        let path = PathBuf::from(source);
        let bytes = tokio::fs::read(&path).await?;
        if bytes.is_empty() {
            return Err(DownloadError::Empty);
        }
        Ok(bytes)
    }
}

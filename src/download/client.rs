//! HTTP client wrapper for fetching documents and service responses.
//!
//! This module provides the `HttpClient` struct which handles buffered and
//! streaming GETs with proper timeout configuration and error handling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::retry::{RetryPolicy, classify_error, classify_error_any_status, run_with_retry};
use crate::user_agent;

/// Connect timeout for metadata and classification lookups.
const SERVICE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Read timeout for metadata and classification lookups.
const SERVICE_READ_TIMEOUT_SECS: u64 = 30;

/// HTTP client for document transfers and service lookups.
///
/// This client is designed to be created once and reused for many requests,
/// taking advantage of connection pooling. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use harvester_core::download::{HttpClient, RetryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let (bytes, attempts) = client
///     .fetch_bytes_with_retry("https://example.com/file.pdf", &RetryPolicy::archive_fetch())
///     .await
///     .map_err(|(e, _)| e)?;
/// println!("fetched {} bytes in {attempts} attempt(s)", bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

/// Result of a streamed download to disk.
#[derive(Debug, Clone)]
pub struct DownloadFileResult {
    /// Final output path.
    pub path: PathBuf,
    /// Bytes written to the file.
    pub bytes_downloaded: u64,
    /// Attempts needed to get a success response.
    pub attempts: u32,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client for document transfers with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large documents)
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a transfer client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = build_client(
            user_agent::default_transfer_user_agent(),
            connect_timeout_secs,
            read_timeout_secs,
        )
        .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Creates a client for metadata and classification lookups.
    ///
    /// Uses shorter timeouts than the transfer client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn for_services() -> Self {
        let client = build_client(
            user_agent::default_service_user_agent(),
            SERVICE_CONNECT_TIMEOUT_SECS,
            SERVICE_READ_TIMEOUT_SECS,
        )
        .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Sends a GET and returns the response if its status is a success.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails, or
    /// the server answers with a non-success status.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), reason = ?status.canonical_reason(), "non-success response");
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }

    /// Fetches a response body into memory.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`get`](Self::get), plus network errors
    /// raised while reading the body.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, DownloadError> {
        let response = self.get(url).await?;
        response
            .bytes()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))
    }

    /// Fetches a response body as text.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`fetch_bytes`](Self::fetch_bytes).
    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))
    }

    /// Fetches a body into memory, retrying gateway errors and transport failures.
    ///
    /// Only 500, 502, 503, and 504 responses (plus timeouts and connection
    /// errors) are retried; any other status fails immediately.
    ///
    /// # Errors
    ///
    /// Returns the last error and the number of attempts made.
    #[instrument(skip(self, policy), fields(url = %url))]
    pub async fn fetch_bytes_with_retry(
        &self,
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<(Bytes, u32), (DownloadError, u32)> {
        run_with_retry(policy, classify_error, url, |_| self.fetch_bytes(url)).await
    }

    /// Streams a document to `file_path`, retrying until a success response.
    ///
    /// Every non-success status is retried under `policy`. Once a success
    /// response arrives the body is streamed to disk; a failure while
    /// writing is returned immediately and the partial file is removed.
    ///
    /// # Errors
    ///
    /// Returns the last error and the number of attempts made.
    #[instrument(skip(self, policy), fields(url = %url, path = %file_path.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        file_path: &Path,
        policy: &RetryPolicy,
    ) -> Result<DownloadFileResult, (DownloadError, u32)> {
        let (response, attempts) =
            run_with_retry(policy, classify_error_any_status, url, |_| self.get(url)).await?;

        let mut file = File::create(file_path)
            .await
            .map_err(|e| (DownloadError::io(file_path, e), attempts))?;

        let stream_result = stream_to_file(&mut file, response, url, file_path).await;
        if stream_result.is_err() {
            debug!(path = %file_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(file_path).await;
        }
        let bytes_downloaded = stream_result.map_err(|e| (e, attempts))?;

        info!(
            path = %file_path.display(),
            bytes = bytes_downloaded,
            attempts,
            "download complete"
        );

        Ok(DownloadFileResult {
            path: file_path.to_path_buf(),
            bytes_downloaded,
            attempts,
        })
    }
}

/// Streams response body to file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

fn build_client(
    user_agent: String,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent)
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_rejects_invalid_url() {
        let client = HttpClient::new();
        let result = client.get("not a url").await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_fetch_bytes_with_retry_invalid_url_is_single_attempt() {
        let client = HttpClient::new();
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(1), 1.0);
        let (error, attempts) = client
            .fetch_bytes_with_retry("::bad::", &policy)
            .await
            .unwrap_err();
        assert!(matches!(error, DownloadError::InvalidUrl { .. }));
        assert_eq!(attempts, 1);
    }
}

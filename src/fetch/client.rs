//! HTTP client wrapper for probing and transferring candidate files.
//!
//! Two requests are made per accepted URL: a HEAD probe with a short total
//! timeout, then a streamed GET whose body is written to a staging path.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT, PROBE_TIMEOUT, TRANSFER_TIMEOUT, WRITE_CHUNK_SIZE};
use super::error::FetchError;
use super::policy::ProbeHeaders;
use crate::user_agent;

/// HTTP client for header probes and streaming transfers.
///
/// Create once and reuse for every URL to benefit from connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    probe_client: Client,
    probe_timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default probe (5s) and transfer (10s) timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT, PROBE_TIMEOUT, TRANSFER_TIMEOUT)
    }

    /// Creates a client with explicit timeouts.
    ///
    /// `probe_timeout` bounds the whole HEAD exchange; `transfer_timeout` is a
    /// read timeout, so a slow but steadily progressing body is not cut off.
    ///
    /// Probes go through a separate client without gzip decoding: the decoder
    /// drops `Content-Length` from encoded responses, which would hide the
    /// declared size from the policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the supplied configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(
        connect_timeout: Duration,
        probe_timeout: Duration,
        transfer_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(transfer_timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        let probe_client = Client::builder()
            .connect_timeout(connect_timeout)
            .no_gzip()
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP probe client with static configuration");
        Self {
            client,
            probe_client,
            probe_timeout,
        }
    }

    /// Issues a metadata-only HEAD request and returns the policy headers.
    ///
    /// # Errors
    ///
    /// Returns a network-class [`FetchError`] if the URL is invalid, the
    /// request fails or times out, or the status is not a success.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe(&self, url: &str) -> Result<ProbeHeaders, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .probe_client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        ensure_success(url, &response)?;

        let headers = ProbeHeaders::from_header_map(response.headers());
        debug!(
            content_type = ?headers.content_type,
            content_length = headers.content_length,
            content_disposition = ?headers.content_disposition,
            "probe complete"
        );
        Ok(headers)
    }

    /// Streams the body of `url` into `temp_path`, returning bytes written.
    ///
    /// A partially written staging file is removed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns a network-class [`FetchError`] for request or status failures
    /// and [`FetchError::Io`] if the staging file cannot be written.
    #[instrument(skip(self, temp_path), fields(url = %url, temp = %temp_path.display()))]
    pub async fn transfer(&self, url: &str, temp_path: &Path) -> Result<u64, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        ensure_success(url, &response)?;

        let file = File::create(temp_path)
            .await
            .map_err(|e| FetchError::io(temp_path, e))?;

        let result = stream_to_file(file, response, url, temp_path).await;
        if result.is_err() {
            debug!(path = %temp_path.display(), "removing partial staging file after error");
            let _ = tokio::fs::remove_file(temp_path).await;
        }
        let bytes = result?;

        debug!(bytes, "transfer complete");
        Ok(bytes)
    }
}

fn ensure_success(url: &str, response: &reqwest::Response) -> Result<(), FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::http_status(url, status.as_u16()))
    }
}

/// Streams response body to file through a fixed-size write buffer.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::with_capacity(WRITE_CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;

    Ok(bytes_written)
}

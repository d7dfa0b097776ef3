//! Per-URL fetch pipeline with content-hash deduplication.
//!
//! Each call to [`Downloader::run`] walks one URL through
//! probe → policy → transfer → hash → finalize and ends in exactly one
//! [`FetchOutcome`]. Failures are returned as outcomes rather than errors so
//! a bad URL never stops the caller's sequence.
//!
//! The seen-hash set is owned by the [`Downloader`] and mutated through
//! `&mut self`, so two runs can never observe it at the same time.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::constants::{CONNECT_TIMEOUT, DEFAULT_DOWNLOAD_DIR, PROBE_TIMEOUT, TRANSFER_TIMEOUT};
use super::error::FetchError;
use super::filename::temp_path_for;
use super::hash::hash_file;
use super::policy::{FetchPolicy, PolicyRejection};

/// Settings for a [`Downloader`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Base directory for saved files; created if missing.
    pub download_dir: PathBuf,
    /// Type, size, and extension gates.
    pub policy: FetchPolicy,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Total timeout for the HEAD probe.
    pub probe_timeout: Duration,
    /// Read timeout for the body transfer.
    pub transfer_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            policy: FetchPolicy::default(),
            connect_timeout: CONNECT_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
            transfer_timeout: TRANSFER_TIMEOUT,
        }
    }
}

impl FetcherConfig {
    /// Default settings rooted at `download_dir`.
    #[must_use]
    pub fn with_download_dir(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            ..Self::default()
        }
    }
}

/// A file promoted to its final path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// Final location under the download directory.
    pub path: PathBuf,
    /// Hex SHA-256 of the content.
    pub hash: String,
}

/// Result of promoting a staged transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalized {
    /// New content; renamed into place and recorded.
    Saved(SavedFile),
    /// Content already seen; staging file deleted.
    Duplicate {
        /// Hex SHA-256 of the discarded content.
        hash: String,
    },
}

/// Terminal state of one [`Downloader::run`] call.
#[derive(Debug)]
pub enum FetchOutcome {
    /// New content saved to disk.
    Saved {
        /// Where and under which hash the file landed.
        file: SavedFile,
        /// Bytes transferred.
        bytes: u64,
    },
    /// Content matched an earlier transfer and was discarded.
    Duplicate {
        /// Hex SHA-256 of the discarded content.
        hash: String,
    },
    /// The probe headers failed the policy; no body was fetched.
    Rejected(PolicyRejection),
    /// A network or local I/O failure stopped this URL.
    Failed(FetchError),
}

impl FetchOutcome {
    /// True for saved and duplicate outcomes.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Saved { .. } | Self::Duplicate { .. })
    }

    /// Stable status label (`saved`, `duplicate`, `rejected`, `failed`).
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Saved { .. } => "saved",
            Self::Duplicate { .. } => "duplicate",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { file, bytes } => {
                write!(f, "saved {} ({bytes} bytes)", file.path.display())
            }
            Self::Duplicate { hash } => write!(f, "duplicate of {hash}, discarded"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::Failed(error) => write!(f, "failed: {error}"),
        }
    }
}

/// Outcome counts over a sequence of runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    /// Files saved.
    pub saved: usize,
    /// Transfers discarded as duplicates.
    pub duplicates: usize,
    /// Candidates turned away by policy.
    pub rejected: usize,
    /// Candidates that hit a network or I/O failure.
    pub failed: usize,
}

impl FetchStats {
    /// Counts one outcome.
    pub fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Saved { .. } => self.saved += 1,
            FetchOutcome::Duplicate { .. } => self.duplicates += 1,
            FetchOutcome::Rejected(_) => self.rejected += 1,
            FetchOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Total URLs processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.saved + self.duplicates + self.rejected + self.failed
    }
}

/// One URL paired with its outcome, in processing order.
#[derive(Debug)]
pub struct FetchReport {
    /// The URL as supplied.
    pub url: String,
    /// What happened to it.
    pub outcome: FetchOutcome,
}

/// Promotes a staged file, or discards it if its hash was seen before.
///
/// The hash is recorded only once the rename has succeeded.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if the staging file cannot be removed or renamed.
pub async fn finalize(
    temp_path: &Path,
    final_path: &Path,
    hash: String,
    seen_hashes: &mut HashSet<String>,
) -> Result<Finalized, FetchError> {
    if seen_hashes.contains(&hash) {
        tokio::fs::remove_file(temp_path)
            .await
            .map_err(|e| FetchError::io(temp_path, e))?;
        return Ok(Finalized::Duplicate { hash });
    }

    tokio::fs::rename(temp_path, final_path)
        .await
        .map_err(|e| FetchError::io(final_path, e))?;
    seen_hashes.insert(hash.clone());

    Ok(Finalized::Saved(SavedFile {
        path: final_path.to_path_buf(),
        hash,
    }))
}

/// Fetches URLs one at a time into a directory, skipping repeated content.
#[derive(Debug)]
pub struct Downloader {
    client: HttpClient,
    policy: FetchPolicy,
    download_dir: PathBuf,
    seen_hashes: HashSet<String>,
}

impl Downloader {
    /// Creates a downloader, creating the download directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the directory cannot be created.
    pub async fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = HttpClient::new_with_timeouts(
            config.connect_timeout,
            config.probe_timeout,
            config.transfer_timeout,
        );
        Self::with_client(config, client).await
    }

    /// Creates a downloader that uses an existing client.
    ///
    /// The timeouts in `config` are ignored; the client's own apply.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the directory cannot be created.
    pub async fn with_client(
        config: FetcherConfig,
        client: HttpClient,
    ) -> Result<Self, FetchError> {
        tokio::fs::create_dir_all(&config.download_dir)
            .await
            .map_err(|e| FetchError::io(&config.download_dir, e))?;
        debug!(dir = %config.download_dir.display(), "download directory ready");

        Ok(Self {
            client,
            policy: config.policy,
            download_dir: config.download_dir,
            seen_hashes: HashSet::new(),
        })
    }

    /// Directory files are saved into.
    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Hashes of every file saved so far by this instance.
    #[must_use]
    pub fn seen_hashes(&self) -> &HashSet<String> {
        &self.seen_hashes
    }

    /// Runs one URL through the whole pipeline.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn run(&mut self, url: &str) -> FetchOutcome {
        info!("processing URL");
        let outcome = match self.try_run(url).await {
            Ok(outcome) => outcome,
            Err(error) => FetchOutcome::Failed(error),
        };

        match &outcome {
            FetchOutcome::Saved { file, bytes } => {
                info!(path = %file.path.display(), bytes, hash = %file.hash, "saved");
            }
            FetchOutcome::Duplicate { hash } => {
                info!(%hash, "duplicate content detected, discarded");
            }
            FetchOutcome::Rejected(reason) => {
                warn!(reason = %reason, "skipped by policy");
            }
            FetchOutcome::Failed(error) => {
                warn!(error = %error, kind = error.kind(), "fetch failed");
            }
        }
        outcome
    }

    /// Runs each URL in order, waiting for one to finish before the next.
    pub async fn run_all<I, S>(&mut self, urls: I) -> Vec<FetchReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut reports = Vec::new();
        for url in urls {
            let url = url.into();
            let outcome = self.run(&url).await;
            reports.push(FetchReport { url, outcome });
        }
        reports
    }

    async fn try_run(&mut self, url: &str) -> Result<FetchOutcome, FetchError> {
        let headers = self.client.probe(url).await?;
        info!(
            content_type = ?headers.content_type,
            content_length = headers.content_length,
            content_disposition = ?headers.content_disposition,
            "headers found"
        );

        let filename = match self.policy.decide(&headers, url) {
            Ok(filename) => filename,
            Err(rejection) => return Ok(FetchOutcome::Rejected(rejection)),
        };

        let final_path = self.download_dir.join(&filename);
        let temp_path = temp_path_for(&final_path);
        debug!(filename = %filename, "headers OK, proceeding with transfer");

        let bytes = self.client.transfer(url, &temp_path).await?;

        let hash = match hash_file(&temp_path).await {
            Ok(hash) => hash,
            Err(error) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(error);
            }
        };

        let finalized = match finalize(&temp_path, &final_path, hash, &mut self.seen_hashes).await
        {
            Ok(finalized) => finalized,
            Err(error) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(error);
            }
        };

        Ok(match finalized {
            Finalized::Saved(file) => FetchOutcome::Saved { file, bytes },
            Finalized::Duplicate { hash } => FetchOutcome::Duplicate { hash },
        })
    }
}

//! Header-based acceptance policy.
//!
//! The policy runs on the headers of the HEAD probe only; no body bytes are
//! fetched until a candidate passes every gate here.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName};
use thiserror::Error;

use super::constants::{DENIED_EXTENSIONS, MAX_CONTENT_LENGTH, REQUIRED_CONTENT_TYPE_PREFIX};
use super::filename::{derive_filename, is_unsafe_filename};

/// Header values captured from the metadata probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeHeaders {
    /// `Content-Type`, if present and valid UTF-8.
    pub content_type: Option<String>,
    /// Declared `Content-Length`; absent or non-numeric values are 0.
    pub content_length: u64,
    /// `Content-Disposition`, if present and valid UTF-8.
    pub content_disposition: Option<String>,
}

impl ProbeHeaders {
    /// Extracts the three policy-relevant headers from a response header map.
    #[must_use]
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let text = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            content_type: text(CONTENT_TYPE),
            content_length: text(CONTENT_LENGTH)
                .as_deref()
                .map_or(0, parse_content_length),
            content_disposition: text(CONTENT_DISPOSITION),
        }
    }
}

/// Parses a declared length; only plain ASCII digit strings count.
///
/// Digit strings too large for `u64` saturate so they still trip the ceiling.
fn parse_content_length(raw: &str) -> u64 {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    raw.parse::<u64>().unwrap_or(u64::MAX)
}

/// Why a candidate was turned away before transfer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyRejection {
    /// Content-Type missing or not an `image/*` type.
    #[error("expected an image, got content type '{content_type}'")]
    UnsupportedType {
        /// The declared type, empty when absent.
        content_type: String,
    },

    /// Declared Content-Length above the configured ceiling.
    #[error("declared size {content_length} bytes exceeds limit of {limit} bytes")]
    TooLarge {
        /// Declared length in bytes.
        content_length: u64,
        /// Ceiling in bytes.
        limit: u64,
    },

    /// Derived filename ends with a denied extension.
    #[error("file '{filename}' has a potentially dangerous extension")]
    DangerousExtension {
        /// The derived filename.
        filename: String,
    },

    /// Derived filename is empty, a dot name, or contains a path separator.
    #[error("file name '{filename}' is not a plain file name")]
    UnsafeFilename {
        /// The derived filename.
        filename: String,
    },
}

impl PolicyRejection {
    /// Short stable label for summaries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::TooLarge { .. } => "too_large",
            Self::DangerousExtension { .. } => "dangerous_extension",
            Self::UnsafeFilename { .. } => "unsafe_filename",
        }
    }
}

/// Size ceiling and extension denylist applied to probe results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Largest declared Content-Length that is still accepted.
    pub max_content_length: u64,
    /// Filename suffixes that are always rejected (case-sensitive).
    pub denied_extensions: Vec<String>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_content_length: MAX_CONTENT_LENGTH,
            denied_extensions: DENIED_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl FetchPolicy {
    /// Decides whether the probed resource may be transferred.
    ///
    /// Gates run in order: content type, declared size, then the derived
    /// filename. On success the accepted filename is returned.
    ///
    /// A missing Content-Length reads as 0 and passes the size gate.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyRejection`] whose gate the headers fail.
    pub fn decide(&self, headers: &ProbeHeaders, url: &str) -> Result<String, PolicyRejection> {
        let content_type = headers.content_type.as_deref().unwrap_or_default();
        if !content_type.starts_with(REQUIRED_CONTENT_TYPE_PREFIX) {
            return Err(PolicyRejection::UnsupportedType {
                content_type: content_type.to_string(),
            });
        }

        if headers.content_length > self.max_content_length {
            return Err(PolicyRejection::TooLarge {
                content_length: headers.content_length,
                limit: self.max_content_length,
            });
        }

        let filename = derive_filename(headers.content_disposition.as_deref(), url);
        if self
            .denied_extensions
            .iter()
            .any(|ext| filename.ends_with(ext.as_str()))
        {
            return Err(PolicyRejection::DangerousExtension { filename });
        }
        if is_unsafe_filename(&filename) {
            return Err(PolicyRejection::UnsafeFilename { filename });
        }

        Ok(filename)
    }
}

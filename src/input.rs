//! URL extraction and validation from free-form text input.
//!
//! Input may be a list of URLs one per line, or prose/markdown with URLs
//! embedded. Order is preserved and repeated URLs are kept; deduplication
//! happens later, on content.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

/// URLs longer than this are rejected.
pub const MAX_URL_LENGTH: usize = 2000;

/// Matches http:// and https:// URLs, capturing until whitespace or common delimiters.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'\]]+"#).expect("URL regex is valid"));

/// URLs extracted from input plus anything that could not be used.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Normalized URLs in input order.
    pub items: Vec<String>,
    /// Lines or URL candidates that were skipped, with the reason.
    pub skipped: Vec<String>,
}

impl ParseResult {
    /// Returns true if no URLs were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of URLs found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Number of skipped entries.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Normalized URLs in input order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

/// Extracts every http(s) URL from `input`.
///
/// Blank lines and lines starting with `#` are ignored. Lines with no URL at
/// all, and URL candidates that fail validation, are recorded as skipped.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn parse_input(input: &str) -> ParseResult {
    let mut result = ParseResult::default();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut found = false;
        for url_match in URL_PATTERN.find_iter(line) {
            found = true;
            let cleaned = clean_url_trailing(url_match.as_str());
            trace!(url = %cleaned, "found URL candidate");

            match validate_url(cleaned) {
                Ok(value) => {
                    debug!(url = %value, "URL validated");
                    result.items.push(value);
                }
                Err(reason) => {
                    debug!(url = %cleaned, %reason, "URL validation failed");
                    result.skipped.push(format!("{cleaned} ({reason})"));
                }
            }
        }

        if !found {
            result.skipped.push(line.to_string());
        }
    }

    result
}

/// Strips sentence punctuation and unbalanced closing brackets captured with a URL.
fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' => {
                result = &result[..result.len() - 1];
            }
            ')' | ']' => {
                let open = if last == ')' { '(' } else { '[' };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}

fn validate_url(raw: &str) -> Result<String, String> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(format!("longer than {MAX_URL_LENGTH} characters"));
    }

    let parsed = Url::parse(raw).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(format!("scheme '{scheme}' is not supported")),
    }
    if parsed.host().is_none() {
        return Err("no host".to_string());
    }

    Ok(parsed.to_string())
}

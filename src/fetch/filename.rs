//! Filename derivation and staging paths for fetched files.

use std::path::{Path, PathBuf};

use url::Url;

use super::constants::{FALLBACK_FILENAME, TEMP_SUFFIX};

const DISPOSITION_FILENAME_KEY: &str = "filename=";

/// Derives the candidate filename from a Content-Disposition value or the URL.
///
/// When the header contains `filename=`, everything after its first occurrence
/// is used with surrounding `"`/`'` characters trimmed. The value is returned
/// unsanitized; [`is_unsafe_filename`] is the gate for separators and dot names.
///
/// Otherwise the final segment of the URL path is used, falling back to
/// [`FALLBACK_FILENAME`] when that segment is empty or has no `.`.
#[must_use]
pub fn derive_filename(content_disposition: Option<&str>, url: &str) -> String {
    if let Some(name) = content_disposition.and_then(filename_from_disposition) {
        return name;
    }

    let last_segment = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.path().rsplit('/').next().map(str::to_string))
        .unwrap_or_default();

    if last_segment.is_empty() || !last_segment.contains('.') {
        return FALLBACK_FILENAME.to_string();
    }
    last_segment
}

fn filename_from_disposition(value: &str) -> Option<String> {
    let (_, after) = value.split_once(DISPOSITION_FILENAME_KEY)?;
    Some(after.trim_matches(['"', '\'']).to_string())
}

/// Returns true when `name` could escape the download directory or is not a file name.
#[must_use]
pub fn is_unsafe_filename(name: &str) -> bool {
    name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0'])
}

/// Staging path for a transfer: the final path with [`TEMP_SUFFIX`] appended.
#[must_use]
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut staged = final_path.as_os_str().to_owned();
    staged.push(TEMP_SUFFIX);
    PathBuf::from(staged)
}

//! SHA-256 content hashing used as the deduplication key.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::instrument;

use super::constants::HASH_BLOCK_SIZE;
use super::error::FetchError;

/// Computes the lowercase hex SHA-256 digest of a file, reading it in blocks.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if the file cannot be opened or read.
#[instrument(level = "debug", skip(path), fields(path = %path.display()))]
pub async fn hash_file(path: &Path) -> Result<String, FetchError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;

    let mut hasher = Sha256::new();
    let mut block = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let read = file
            .read(&mut block)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

//! Constants for the fetch module (timeouts, size ceiling, naming).

use std::time::Duration;

/// Timeout for the metadata-only HEAD probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout for the streamed body transfer.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP connect timeout shared by probe and transfer.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest declared Content-Length accepted by the default policy (20 MiB).
pub const MAX_CONTENT_LENGTH: u64 = 20 * 1024 * 1024;

/// Extensions rejected by the default policy (case-sensitive suffix match).
pub const DENIED_EXTENSIONS: &[&str] = &[".exe", ".bat", ".sh", ".js"];

/// Content-Type prefix every accepted candidate must carry.
pub const REQUIRED_CONTENT_TYPE_PREFIX: &str = "image/";

/// Buffer size for writing the response body to the temp file.
pub const WRITE_CHUNK_SIZE: usize = 8 * 1024;

/// Block size for reading files while hashing.
pub const HASH_BLOCK_SIZE: usize = 64 * 1024;

/// Suffix appended to the final path while a transfer is staged.
pub const TEMP_SUFFIX: &str = ".temp";

/// Name used when neither headers nor URL yield a usable filename.
pub const FALLBACK_FILENAME: &str = "downloaded_file.jpg";

/// Default base directory for saved files.
pub const DEFAULT_DOWNLOAD_DIR: &str = "Fetched_Images";

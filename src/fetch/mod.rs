//! HTTP fetch pipeline with header policy checks and content deduplication.
//!
//! # Features
//!
//! - HEAD probe before any body bytes are fetched
//! - Content-Type, declared size, and filename gates
//! - Streamed transfer to a `.temp` staging path
//! - SHA-256 deduplication across one [`Downloader`]'s lifetime
//!
//! # Example
//!
//! ```no_run
//! use fetcher_core::fetch::{Downloader, FetcherConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut downloader = Downloader::new(FetcherConfig::default()).await?;
//! let outcome = downloader.run("https://example.com/photo.jpg").await;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
pub mod filename;
mod hash;
mod pipeline;
mod policy;

pub use client::HttpClient;
pub use error::FetchError;
pub use filename::derive_filename;
pub use hash::hash_file;
pub use pipeline::{
    Downloader, FetchOutcome, FetchReport, FetchStats, FetcherConfig, Finalized, SavedFile,
    finalize,
};
pub use policy::{FetchPolicy, PolicyRejection, ProbeHeaders};

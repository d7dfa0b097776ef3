//! Image Fetcher Core Library
//!
//! Fetches files over HTTP after checking their headers, and keeps only one
//! copy of any given content per process.
//!
//! # Architecture
//!
//! - [`fetch`] - probe, policy, streamed transfer, hashing, and promotion
//! - [`input`] - URL extraction from free-form text

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fetch;
pub mod input;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use fetch::{
    Downloader, FetchError, FetchOutcome, FetchPolicy, FetchReport, FetchStats, FetcherConfig,
    HttpClient, PolicyRejection, ProbeHeaders,
};
pub use input::{ParseResult, parse_input};

//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch images over HTTP with header checks and duplicate detection.
///
/// URLs are taken from the arguments, or from stdin when none are given.
/// Each URL is probed first; only image content within the size limit and
/// with a safe filename is downloaded, and repeated content is discarded.
#[derive(Parser, Debug)]
#[command(name = "image-fetcher")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to fetch (reads stdin if omitted)
    pub urls: Vec<String>,

    /// Directory to save files into [default: Fetched_Images]
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Largest accepted declared Content-Length in bytes [default: 20971520]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_size: Option<u64>,

    /// HEAD probe timeout in seconds [default: 5]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub probe_timeout: Option<u64>,

    /// Body transfer read timeout in seconds [default: 10]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub transfer_timeout: Option<u64>,

    /// Read configuration from this file instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print a JSON summary of every outcome to stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

//! CLI entry point for the image fetcher.

use std::io::{self, IsTerminal, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fetcher_core::fetch::constants::{
    DEFAULT_DOWNLOAD_DIR, MAX_CONTENT_LENGTH, PROBE_TIMEOUT, TRANSFER_TIMEOUT,
};
use fetcher_core::{Downloader, FetchReport, FetchStats, FetcherConfig, parse_input};
use serde::Serialize;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{FileConfig, VerbositySetting, load_config};
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = load_config(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .verbosity
                .map_or("info", VerbositySetting::filter),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, ?file_config, "configuration loaded");

    let input_text = if !args.urls.is_empty() {
        args.urls.join("\n")
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read URLs from stdin")?;
        buffer
    } else {
        info!("No input provided. Pass URLs as arguments or pipe them via stdin.");
        info!("Example: echo 'https://example.com/photo.jpg' | image-fetcher");
        return Ok(());
    };

    let parse_result = parse_input(&input_text);
    for skipped in &parse_result.skipped {
        warn!(skipped = %skipped, "Skipped unrecognized input");
    }
    if parse_result.is_empty() {
        info!("No valid URLs found in input");
        return Ok(());
    }
    info!(
        urls = parse_result.len(),
        skipped = parse_result.skipped_count(),
        "Parsed input"
    );

    let config = build_fetcher_config(&args, &file_config);
    let mut downloader = Downloader::new(config)
        .await
        .context("Failed to prepare download directory")?;

    let reports = downloader
        .run_all(parse_result.urls().map(str::to_string))
        .await;

    let mut stats = FetchStats::default();
    for report in &reports {
        stats.record(&report.outcome);
    }

    info!(
        saved = stats.saved,
        duplicates = stats.duplicates,
        rejected = stats.rejected,
        failed = stats.failed,
        total = stats.total(),
        dir = %downloader.download_dir().display(),
        "Fetch complete"
    );

    if args.json {
        let summary = RunSummary::new(stats, &reports);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

/// Merges CLI flags over file values over built-in defaults.
fn build_fetcher_config(args: &Args, file: &FileConfig) -> FetcherConfig {
    let mut config = FetcherConfig::with_download_dir(
        args.output_dir
            .clone()
            .or_else(|| file.download_dir.clone())
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.into()),
    );
    config.policy.max_content_length = args
        .max_size
        .or(file.max_content_length)
        .unwrap_or(MAX_CONTENT_LENGTH);
    config.probe_timeout = args
        .probe_timeout
        .or(file.probe_timeout_secs)
        .map_or(PROBE_TIMEOUT, Duration::from_secs);
    config.transfer_timeout = args
        .transfer_timeout
        .or(file.transfer_timeout_secs)
        .map_or(TRANSFER_TIMEOUT, Duration::from_secs);
    config
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    stats: FetchStats,
    outcomes: Vec<OutcomeRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct OutcomeRecord<'a> {
    url: &'a str,
    status: &'static str,
    detail: String,
}

impl<'a> RunSummary<'a> {
    fn new(stats: FetchStats, reports: &'a [FetchReport]) -> Self {
        let outcomes = reports
            .iter()
            .map(|report| OutcomeRecord {
                url: &report.url,
                status: report.outcome.status(),
                detail: report.outcome.to_string(),
            })
            .collect();
        Self { stats, outcomes }
    }
}

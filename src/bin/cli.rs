//! reddit-sync CLI
//!
//! Syncs one subreddit per invocation into the chosen storage backend.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use reddit_sync::{
    error::Result,
    models::Config,
    pipeline::{self, SyncOptions},
    services::RedditClient,
    storage::{CsvStorage, WatermarkStore},
    utils::normalize_subreddit,
};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StorageKind {
    /// One CSV file per subreddit
    #[value(name = "tabular-file", alias = "csv")]
    TabularFile,
    /// One Google Sheet per subreddit inside a Drive folder
    #[value(name = "cloud-sheet", alias = "google_sheet")]
    CloudSheet,
}

/// reddit-sync - incremental subreddit scraper
#[derive(Parser, Debug)]
#[command(
    name = "reddit-sync",
    version,
    about = "Append new subreddit posts and their top comments to a CSV file or Google Sheet"
)]
struct Cli {
    /// Subreddit to sync (with or without the r/ prefix)
    subreddit_name: String,

    /// Minimum score a post needs to be stored
    #[arg(long = "min_upvotes", alias = "min-upvotes", default_value_t = 1)]
    min_upvotes: i64,

    /// Maximum number of new posts to store in this run
    #[arg(long = "max_posts", alias = "max-posts", default_value_t = 10)]
    max_posts: usize,

    /// Where to store the posts
    #[arg(long, value_enum, default_value_t = StorageKind::TabularFile)]
    storage: StorageKind,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory for CSV files (overrides storage.output_dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[cfg(feature = "sheets")]
async fn cloud_store(config: &Config) -> Result<Box<dyn WatermarkStore>> {
    use reddit_sync::services::auth;
    use reddit_sync::storage::{GoogleDrive, SheetStorage};
    use reddit_sync::utils::http;

    // Authorized once; every Drive and Sheets call of this run reuses it
    let client = http::create_google_client(&config.google)?;
    let session = auth::authorize(&config.google, &client).await?;
    let drive = GoogleDrive::new(client, session);
    Ok(Box::new(SheetStorage::new(drive, &config.google)))
}

#[cfg(not(feature = "sheets"))]
async fn cloud_store(_config: &Config) -> Result<Box<dyn WatermarkStore>> {
    Err(reddit_sync::error::AppError::config(
        "cloud-sheet storage requires the `sheets` feature",
    ))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config).with_env_overrides();
    if let Some(dir) = cli.output_dir {
        config.storage.output_dir = dir;
    }
    config.validate()?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    let subreddit = normalize_subreddit(&cli.subreddit_name)?;

    let store: Box<dyn WatermarkStore> = match cli.storage {
        StorageKind::TabularFile => Box::new(CsvStorage::new(&config.storage.output_dir)),
        StorageKind::CloudSheet => cloud_store(&config).await?,
    };
    let source = RedditClient::connect(&config.reddit).await?;

    let options = SyncOptions {
        expand_more: config.comments.expand_more,
        request_delay: Duration::from_millis(config.reddit.request_delay_ms),
        ..SyncOptions::new(subreddit, cli.min_upvotes, cli.max_posts)
    };
    let report = pipeline::run_sync(&source, store.as_ref(), &options).await?;

    log::info!(
        "Done: {} new posts in {} ({}, {:.1}s)",
        report.records_written,
        report.location,
        report.stop_reason,
        (report.end_time - report.start_time).num_milliseconds() as f64 / 1000.0
    );

    Ok(())
}

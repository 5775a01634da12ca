//! Review Harvest main entry point
//!
//! This is the command-line interface for the Review Harvest crawler.

use clap::Parser;
use review_harvest::config::{load_config_with_hash, Config};
use review_harvest::crawler::{run_crawl, ReviewEndpoint};
use review_harvest::output::{load_statistics, print_failures, print_run_summary, print_statistics};
use review_harvest::storage::{open_storage, RecordStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Review Harvest: a paginated review crawler
///
/// Review Harvest walks every item whose reviews have not been crawled yet,
/// fetches all of its review pages and stores the reviews in SQLite. Items
/// that fail are left pending and retried on the next run.
#[derive(Parser, Debug)]
#[command(name = "review-harvest")]
#[command(version)]
#[command(about = "A paginated review crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "failures"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "failures"])]
    stats: bool,

    /// Show the most recent failure log entries and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    failures: bool,

    /// Number of failure log entries to show
    #[arg(long, default_value_t = 20, requires = "failures")]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.failures {
        handle_failures(&config, cli.limit)?;
    } else {
        handle_crawl(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_harvest=info,warn"),
            1 => EnvFilter::new("review_harvest=debug,info"),
            2 => EnvFilter::new("review_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Review Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );
    println!(
        "  Max concurrent pages: {}",
        config.crawler.max_concurrent_pages
    );
    println!("  Page size: {}", config.crawler.page_size);

    println!("\nEndpoint:");
    println!("  Base URL: {}", config.endpoint.base_url);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let pending = storage.load_pending_items()?;
    let endpoint = ReviewEndpoint::new(&config.endpoint, config.crawler.page_size)?;

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl reviews for {} items", pending.len());
    if let Some(first) = pending.first() {
        println!("  First probe: {}", endpoint.page_url(first, 1));
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --failures mode: lists the newest failure log entries
fn handle_failures(config: &Config, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let failures = storage.list_failures(limit)?;
    print_failures(&failures);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling reviews from {} into {}",
        config.endpoint.base_url,
        config.output.database_path
    );

    match run_crawl(config, config_hash).await {
        Ok(summary) => {
            tracing::info!("Crawl completed successfully");
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

//! Crawl driver - run-level orchestration
//!
//! Loads the snapshot of items whose reviews are not crawled yet, then runs
//! the item pipeline for each of them in order. One item's failure is logged
//! and the driver moves on to the next.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, ReviewEndpoint};
use crate::crawler::pipeline::{ItemOutcome, ItemPipeline, ItemReport};
use crate::crawler::pool::PageFetchPool;
use crate::storage::{RecordStore, RunCounters, RunStatus, SqliteStorage};
use crate::Result;
use std::path::Path;
use std::time::Instant;

/// Result of a whole crawl run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub counters: RunCounters,
    /// One report per item that finished or was abandoned
    pub reports: Vec<ItemReport>,
}

/// Drives a crawl run over one record store
pub struct CrawlDriver<S: RecordStore> {
    store: S,
    pipeline: ItemPipeline,
    config_hash: String,
}

impl<S: RecordStore> CrawlDriver<S> {
    /// Creates a new driver
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash recorded with the run
    /// * `store` - The record store to read items from and write reviews to
    pub fn new(config: &Config, config_hash: impl Into<String>, store: S) -> Result<Self> {
        let client = build_http_client(&config.crawler, &config.user_agent)?;
        let endpoint = ReviewEndpoint::new(&config.endpoint, config.crawler.page_size)?;
        let pool = PageFetchPool::new(client, config.crawler.max_concurrent_pages as usize);

        Ok(Self {
            store,
            pipeline: ItemPipeline::new(endpoint, pool),
            config_hash: config_hash.into(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs the crawl over every pending item
    ///
    /// The pending set is read once; items added while the run is in
    /// progress wait for the next run.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let run_id = self.store.create_run(&self.config_hash)?;
        tracing::info!("Starting crawl run {}", run_id);

        let items = match self.store.load_pending_items() {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("Failed to load pending items: {}", e);
                if let Err(finish_err) =
                    self.store
                        .finish_run(run_id, RunStatus::Failed, &RunCounters::default())
                {
                    tracing::error!("Failed to mark run {} as failed: {}", run_id, finish_err);
                }
                return Err(e.into());
            }
        };

        let total = items.len();
        tracing::info!("{} items pending review crawl", total);

        let start_time = Instant::now();
        let mut counters = RunCounters::default();
        let mut reports = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            counters.items_seen += 1;

            match self.pipeline.process(&mut self.store, Some(run_id), item).await {
                Ok(report) => {
                    match report.outcome {
                        ItemOutcome::Completed => {
                            counters.items_completed += 1;
                            counters.reviews_inserted += report.reviews.inserted;
                        }
                        ItemOutcome::Abandoned => counters.items_abandoned += 1,
                    }
                    tracing::info!(
                        "[{}/{}] {} {:?}: {} pages, {} failed, {} new reviews, {} duplicates",
                        index + 1,
                        total,
                        report.item_id,
                        report.outcome,
                        report.pages_discovered,
                        report.pages_failed,
                        report.reviews.inserted,
                        report.reviews.duplicates
                    );
                    reports.push(report);
                }
                Err(e) => {
                    counters.items_errored += 1;
                    tracing::error!("Error processing item {}: {}", item.item_id, e);
                }
            }
        }

        self.store
            .finish_run(run_id, RunStatus::Completed, &counters)?;

        tracing::info!(
            "Crawl run {} completed: {} items ({} completed, {} abandoned, {} errored), {} reviews in {:?}",
            run_id,
            counters.items_seen,
            counters.items_completed,
            counters.items_abandoned,
            counters.items_errored,
            counters.reviews_inserted,
            start_time.elapsed()
        );

        Ok(RunSummary {
            run_id,
            counters,
            reports,
        })
    }
}

/// Runs a complete crawl against the configured SQLite database
///
/// # Example
///
/// ```no_run
/// use review_harvest::config::load_config_with_hash;
/// use review_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let summary = run_crawl(&config, &hash).await?;
/// println!("{} reviews stored", summary.counters.reviews_inserted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, config_hash: &str) -> Result<RunSummary> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let mut driver = CrawlDriver::new(config, config_hash, storage)?;
    driver.run().await
}

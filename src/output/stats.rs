//! Statistics generation from the review database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::model::{FailureKind, FailureRecord};
use crate::storage::{RecordStore, RunRecord};
use crate::HarvestError;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of items known to the database
    pub total_items: u64,

    /// Items whose reviews have been crawled
    pub crawled_items: u64,

    /// Items still waiting for a review crawl
    pub pending_items: u64,

    /// Total number of stored reviews
    pub total_reviews: u64,

    /// Failure log entries by kind
    pub failures_by_kind: HashMap<FailureKind, u64>,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    pub fn total_failures(&self) -> u64 {
        self.failures_by_kind.values().sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn RecordStore) -> Result<CrawlStatistics, HarvestError> {
    let total_items = storage.count_items(None)?;
    let crawled_items = storage.count_items(Some(true))?;
    let pending_items = storage.count_items(Some(false))?;
    let total_reviews = storage.count_reviews()?;
    let failures_by_kind = storage.count_failures_by_kind()?;
    let latest_run = storage.get_latest_run()?;

    Ok(CrawlStatistics {
        total_items,
        crawled_items,
        pending_items,
        total_reviews,
        failures_by_kind,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Review Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total items: {}", stats.total_items);
    println!("  Reviews crawled: {}", stats.crawled_items);
    println!("  Pending: {}", stats.pending_items);
    println!("  Stored reviews: {}", stats.total_reviews);
    println!();

    if stats.total_failures() > 0 {
        println!("Failure Log ({} entries):", stats.total_failures());
        let mut kind_counts: Vec<_> = stats.failures_by_kind.iter().collect();
        kind_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in kind_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!(
            "  Items: {} seen, {} completed, {} abandoned, {} errored",
            run.counters.items_seen,
            run.counters.items_completed,
            run.counters.items_abandoned,
            run.counters.items_errored
        );
        println!("  New reviews: {}", run.counters.reviews_inserted);
        println!();
    }

    println!(
        "Completion: {:.1}% ({} / {} items crawled)",
        completion_rate(stats),
        stats.crawled_items,
        stats.total_items
    );
}

/// Prints failure log entries, newest first
pub fn print_failures(failures: &[FailureRecord]) {
    if failures.is_empty() {
        println!("Failure log is empty");
        return;
    }

    println!("=== Failure Log ({} most recent) ===\n", failures.len());
    for record in failures {
        let run = record
            .run_id
            .map(|id| format!("run {}", id))
            .unwrap_or_else(|| "no run".to_string());
        println!(
            "[{}] {} item {} ({})",
            record.recorded_at, record.failure.kind, record.failure.item_id, run
        );
        println!("  {}", record.failure.url);
        println!("  {}", record.failure.message);
    }
}

fn completion_rate(stats: &CrawlStatistics) -> f64 {
    if stats.total_items > 0 {
        (stats.crawled_items as f64 / stats.total_items as f64) * 100.0
    } else {
        0.0
    }
}

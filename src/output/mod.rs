//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - Reading item, review and failure counts back out of the database
//! - Printing statistics, the failure log and run summaries

pub mod stats;

pub use stats::{load_statistics, print_failures, print_statistics, CrawlStatistics};

use crate::crawler::{ItemOutcome, RunSummary};

/// Prints the result of a finished crawl run
pub fn print_run_summary(summary: &RunSummary) {
    let counters = &summary.counters;

    println!("=== Crawl Run #{} ===\n", summary.run_id);
    println!("Items processed: {}", counters.items_seen);
    println!("  Completed: {}", counters.items_completed);
    println!("  Abandoned: {}", counters.items_abandoned);
    println!("  Errored: {}", counters.items_errored);
    println!("New reviews stored: {}", counters.reviews_inserted);

    let duplicates: u64 = summary.reports.iter().map(|r| r.reviews.duplicates).sum();
    if duplicates > 0 {
        println!("Duplicate reviews skipped: {}", duplicates);
    }

    let abandoned: Vec<_> = summary
        .reports
        .iter()
        .filter(|r| r.outcome == ItemOutcome::Abandoned)
        .map(|r| r.item_id.as_str())
        .collect();
    if !abandoned.is_empty() {
        println!("\nAbandoned items (will be retried next run):");
        for item_id in abandoned {
            println!("  - {}", item_id);
        }
    }
}

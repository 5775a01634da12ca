//! Storage traits and error types
//!
//! This module defines the record-store interface the crawler writes through,
//! and the associated error types.

use crate::model::{Failure, FailureKind, FailureRecord, Item, Review};
use crate::storage::{InsertStats, RunCounters, RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for record store implementations
///
/// The store owns all persisted item, review and failure state. Review
/// inserts must be idempotent on `review_id`: a row that already exists is
/// counted as a duplicate, never reported as an error.
pub trait RecordStore {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Stamps the finish time, final status and counters of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: &RunCounters,
    ) -> StorageResult<()>;

    // ===== Items =====

    /// Inserts an item, or refreshes its descriptive fields if it exists
    ///
    /// The `reviews_crawled` flag of an existing row is left untouched.
    fn upsert_item(&mut self, item: &Item) -> StorageResult<()>;

    /// Gets an item by ID
    fn get_item(&self, item_id: &str) -> StorageResult<Option<Item>>;

    /// Loads every item whose reviews have not been crawled yet
    fn load_pending_items(&self) -> StorageResult<Vec<Item>>;

    /// Sets `reviews_crawled = true` for an item
    fn mark_reviews_crawled(&mut self, item_id: &str) -> StorageResult<()>;

    // ===== Reviews =====

    /// Inserts a batch of reviews, skipping ones whose ID is already stored
    fn insert_reviews(&mut self, reviews: &[Review]) -> StorageResult<InsertStats>;

    /// Gets all reviews of an item, ordered by review ID
    fn get_reviews_for_item(&self, item_id: &str) -> StorageResult<Vec<Review>>;

    // ===== Failure Log =====

    /// Appends a failure to the log
    fn append_failure(&mut self, run_id: Option<i64>, failure: &Failure) -> StorageResult<()>;

    /// Lists the most recent failures, newest first
    fn list_failures(&self, limit: usize) -> StorageResult<Vec<FailureRecord>>;

    // ===== Statistics =====

    /// Counts items, optionally filtered by crawl flag
    fn count_items(&self, reviews_crawled: Option<bool>) -> StorageResult<u64>;

    /// Counts stored reviews
    fn count_reviews(&self) -> StorageResult<u64>;

    /// Counts failure log entries per kind
    fn count_failures_by_kind(&self) -> StorageResult<HashMap<FailureKind, u64>>;
}

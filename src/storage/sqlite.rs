//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::model::{Failure, FailureKind, FailureRecord, Item, Review};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::storage::{InsertStats, RunCounters, RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const ITEM_COLUMNS: &str =
    "item_id, seller_id, title, area, location, seller_location, price, sold, reviews_crawled";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, items_seen,
     items_completed, items_abandoned, items_errored, reviews_inserted";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        item_id: row.get(0)?,
        seller_id: row.get(1)?,
        title: row.get(2)?,
        area: row.get(3)?,
        location: row.get(4)?,
        seller_location: row.get(5)?,
        price: row.get(6)?,
        sold: row.get(7)?,
        reviews_crawled: row.get(8)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        counters: RunCounters {
            items_seen: row.get::<_, i64>(5)? as u64,
            items_completed: row.get::<_, i64>(6)? as u64,
            items_abandoned: row.get::<_, i64>(7)? as u64,
            items_errored: row.get::<_, i64>(8)? as u64,
            reviews_inserted: row.get::<_, i64>(9)? as u64,
        },
    })
}

impl RecordStore for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: &RunCounters,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, items_seen = ?3, items_completed = ?4,
             items_abandoned = ?5, items_errored = ?6, reviews_inserted = ?7 WHERE id = ?8",
            params![
                status.to_db_string(),
                now,
                counters.items_seen as i64,
                counters.items_completed as i64,
                counters.items_abandoned as i64,
                counters.items_errored as i64,
                counters.reviews_inserted as i64,
                run_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Items =====

    fn upsert_item(&mut self, item: &Item) -> StorageResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(item_id) DO UPDATE SET
                    seller_id = excluded.seller_id,
                    title = excluded.title,
                    area = excluded.area,
                    location = excluded.location,
                    seller_location = excluded.seller_location,
                    price = excluded.price,
                    sold = excluded.sold",
                ITEM_COLUMNS
            ),
            params![
                item.item_id,
                item.seller_id,
                item.title,
                item.area,
                item.location,
                item.seller_location,
                item.price,
                item.sold,
                item.reviews_crawled,
            ],
        )?;
        Ok(())
    }

    fn get_item(&self, item_id: &str) -> StorageResult<Option<Item>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {} FROM items WHERE item_id = ?1", ITEM_COLUMNS),
                params![item_id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn load_pending_items(&self) -> StorageResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM items WHERE reviews_crawled = 0 ORDER BY rowid",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map([], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn mark_reviews_crawled(&mut self, item_id: &str) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE items SET reviews_crawled = 1 WHERE item_id = ?1",
            params![item_id],
        )?;
        if changed == 0 {
            return Err(StorageError::ItemNotFound(item_id.to_string()));
        }
        Ok(())
    }

    // ===== Reviews =====

    fn insert_reviews(&mut self, reviews: &[Review]) -> StorageResult<InsertStats> {
        let now = Utc::now().to_rfc3339();
        let mut stats = InsertStats::default();

        let tx = self.conn.transaction()?;
        {
            // OR IGNORE turns a review_id collision into a no-op
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO reviews
                 (review_id, item_id, content, sku, buy_count, rate_date, useful, anonymous, crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for review in reviews {
                let changed = stmt.execute(params![
                    review.review_id,
                    review.item_id,
                    review.content,
                    review.sku,
                    review.buy_count,
                    review.rate_date,
                    review.useful,
                    review.anonymous,
                    now,
                ])?;
                if changed == 0 {
                    stats.duplicates += 1;
                } else {
                    stats.inserted += 1;
                }
            }
        }
        tx.commit()?;

        Ok(stats)
    }

    fn get_reviews_for_item(&self, item_id: &str) -> StorageResult<Vec<Review>> {
        let mut stmt = self.conn.prepare(
            "SELECT review_id, item_id, content, sku, buy_count, rate_date, useful, anonymous
             FROM reviews WHERE item_id = ?1 ORDER BY review_id",
        )?;

        let reviews = stmt
            .query_map(params![item_id], |row| {
                Ok(Review {
                    review_id: row.get(0)?,
                    item_id: row.get(1)?,
                    content: row.get(2)?,
                    sku: row.get(3)?,
                    buy_count: row.get(4)?,
                    rate_date: row.get(5)?,
                    useful: row.get(6)?,
                    anonymous: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reviews)
    }

    // ===== Failure Log =====

    fn append_failure(&mut self, run_id: Option<i64>, failure: &Failure) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO failed_urls (url, kind, message, item_id, run_id, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                failure.url,
                failure.kind.to_db_string(),
                failure.message,
                failure.item_id,
                run_id,
                now
            ],
        )?;
        Ok(())
    }

    fn list_failures(&self, limit: usize) -> StorageResult<Vec<FailureRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, kind, message, item_id, run_id, recorded_at
             FROM failed_urls ORDER BY id DESC LIMIT ?1",
        )?;

        let failures = stmt
            .query_map(params![limit as i64], |row| {
                Ok(FailureRecord {
                    id: row.get(0)?,
                    failure: Failure {
                        url: row.get(1)?,
                        kind: FailureKind::from_db_string(&row.get::<_, String>(2)?)
                            .unwrap_or(FailureKind::Transport),
                        message: row.get(3)?,
                        item_id: row.get(4)?,
                    },
                    run_id: row.get(5)?,
                    recorded_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(failures)
    }

    // ===== Statistics =====

    fn count_items(&self, reviews_crawled: Option<bool>) -> StorageResult<u64> {
        let count: i64 = match reviews_crawled {
            Some(flag) => self.conn.query_row(
                "SELECT COUNT(*) FROM items WHERE reviews_crawled = ?1",
                params![flag],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn count_reviews(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_failures_by_kind(&self) -> StorageResult<HashMap<FailureKind, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM failed_urls GROUP BY kind")?;

        let mut summary = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (kind_str, count) = row?;
            if let Some(kind) = FailureKind::from_db_string(&kind_str) {
                summary.insert(kind, count as u64);
            }
        }

        Ok(summary)
    }
}

//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Review Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    items_seen INTEGER NOT NULL DEFAULT 0,
    items_completed INTEGER NOT NULL DEFAULT 0,
    items_abandoned INTEGER NOT NULL DEFAULT 0,
    items_errored INTEGER NOT NULL DEFAULT 0,
    reviews_inserted INTEGER NOT NULL DEFAULT 0
);

-- Items whose reviews are crawled (populated externally)
CREATE TABLE IF NOT EXISTS items (
    item_id TEXT PRIMARY KEY,
    seller_id TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    area TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    seller_location TEXT NOT NULL DEFAULT '',
    price REAL NOT NULL DEFAULT 0,
    sold INTEGER NOT NULL DEFAULT 0,
    reviews_crawled INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_items_reviews_crawled ON items(reviews_crawled);

-- Customer reviews
CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    review_id INTEGER NOT NULL,
    item_id TEXT NOT NULL REFERENCES items(item_id),
    content TEXT NOT NULL,
    sku TEXT NOT NULL,
    buy_count INTEGER NOT NULL,
    rate_date TEXT NOT NULL,
    useful INTEGER NOT NULL,
    anonymous INTEGER NOT NULL,
    crawled_at TEXT NOT NULL
);

-- Review IDs are the deduplication key
CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_review_id ON reviews(review_id);
CREATE INDEX IF NOT EXISTS idx_reviews_item ON reviews(item_id);

-- Append-only log of URLs that failed to fetch or parse
CREATE TABLE IF NOT EXISTS failed_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    kind TEXT NOT NULL,
    message TEXT NOT NULL,
    item_id TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id),
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_failed_urls_url ON failed_urls(url);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

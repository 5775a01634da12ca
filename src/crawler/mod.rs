//! Crawler module for review fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with per-request timeouts
//! - Review payload parsing
//! - Bounded concurrent page fetching
//! - The per-item pipeline and the run-level driver

mod driver;
mod fetcher;
mod parser;
mod pipeline;
mod pool;

pub use driver::{run_crawl, CrawlDriver, RunSummary};
pub use fetcher::{build_http_client, fetch_body, FetchError, ReviewEndpoint};
pub use parser::{
    extract_page_count, extract_reviews, is_empty_payload, parse_reviews, wrap_body, ParseError,
};
pub use pipeline::{ItemOutcome, ItemPipeline, ItemReport};
pub use pool::{PageFetch, PageFetchPool, PageRequest};

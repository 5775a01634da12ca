//! Per-item pipeline
//!
//! Drives one item through probe, page-count discovery, concurrent page
//! fetching, ingestion and completion. Fetch, empty-payload and parse
//! failures are appended to the failure log and never abort the item once the
//! probe succeeded. Store errors are not absorbed: they end the item with an
//! error and leave it un-marked.

use crate::crawler::fetcher::{fetch_body, ReviewEndpoint};
use crate::crawler::parser::{extract_page_count, is_empty_payload, parse_reviews};
use crate::crawler::pool::{PageFetch, PageFetchPool, PageRequest};
use crate::model::{Failure, FailureKind, Item, ItemPhase};
use crate::storage::{InsertStats, RecordStore};
use crate::HarvestError;
use chrono::Local;

/// How an item left the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The item was marked as crawled
    Completed,

    /// The probe failed and the item was left for a later run
    Abandoned,
}

/// Summary of one item's pass through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item_id: String,
    pub outcome: ItemOutcome,
    /// Page count read from the probe (0 if unreadable)
    pub pages_discovered: u32,
    /// Pages whose reviews were decoded and stored
    pub pages_ingested: u32,
    /// Pages that ended up in the failure log
    pub pages_failed: u32,
    pub reviews: InsertStats,
}

impl ItemReport {
    fn new(item_id: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            outcome: ItemOutcome::Abandoned,
            pages_discovered: 0,
            pages_ingested: 0,
            pages_failed: 0,
            reviews: InsertStats::default(),
        }
    }
}

/// Tracks the current phase of one item and rejects illegal jumps
struct PhaseTracker<'a> {
    item_id: &'a str,
    phase: ItemPhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(item_id: &'a str) -> Self {
        Self {
            item_id,
            phase: ItemPhase::Probing,
        }
    }

    fn advance(&mut self, next: ItemPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                item_id: self.item_id.to_string(),
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Item {}: {} -> {}", self.item_id, self.phase, next);
        self.phase = next;
        Ok(())
    }
}

/// Everything the pipeline needs besides the store
pub struct ItemPipeline {
    endpoint: ReviewEndpoint,
    pool: PageFetchPool,
}

impl ItemPipeline {
    pub fn new(endpoint: ReviewEndpoint, pool: PageFetchPool) -> Self {
        Self { endpoint, pool }
    }

    /// Runs one item to completion or abandonment
    ///
    /// The item is marked as crawled whenever the probe succeeded, however
    /// many of its pages failed afterwards.
    pub async fn process<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        run_id: Option<i64>,
        item: &Item,
    ) -> Result<ItemReport, HarvestError> {
        let mut tracker = PhaseTracker::new(&item.item_id);
        let mut report = ItemReport::new(&item.item_id);

        // Probing
        let probe_url = self.endpoint.page_url(item, 1);
        tracing::info!("Probing {}", probe_url);

        let probe = match fetch_body(self.pool.client(), &probe_url).await {
            Ok(body) if !is_empty_payload(&body) => Ok(body),
            Ok(_) => Err(Failure::new(
                &probe_url,
                FailureKind::EmptyPayload,
                "Probe returned an empty payload",
                &item.item_id,
            )),
            Err(e) => Err(Failure::new(
                &probe_url,
                FailureKind::Transport,
                e.to_string(),
                &item.item_id,
            )),
        };
        let probe_body = match probe {
            Ok(body) => body,
            Err(failure) => {
                record_failure(store, run_id, &failure)?;
                tracker.advance(ItemPhase::Abandoned)?;
                tracing::warn!(
                    "Abandoning item {}: probe failed ({})",
                    item.item_id,
                    failure.kind
                );
                return Ok(report);
            }
        };

        // Discovering
        tracker.advance(ItemPhase::Discovering)?;
        let page_count = extract_page_count(&probe_body);
        report.pages_discovered = page_count;
        tracing::info!(
            "{} {} ---> {} pages ({})",
            item.title,
            item.item_id,
            page_count,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        if page_count > 0 {
            // Fetching
            tracker.advance(ItemPhase::Fetching)?;
            let requests = (1..=page_count)
                .map(|page| PageRequest {
                    page,
                    url: self.endpoint.page_url(item, page),
                })
                .collect();
            let pages = self.pool.fetch_all(requests).await;

            // Ingesting
            tracker.advance(ItemPhase::Ingesting)?;
            tracing::debug!(
                "Adding reviews of item {} from {} pages",
                item.item_id,
                pages.len()
            );
            for page in pages {
                ingest_page(store, run_id, item, page, &mut report)?;
            }
        } else {
            tracing::debug!("Item {} has no readable page count", item.item_id);
        }

        // Completing
        tracker.advance(ItemPhase::Completing)?;
        store.mark_reviews_crawled(&item.item_id)?;
        tracker.advance(ItemPhase::Done)?;
        report.outcome = ItemOutcome::Completed;

        Ok(report)
    }
}

/// Parses and stores one fetched page, routing failures to the log
fn ingest_page<S: RecordStore + ?Sized>(
    store: &mut S,
    run_id: Option<i64>,
    item: &Item,
    page: PageFetch,
    report: &mut ItemReport,
) -> Result<(), HarvestError> {
    let body = match page.result {
        Ok(body) => body,
        Err(e) => {
            report.pages_failed += 1;
            let failure = Failure::new(
                &page.url,
                FailureKind::Transport,
                e.to_string(),
                &item.item_id,
            );
            return record_failure(store, run_id, &failure);
        }
    };

    if is_empty_payload(&body) {
        report.pages_failed += 1;
        let failure = Failure::new(
            &page.url,
            FailureKind::EmptyPayload,
            format!("Page {} returned an empty payload", page.page),
            &item.item_id,
        );
        return record_failure(store, run_id, &failure);
    }

    let reviews = match parse_reviews(&body, &item.item_id) {
        Ok(reviews) => reviews,
        Err(e) => {
            report.pages_failed += 1;
            let failure = Failure::new(&page.url, FailureKind::Parse, e.to_string(), &item.item_id);
            return record_failure(store, run_id, &failure);
        }
    };

    if !reviews.is_empty() {
        let stats = store.insert_reviews(&reviews)?;
        tracing::debug!(
            "Page {} of item {}: {} inserted, {} already stored",
            page.page,
            item.item_id,
            stats.inserted,
            stats.duplicates
        );
        report.reviews.merge(stats);
    }
    report.pages_ingested += 1;

    Ok(())
}

fn record_failure<S: RecordStore + ?Sized>(
    store: &mut S,
    run_id: Option<i64>,
    failure: &Failure,
) -> Result<(), HarvestError> {
    tracing::warn!("{} failure for {}: {}", failure.kind, failure.url, failure.message);
    store.append_failure(run_id, failure)?;
    Ok(())
}

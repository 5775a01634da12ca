//! Page fetch worker pool
//!
//! Fetches every review page of one item concurrently. A semaphore permit is
//! taken before each task is spawned onto a `JoinSet`, so no more than
//! `max_in_flight` fetch tasks exist at any time however many pages the
//! endpoint reports. The pool only produces bodies; nothing here touches the
//! store.

use crate::crawler::fetcher::{fetch_body, FetchError};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub url: String,
}

/// Outcome of one page fetch
#[derive(Debug)]
pub struct PageFetch {
    pub page: u32,
    pub url: String,
    pub result: Result<String, FetchError>,
}

type TaskOutput = (usize, Result<String, FetchError>);

/// Bounded pool of concurrent page fetches
pub struct PageFetchPool {
    client: Client,
    semaphore: Arc<Semaphore>,
    max_in_flight: usize,
}

impl PageFetchPool {
    /// Creates a pool allowing at most `max_in_flight` concurrent requests
    pub fn new(client: Client, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// The shared HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Fetches all pages and waits for every one of them
    ///
    /// Returns exactly one `PageFetch` per request, in request order. A
    /// failed or panicked task yields an error for its own page and leaves
    /// its siblings alone.
    pub async fn fetch_all(&self, requests: Vec<PageRequest>) -> Vec<PageFetch> {
        let mut results: Vec<Option<Result<String, FetchError>>> =
            requests.iter().map(|_| None).collect();
        let mut join_set: JoinSet<TaskOutput> = JoinSet::new();

        for (index, request) in requests.iter().enumerate() {
            // Finished tasks stay in the set until joined
            while join_set.len() >= self.max_in_flight {
                collect_next(&mut join_set, &mut results).await;
            }

            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    results[index] = Some(Err(FetchError::Aborted {
                        url: request.url.clone(),
                        message: e.to_string(),
                    }));
                    continue;
                }
            };

            let client = self.client.clone();
            let url = request.url.clone();
            join_set.spawn(async move {
                let _permit = permit;
                tracing::debug!("Fetching page {}", url);
                (index, fetch_body(&client, &url).await)
            });
        }

        while !join_set.is_empty() {
            collect_next(&mut join_set, &mut results).await;
        }

        requests
            .into_iter()
            .zip(results)
            .map(|(request, result)| {
                let result = match result {
                    Some(result) => result,
                    None => Err(FetchError::Aborted {
                        url: request.url.clone(),
                        message: "fetch task panicked or was cancelled".to_string(),
                    }),
                };
                PageFetch {
                    page: request.page,
                    url: request.url,
                    result,
                }
            })
            .collect()
    }
}

/// Waits for one task and stores its result in its request slot
async fn collect_next(
    join_set: &mut JoinSet<TaskOutput>,
    results: &mut [Option<Result<String, FetchError>>],
) {
    match join_set.join_next().await {
        Some(Ok((index, result))) => results[index] = Some(result),
        Some(Err(e)) => tracing::warn!("Page fetch task did not finish: {}", e),
        None => {}
    }
}

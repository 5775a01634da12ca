//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with user agent and timeouts
//! - Building review page URLs
//! - GET requests returning the raw body
//! - Error classification
//!
//! The fetcher never interprets the body: the review endpoint returns a JSON
//! object without its outer braces, and re-wrapping is the parser's job.

use crate::config::{CrawlerConfig, EndpointConfig, UserAgentConfig};
use crate::model::Item;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A failed fetch, always carrying the URL that was requested
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("Fetch task for {url} did not finish: {message}")]
    Aborted { url: String, message: String },
}

impl FetchError {
    /// The URL whose fetch failed
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Status { url, .. }
            | Self::Body { url, .. }
            | Self::Request { url, .. }
            | Self::Aborted { url, .. } => url,
        }
    }

    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_connect() {
            Self::Connect {
                url,
                message: error.to_string(),
            }
        } else if error.is_body() || error.is_decode() {
            Self::Body {
                url,
                message: error.to_string(),
            }
        } else {
            Self::Request {
                url,
                message: error.to_string(),
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// `request-timeout-secs` bounds the whole request including the body read;
/// the connect phase gets the same budget.
///
/// # Example
///
/// ```no_run
/// use review_harvest::config::{CrawlerConfig, UserAgentConfig};
/// use review_harvest::crawler::build_http_client;
///
/// let crawler = CrawlerConfig {
///     request_timeout_secs: 3,
///     max_concurrent_pages: 16,
///     page_size: 1_000_000,
/// };
/// let user_agent = UserAgentConfig {
///     crawler_name: "ReviewHarvest".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&crawler, &user_agent).unwrap();
/// ```
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(crawler.request_timeout_secs);

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds request URLs for the remote review endpoint
///
/// `<base>?itemId=<item>&sellerId=<seller>&currentPage=<n>&pageSize=<size>`
#[derive(Debug, Clone)]
pub struct ReviewEndpoint {
    base: Url,
    page_size: u32,
}

impl ReviewEndpoint {
    pub fn new(config: &EndpointConfig, page_size: u32) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(&config.base_url)?,
            page_size,
        })
    }

    /// URL of one review page of an item (pages start at 1)
    pub fn page_url(&self, item: &Item, page: u32) -> String {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("itemId", &item.item_id)
            .append_pair("sellerId", &item.seller_id)
            .append_pair("currentPage", &page.to_string())
            .append_pair("pageSize", &self.page_size.to_string());
        url.into()
    }
}

/// Fetches a URL and returns its raw body
///
/// Non-2xx statuses are failures. The body is returned as-is, even when empty;
/// telling an empty payload apart is left to the caller.
pub async fn fetch_body(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))
}

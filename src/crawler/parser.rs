//! Review payload parser
//!
//! The review endpoint answers with a JSON object whose outer `{` and `}` are
//! missing, e.g. `"rateDetail":{"paginator":{"lastPage":2},"rateList":[...]}`.
//! Every body is wrapped in braces before it is decoded.

use crate::model::Review;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A review page body that could not be decoded
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed review payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    #[serde(rename = "rateDetail")]
    rate_detail: ReviewDetail,
}

#[derive(Debug, Deserialize)]
struct ReviewDetail {
    #[serde(rename = "rateList", default)]
    rate_list: Option<Vec<RawReview>>,
}

/// One entry of `rateList`; every field is required
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReview {
    id: i64,
    auction_sku: String,
    rate_content: String,
    buy_count: i64,
    rate_date: String,
    useful: bool,
    anony: bool,
}

impl RawReview {
    fn into_review(self, item_id: &str) -> Review {
        Review {
            review_id: self.id,
            item_id: item_id.to_string(),
            content: self.rate_content,
            sku: self.auction_sku,
            buy_count: self.buy_count,
            rate_date: self.rate_date,
            useful: self.useful,
            anonymous: self.anony,
        }
    }
}

/// Restores the outer braces the endpoint strips
pub fn wrap_body(raw: &str) -> String {
    format!("{{{}}}", raw)
}

/// Returns true if the body carries no data at all
///
/// This is the "wrapped body is just `{}`" case, which upstream treats as a
/// failed fetch rather than as a payload.
pub fn is_empty_payload(raw: &str) -> bool {
    raw.trim().is_empty()
}

/// Reads `rateDetail.paginator.lastPage` from a probe body
///
/// Returns 0 when the body does not decode or the field is missing, negative,
/// or not an integer.
pub fn extract_page_count(raw: &str) -> u32 {
    let value: Value = match serde_json::from_str(&wrap_body(raw)) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Probe body does not decode: {}", e);
            return 0;
        }
    };

    value
        .pointer("/rateDetail/paginator/lastPage")
        .and_then(Value::as_u64)
        .and_then(|pages| u32::try_from(pages).ok())
        .unwrap_or(0)
}

/// Decodes every review of a page
///
/// All-or-nothing: one entry missing a field fails the whole page. A missing
/// or null `rateList` is an empty page, not an error.
pub fn parse_reviews(raw: &str, item_id: &str) -> Result<Vec<Review>, ParseError> {
    let payload: ReviewPayload = serde_json::from_str(&wrap_body(raw))?;

    Ok(payload
        .rate_detail
        .rate_list
        .unwrap_or_default()
        .into_iter()
        .map(|raw_review| raw_review.into_review(item_id))
        .collect())
}

/// Decodes every review of a page, yielding nothing if the page is unusable
///
/// The item pipeline calls `parse_reviews` instead, so that a page that does
/// not decode can be logged as a `parse` failure.
pub fn extract_reviews(raw: &str, item_id: &str) -> Vec<Review> {
    parse_reviews(raw, item_id).unwrap_or_default()
}

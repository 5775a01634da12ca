//! Domain model for the review crawler
//!
//! # Components
//!
//! - `Item`: a product whose reviews are crawled, plus its `reviews_crawled` flag
//! - `Review`: one decoded customer review
//! - `Failure`/`FailureRecord`: failure log entries
//! - `ItemPhase`: the per-item pipeline state machine

mod failure;
mod item;
mod item_phase;
mod review;

pub use failure::{Failure, FailureKind, FailureRecord};
pub use item::Item;
pub use item_phase::ItemPhase;
pub use review::Review;

/// One customer review
///
/// `review_id` is globally unique and is the deduplication key in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub review_id: i64,

    /// Owning item
    pub item_id: String,

    pub content: String,

    /// SKU/variant description, e.g. "color:gold;storage:64GB"
    pub sku: String,

    /// Purchase quantity counter reported by the endpoint
    pub buy_count: i64,

    /// Review date as sent by the endpoint
    pub rate_date: String,

    pub useful: bool,
    pub anonymous: bool,
}

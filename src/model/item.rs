/// A sellable product whose customer reviews are to be crawled
///
/// Items are created by an external loader. The crawler only reads them and
/// flips `reviews_crawled` once per item.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Unique item identifier on the remote marketplace
    pub item_id: String,

    /// Seller identifier, required by the review endpoint
    pub seller_id: String,

    pub title: String,

    /// Opaque locale fields, passed through unmodified
    pub area: String,
    pub location: String,
    pub seller_location: String,

    pub price: f64,

    /// Number of units sold
    pub sold: i64,

    /// Whether this item's reviews have been crawled
    pub reviews_crawled: bool,
}

impl Item {
    /// Creates a not-yet-crawled item with empty descriptive fields
    pub fn new(item_id: impl Into<String>, seller_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            seller_id: seller_id.into(),
            title: String::new(),
            area: String::new(),
            location: String::new(),
            seller_location: String::new(),
            price: 0.0,
            sold: 0,
            reviews_crawled: false,
        }
    }

    /// Sets the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

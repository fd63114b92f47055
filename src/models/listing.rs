use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AuctionListing — One active sell order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionListing {
    pub item_name: String,
    #[serde(default)]
    pub item_display_name: String,
    pub item_count: u64,
    #[serde(default)]
    pub auction_item_category: String,
    pub auction_price_per_unit: u64,
    #[serde(default)]
    pub date_auction_expire: Option<String>,
}

impl AuctionListing {
    /// Minimal listing with only the fields the aggregator reads.
    pub fn new(item_name: &str, auction_price_per_unit: u64, item_count: u64) -> Self {
        Self {
            item_name: item_name.to_string(),
            item_display_name: item_name.to_string(),
            item_count,
            auction_item_category: String::new(),
            auction_price_per_unit,
            date_auction_expire: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AuctionListResponse — `/auction/list` and `/auction/keyword-search` payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionListResponse {
    #[serde(default)]
    pub auction_item: Vec<AuctionListing>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

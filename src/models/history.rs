use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// HistoryRecord — One executed trade from a snapshot partition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub auction_buy_id: Option<String>,
    pub date_auction_buy: DateTime<Utc>,
    pub item_name: String,
    pub item_count: u64,
    pub auction_price_per_unit: u64,
    /// Any other fields carried by the dump, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HistoryRecord {
    pub fn new(
        item_name: &str,
        auction_price_per_unit: u64,
        item_count: u64,
        date_auction_buy: DateTime<Utc>,
    ) -> Self {
        Self {
            auction_buy_id: None,
            date_auction_buy,
            item_name: item_name.to_string(),
            item_count,
            auction_price_per_unit,
            extra: serde_json::Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// AuctionHistoryResponse — `/auction/history` payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionHistoryResponse {
    #[serde(default)]
    pub auction_history: Vec<HistoryRecord>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ItemSettings — Persisted alert settings for one watched item
// ---------------------------------------------------------------------------

/// Durable form of an item's alert thresholds.
///
/// Either a legacy fixed price or an expression source may be set for each
/// bound. When both are present the expression wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSettings {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price_expr: Option<String>,
}

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// StatisticsSummary — Order statistics over the current listings of one item
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    pub min_price: u64,
    pub avg25: u64,
    pub avg50: u64,
    pub avg100: u64,
    pub avg200: u64,
    #[serde(alias = "totalCount")]
    pub total_volume: u64,
}

impl StatisticsSummary {
    /// Read one statistic as a float, ready to bind into an expression.
    pub fn get(&self, kind: StatKind) -> f64 {
        let value = match kind {
            StatKind::MinPrice => self.min_price,
            StatKind::Avg25 => self.avg25,
            StatKind::Avg50 => self.avg50,
            StatKind::Avg100 => self.avg100,
            StatKind::Avg200 => self.avg200,
            StatKind::TotalVolume => self.total_volume,
        };
        value as f64
    }
}

// ---------------------------------------------------------------------------
// StatKind — Names of the summary fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatKind {
    MinPrice,
    Avg25,
    Avg50,
    Avg100,
    Avg200,
    #[serde(alias = "totalCount")]
    TotalVolume,
}

impl StatKind {
    pub const ALL: [StatKind; 6] = [
        StatKind::MinPrice,
        StatKind::Avg25,
        StatKind::Avg50,
        StatKind::Avg100,
        StatKind::Avg200,
        StatKind::TotalVolume,
    ];

    /// The identifier used for this statistic inside price expressions.
    pub fn name(self) -> &'static str {
        match self {
            StatKind::MinPrice => "minPrice",
            StatKind::Avg25 => "avg25",
            StatKind::Avg50 => "avg50",
            StatKind::Avg100 => "avg100",
            StatKind::Avg200 => "avg200",
            StatKind::TotalVolume => "totalVolume",
        }
    }

    /// Look up a statistic by expression identifier. `totalCount` is the
    /// legacy spelling of `totalVolume`.
    pub fn from_name(name: &str) -> Option<StatKind> {
        match name {
            "minPrice" => Some(StatKind::MinPrice),
            "avg25" => Some(StatKind::Avg25),
            "avg50" => Some(StatKind::Avg50),
            "avg100" => Some(StatKind::Avg100),
            "avg200" => Some(StatKind::Avg200),
            "totalVolume" | "totalCount" => Some(StatKind::TotalVolume),
            _ => None,
        }
    }

    /// Every identifier that names a built-in statistic, aliases included.
    pub fn reserved_names() -> impl Iterator<Item = &'static str> {
        Self::ALL
            .iter()
            .map(|k| k.name())
            .chain(std::iter::once("totalCount"))
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

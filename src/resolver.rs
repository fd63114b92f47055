//! Resolves `@"Item"` references to live statistics.
//!
//! Every distinct item referenced by an expression is fetched once, all
//! concurrently. A reference whose fetch fails is bound to NaN for every
//! statistic instead of failing the whole resolution, so the expression can
//! still be evaluated and reports NaN only if that item's value is used.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::Result;
use crate::expr::{extract, Bindings, ReferenceTable};
use crate::models::{StatKind, StatisticsSummary};

/// Supplier of per-item statistics, usually the auction API client.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// `false` when the source cannot make requests at all (no credentials).
    fn is_available(&self) -> bool {
        true
    }

    async fn fetch_stats(&self, item_name: &str) -> Result<StatisticsSummary>;
}

// ---------------------------------------------------------------------------
// ResolvedReferences
// ---------------------------------------------------------------------------

/// Statistic values for every reference of one expression.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    references: ReferenceTable,
    values: HashMap<String, BTreeMap<StatKind, f64>>,
}

impl ResolvedReferences {
    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    /// Value bound to `synthetic` for `kind`.
    pub fn value(&self, synthetic: &str, kind: StatKind) -> Option<f64> {
        self.values.get(synthetic).and_then(|v| v.get(&kind)).copied()
    }

    /// All per-kind values of one reference.
    pub fn values(&self, synthetic: &str) -> Option<&BTreeMap<StatKind, f64>> {
        self.values.get(synthetic)
    }

    /// Synthetic identifiers whose data could not be fetched.
    pub fn unavailable(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, v)| v.values().all(|x| x.is_nan()))
            .map(|(k, _)| k.as_str())
    }

    /// Independent binding map for one statistic kind.
    pub fn bindings(&self, kind: StatKind) -> Bindings {
        self.values
            .iter()
            .map(|(name, per_kind)| {
                let value = per_kind.get(&kind).copied().unwrap_or(f64::NAN);
                (name.clone(), value)
            })
            .collect()
    }
}

fn summary_values(summary: &StatisticsSummary) -> BTreeMap<StatKind, f64> {
    StatKind::ALL.iter().map(|&k| (k, summary.get(k))).collect()
}

fn nan_values() -> BTreeMap<StatKind, f64> {
    StatKind::ALL.iter().map(|&k| (k, f64::NAN)).collect()
}

// ---------------------------------------------------------------------------
// ItemReferenceResolver
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ItemReferenceResolver {
    source: Arc<dyn StatsSource>,
}

impl ItemReferenceResolver {
    pub fn new(source: Arc<dyn StatsSource>) -> Self {
        Self { source }
    }

    /// Extract the references in `expression_source` and fetch their statistics.
    pub async fn resolve(&self, expression_source: &str) -> ResolvedReferences {
        self.resolve_table(extract(expression_source)).await
    }

    /// Fetch statistics for an already extracted reference table.
    pub async fn resolve_table(&self, references: ReferenceTable) -> ResolvedReferences {
        if references.is_empty() {
            return ResolvedReferences {
                references,
                values: HashMap::new(),
            };
        }

        if !self.source.is_available() {
            debug!(references = references.len(), "No usable credentials, binding references to NaN");
            let values = references
                .iter()
                .map(|(synthetic, _)| (synthetic.to_string(), nan_values()))
                .collect();
            return ResolvedReferences { references, values };
        }

        let fetches = references.iter().map(|(synthetic, item_name)| async move {
            let values = match self.source.fetch_stats(item_name).await {
                Ok(summary) => summary_values(&summary),
                Err(e) => {
                    warn!(item = item_name, error = %e, "Failed to fetch auction statistics");
                    nan_values()
                }
            };
            (synthetic.to_string(), values)
        });
        let values = join_all(fetches).await.into_iter().collect();

        ResolvedReferences { references, values }
    }

    /// Run a fresh resolution pass and return the bindings for one kind.
    pub async fn resolve_kind(&self, expression_source: &str, kind: StatKind) -> Bindings {
        self.resolve(expression_source).await.bindings(kind)
    }
}

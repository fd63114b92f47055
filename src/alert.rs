//! Alert thresholds for watched items.
//!
//! A threshold is either a fixed price or a [`PriceExpression`]. Expressions
//! are evaluated once per statistic kind: bare statistic names (`avg25`,
//! `minPrice`, ...) read the watched item's own statistics, while
//! `@"Other Item"` references read the other item's value for the kind being
//! evaluated.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expr::{Bindings, CompiledExpression, PriceExpression};
use crate::models::{ItemSettings, StatKind, StatisticsSummary};
use crate::resolver::{ItemReferenceResolver, ResolvedReferences, StatsSource};

/// Outcome of one threshold evaluation, ready for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdResult {
    pub value: f64,
    pub is_error: bool,
}

impl ThresholdResult {
    /// Non-finite values (NaN from unavailable data, infinities) are errors.
    pub fn from_value(value: f64) -> Self {
        Self {
            value,
            is_error: !value.is_finite(),
        }
    }

    pub fn error() -> Self {
        Self {
            value: f64::NAN,
            is_error: true,
        }
    }

    /// The value when usable.
    pub fn usable(&self) -> Option<f64> {
        (!self.is_error).then_some(self.value)
    }
}

pub type ThresholdValues = BTreeMap<StatKind, ThresholdResult>;

// ---------------------------------------------------------------------------
// AlertThreshold
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum AlertThreshold {
    Fixed(u64),
    Expression(PriceExpression),
}

impl AlertThreshold {
    fn from_fields(fixed: Option<u64>, expr: Option<&str>) -> Option<Self> {
        match expr.map(str::trim).filter(|e| !e.is_empty()) {
            Some(source) => Some(Self::Expression(PriceExpression::new(source))),
            None => fixed.map(Self::Fixed),
        }
    }

    /// Lower bound from persisted settings; the expression wins over the fixed price.
    pub fn lower(settings: &ItemSettings) -> Option<Self> {
        Self::from_fields(settings.min_price, settings.min_price_expr.as_deref())
    }

    /// Upper bound from persisted settings; the expression wins over the fixed price.
    pub fn upper(settings: &ItemSettings) -> Option<Self> {
        Self::from_fields(settings.max_price, settings.max_price_expr.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Price classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceAlert {
    /// At or below the lower bound.
    Low,
    /// At or above the upper bound.
    High,
    None,
}

/// Compare a price against optional bounds. Zero, negative and non-finite
/// bounds are treated as unset; the lower bound is checked first.
pub fn classify_price(price: f64, low: Option<f64>, high: Option<f64>) -> PriceAlert {
    let set = |b: Option<f64>| b.filter(|v| v.is_finite() && *v > 0.0);
    if let Some(low) = set(low) {
        if price <= low {
            return PriceAlert::Low;
        }
    }
    if let Some(high) = set(high) {
        if price >= high {
            return PriceAlert::High;
        }
    }
    PriceAlert::None
}

/// Evaluated lower and upper thresholds of one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemAlerts {
    pub lower: Option<ThresholdValues>,
    pub upper: Option<ThresholdValues>,
}

impl ItemAlerts {
    /// Classify the item's own statistic of `kind` against the thresholds
    /// evaluated for that kind.
    pub fn classify(&self, kind: StatKind, own: &StatisticsSummary) -> PriceAlert {
        let bound = |t: &Option<ThresholdValues>| {
            t.as_ref()
                .and_then(|values| values.get(&kind))
                .and_then(ThresholdResult::usable)
        };
        classify_price(own.get(kind), bound(&self.lower), bound(&self.upper))
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Bindings for one kind: the item's own statistics under their built-in
/// names plus every resolved reference.
pub fn bindings_for(resolved: &ResolvedReferences, own: &StatisticsSummary, kind: StatKind) -> Bindings {
    let mut bindings = resolved.bindings(kind);
    for stat in StatKind::ALL {
        bindings.insert(stat.name().to_string(), own.get(stat));
    }
    bindings.insert("totalCount".to_string(), own.get(StatKind::TotalVolume));
    bindings
}

/// Evaluate a compiled expression for a single kind.
pub fn evaluate_with(
    compiled: &CompiledExpression,
    resolved: &ResolvedReferences,
    own: &StatisticsSummary,
    kind: StatKind,
) -> ThresholdResult {
    match compiled.evaluate(&bindings_for(resolved, own, kind)) {
        Ok(value) => ThresholdResult::from_value(value),
        Err(e) => {
            debug!(expression = compiled.source(), kind = %kind, error = %e, "Threshold evaluation failed");
            ThresholdResult::error()
        }
    }
}

/// Evaluates item thresholds, fetching referenced items through a
/// [`StatsSource`].
#[derive(Clone)]
pub struct AlertEngine {
    resolver: ItemReferenceResolver,
}

impl AlertEngine {
    pub fn new(source: Arc<dyn StatsSource>) -> Self {
        Self {
            resolver: ItemReferenceResolver::new(source),
        }
    }

    pub fn resolver(&self) -> &ItemReferenceResolver {
        &self.resolver
    }

    /// Evaluate `expression` for every statistic kind.
    ///
    /// Referenced items are fetched once; each kind is then evaluated against
    /// its own binding map. An invalid expression yields an error result for
    /// every kind without any fetch.
    pub async fn evaluate(&self, expression: &PriceExpression, own: &StatisticsSummary) -> ThresholdValues {
        let Ok(compiled) = expression.compiled() else {
            return StatKind::ALL
                .iter()
                .map(|&k| (k, ThresholdResult::error()))
                .collect();
        };

        let resolved = self
            .resolver
            .resolve_table(compiled.references().clone())
            .await;
        StatKind::ALL
            .iter()
            .map(|&kind| (kind, evaluate_with(compiled, &resolved, own, kind)))
            .collect()
    }

    /// Evaluate `expression` for one kind with a resolution pass of its own.
    pub async fn evaluate_kind(
        &self,
        expression: &PriceExpression,
        own: &StatisticsSummary,
        kind: StatKind,
    ) -> ThresholdResult {
        let Ok(compiled) = expression.compiled() else {
            return ThresholdResult::error();
        };
        let resolved = self
            .resolver
            .resolve_table(compiled.references().clone())
            .await;
        evaluate_with(compiled, &resolved, own, kind)
    }

    /// Evaluate a threshold. A fixed price applies to every kind unchanged.
    pub async fn evaluate_threshold(&self, threshold: &AlertThreshold, own: &StatisticsSummary) -> ThresholdValues {
        match threshold {
            AlertThreshold::Fixed(price) => StatKind::ALL
                .iter()
                .map(|&k| (k, ThresholdResult::from_value(*price as f64)))
                .collect(),
            AlertThreshold::Expression(expression) => self.evaluate(expression, own).await,
        }
    }

    /// Evaluate both bounds configured in `settings`.
    pub async fn evaluate_item(&self, settings: &ItemSettings, own: &StatisticsSummary) -> ItemAlerts {
        let lower = match AlertThreshold::lower(settings) {
            Some(t) => Some(self.evaluate_threshold(&t, own).await),
            None => None,
        };
        let upper = match AlertThreshold::upper(settings) {
            Some(t) => Some(self.evaluate_threshold(&t, own).await),
            None => None,
        };
        ItemAlerts { lower, upper }
    }
}

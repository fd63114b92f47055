//! Tests for item reference resolution.

mod common;

use std::sync::Arc;

use common::{flat_summary, MockStats};
use mabi_auction_sdk::{ItemReferenceResolver, StatKind};

#[tokio::test]
async fn expression_without_references_does_no_io() {
    let stats = Arc::new(MockStats::new());
    let resolver = ItemReferenceResolver::new(stats.clone());

    let resolved = resolver.resolve("avg25 * 2").await;
    assert!(resolved.references().is_empty());
    assert!(resolved.bindings(StatKind::Avg25).is_empty());
    assert!(stats.calls().is_empty());
}

#[tokio::test]
async fn each_distinct_item_is_fetched_once() {
    let stats = Arc::new(
        MockStats::new()
            .with("Iron Ore", flat_summary(100, 40))
            .with("Bread", flat_summary(7, 3)),
    );
    let resolver = ItemReferenceResolver::new(stats.clone());

    let resolved = resolver
        .resolve(r#"@"Iron Ore" + @"Bread" * @"Iron Ore""#)
        .await;

    let mut calls = stats.calls();
    calls.sort();
    assert_eq!(calls, vec!["Bread", "Iron Ore"]);
    assert_eq!(resolved.value("Iron_Ore", StatKind::Avg50), Some(100.0));
    assert_eq!(resolved.value("Bread", StatKind::TotalVolume), Some(3.0));
}

#[tokio::test]
async fn failed_fetch_binds_nan_without_failing_others() {
    let stats = Arc::new(MockStats::new().with("Bread", flat_summary(7, 3)));
    let resolver = ItemReferenceResolver::new(stats.clone());

    let resolved = resolver.resolve(r#"@"Bread" + @"Missing Item""#).await;

    assert_eq!(resolved.value("Bread", StatKind::MinPrice), Some(7.0));
    for kind in StatKind::ALL {
        assert!(resolved.value("Missing_Item", kind).unwrap().is_nan());
    }
    assert_eq!(resolved.unavailable().collect::<Vec<_>>(), vec!["Missing_Item"]);
}

#[tokio::test]
async fn unavailable_source_binds_nan_without_fetching() {
    let stats = Arc::new(MockStats::new().with("Bread", flat_summary(7, 3)).unavailable());
    let resolver = ItemReferenceResolver::new(stats.clone());

    let resolved = resolver.resolve(r#"@"Bread" * 2"#).await;

    assert!(stats.calls().is_empty());
    assert!(resolved.value("Bread", StatKind::Avg25).unwrap().is_nan());
}

#[tokio::test]
async fn bindings_are_independent_per_kind() {
    let summary = mabi_auction_sdk::StatisticsSummary {
        min_price: 1,
        avg25: 2,
        avg50: 3,
        avg100: 4,
        avg200: 5,
        total_volume: 6,
    };
    let stats = Arc::new(MockStats::new().with("Bread", summary));
    let resolver = ItemReferenceResolver::new(stats.clone());

    let resolved = resolver.resolve(r#"@"Bread""#).await;
    assert_eq!(resolved.bindings(StatKind::MinPrice)["Bread"], 1.0);
    assert_eq!(resolved.bindings(StatKind::Avg200)["Bread"], 5.0);
    assert_eq!(resolved.bindings(StatKind::TotalVolume)["Bread"], 6.0);

    let only_avg100 = resolver.resolve_kind(r#"@"Bread""#, StatKind::Avg100).await;
    assert_eq!(only_avg100["Bread"], 4.0);
    assert_eq!(stats.calls().len(), 2);
}

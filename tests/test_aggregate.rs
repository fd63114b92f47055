//! Tests for the listing statistics aggregator.

mod common;

use common::listing;
use mabi_auction_sdk::{aggregate, StatKind, StatisticsSummary};

// ---------------------------------------------------------------------------
// Basic statistics
// ---------------------------------------------------------------------------

#[test]
fn empty_listings_yield_all_zeros() {
    assert_eq!(aggregate(&[]), StatisticsSummary::default());
}

#[test]
fn min_price_and_volume_ignore_input_order() {
    let listings = vec![listing(300, 2), listing(100, 1), listing(200, 7)];
    let summary = aggregate(&listings);
    assert_eq!(summary.min_price, 100);
    assert_eq!(summary.total_volume, 10);
}

// ---------------------------------------------------------------------------
// Cutoff averages
// ---------------------------------------------------------------------------

#[test]
fn cutoff_consumes_cheapest_units_first() {
    let listings = vec![listing(200, 50), listing(100, 20)];
    let summary = aggregate(&listings);
    // cheapest 25: 20 @ 100 + 5 @ 200
    assert_eq!(summary.avg25, 120);
    // cheapest 50: 20 @ 100 + 30 @ 200 = 8000 / 50
    assert_eq!(summary.avg50, 160);
}

#[test]
fn cutoff_above_total_volume_averages_everything() {
    let listings = vec![listing(100, 10), listing(400, 10)];
    let summary = aggregate(&listings);
    assert_eq!(summary.avg25, 250);
    assert_eq!(summary.avg50, 250);
    assert_eq!(summary.avg100, 250);
    assert_eq!(summary.avg200, 250);
}

#[test]
fn averages_are_floored() {
    let listings = vec![listing(100, 2), listing(101, 1)];
    // 301 / 3 = 100.33
    assert_eq!(aggregate(&listings).avg25, 100);
}

#[test]
fn large_prices_do_not_overflow() {
    let listings = vec![listing(u64::MAX / 2, 200), listing(u64::MAX / 2, 200)];
    assert_eq!(aggregate(&listings).avg200, u64::MAX / 2);
}

#[test]
fn averages_never_increase_with_fewer_units() {
    let listings = vec![listing(50, 30), listing(70, 40), listing(90, 100), listing(120, 80)];
    let s = aggregate(&listings);
    assert!(s.min_price <= s.avg25);
    assert!(s.avg25 <= s.avg50);
    assert!(s.avg50 <= s.avg100);
    assert!(s.avg100 <= s.avg200);
}

// ---------------------------------------------------------------------------
// Summary access
// ---------------------------------------------------------------------------

#[test]
fn get_reads_each_kind() {
    let summary = aggregate(&[listing(100, 30)]);
    assert_eq!(summary.get(StatKind::MinPrice), 100.0);
    assert_eq!(summary.get(StatKind::Avg25), 100.0);
    assert_eq!(summary.get(StatKind::TotalVolume), 30.0);
}

#[test]
fn summary_accepts_legacy_total_count_field() {
    let json = r#"{"minPrice":1,"avg25":2,"avg50":3,"avg100":4,"avg200":5,"totalCount":6}"#;
    let summary: StatisticsSummary = serde_json::from_str(json).unwrap();
    assert_eq!(summary.total_volume, 6);
}

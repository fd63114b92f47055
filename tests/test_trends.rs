//! Tests for history trend aggregation.

mod common;

use chrono::Timelike;
use common::{trade, utc};
use mabi_auction_sdk::trends::{average_24h, daily_slots, four_hour_slots, group_by_item, last_24h, weighted_average};

#[test]
fn group_by_item_keeps_order_within_groups() {
    let records = vec![
        trade("Bread", 1, 1, utc(2026, 1, 1, 0, 0)),
        trade("Iron Ore", 2, 1, utc(2026, 1, 1, 0, 1)),
        trade("Bread", 3, 1, utc(2026, 1, 1, 0, 2)),
    ];
    let groups = group_by_item(records);
    assert_eq!(groups.len(), 2);
    let bread: Vec<_> = groups["Bread"].iter().map(|r| r.auction_price_per_unit).collect();
    assert_eq!(bread, vec![1, 3]);
}

#[test]
fn weighted_average_uses_volume() {
    let at = utc(2026, 1, 1, 0, 0);
    let records = vec![trade("Bread", 100, 9, at), trade("Bread", 200, 1, at)];
    assert_eq!(weighted_average(&records), 110);
}

#[test]
fn last_24h_window_is_inclusive() {
    let now = utc(2026, 1, 10, 12, 0);
    let records = vec![
        trade("Bread", 1, 1, utc(2026, 1, 9, 11, 59)),
        trade("Bread", 2, 1, utc(2026, 1, 9, 12, 0)),
        trade("Bread", 3, 1, utc(2026, 1, 10, 12, 0)),
        trade("Bread", 4, 1, utc(2026, 1, 10, 12, 1)),
    ];
    let prices: Vec<_> = last_24h(&records, now)
        .iter()
        .map(|r| r.auction_price_per_unit)
        .collect();
    assert_eq!(prices, vec![2, 3]);
    assert_eq!(average_24h(&records, now), 2);
    assert_eq!(average_24h(&[], now), 0);
}

#[test]
fn four_hour_slots_bucket_trades() {
    // 05:30 UTC = 14:30 KST, latest slot 12:00-16:00 KST = 03:00-07:00 UTC
    let now = utc(2026, 1, 10, 5, 30);
    let records = vec![
        trade("Bread", 100, 1, utc(2026, 1, 10, 4, 0)),
        trade("Bread", 300, 1, utc(2026, 1, 10, 5, 0)),
        trade("Bread", 50, 2, utc(2026, 1, 10, 0, 30)),
        trade("Bread", 999, 1, utc(2026, 1, 8, 0, 0)),
    ];
    let slots = four_hour_slots(&records, now);

    assert_eq!(slots.len(), 6);
    assert_eq!(slots[5].start.hour(), 12);
    assert_eq!(slots[5].average_price, 200);
    assert_eq!(slots[5].volume, 2);
    // 00:30 UTC = 09:30 KST, inside 08:00-12:00
    assert_eq!(slots[4].average_price, 50);
    assert_eq!(slots[4].volume, 2);
    assert!(slots[..4].iter().all(|s| s.volume == 0 && s.average_price == 0));
}

#[test]
fn trade_on_slot_boundary_counts_in_both_slots() {
    let now = utc(2026, 1, 10, 5, 30);
    // 03:00 UTC = 12:00 KST, the boundary between the last two slots
    let records = vec![trade("Bread", 10, 1, utc(2026, 1, 10, 3, 0))];
    let slots = four_hour_slots(&records, now);
    assert_eq!(slots[4].volume, 1);
    assert_eq!(slots[5].volume, 1);
}

#[test]
fn daily_slots_follow_kst_calendar_days() {
    // 16:00 UTC on the 9th is 01:00 KST on the 10th
    let now = utc(2026, 1, 9, 16, 0);
    let records = vec![
        trade("Bread", 100, 3, utc(2026, 1, 9, 15, 30)),
        trade("Bread", 40, 1, utc(2026, 1, 9, 14, 59)),
        trade("Bread", 70, 1, utc(2026, 1, 3, 15, 0)),
        trade("Bread", 1, 1, utc(2026, 1, 3, 14, 0)),
    ];
    let slots = daily_slots(&records, now);

    assert_eq!(slots.len(), 7);
    assert_eq!(slots[6].start.date_naive(), chrono::NaiveDate::from_ymd_opt(2026, 1, 10).unwrap());
    assert_eq!(slots[6].volume, 3);
    assert_eq!(slots[6].average_price, 100);
    assert_eq!(slots[5].volume, 1);
    assert_eq!(slots[5].average_price, 40);
    // Jan 4 KST starts at 15:00 UTC on Jan 3
    assert_eq!(slots[0].start.date_naive(), chrono::NaiveDate::from_ymd_opt(2026, 1, 4).unwrap());
    assert_eq!(slots[0].volume, 1);
    assert_eq!(slots[0].average_price, 70);
}

//! Price trends over synced trade history.
//!
//! Every window is aligned to KST and inclusive of both ends, so a trade
//! stamped exactly on a slot boundary counts toward both neighbouring slots.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};
use serde::Serialize;

use crate::config;
use crate::models::HistoryRecord;

const FOUR_HOUR_SLOTS: i64 = 6;
const DAILY_SLOTS: i64 = 7;

/// Aggregated trades inside one time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendSlot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Volume-weighted average unit price, floored. Zero when nothing traded.
    pub average_price: u64,
    pub volume: u64,
}

impl TrendSlot {
    fn collect<'a, I>(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>, records: I) -> Self
    where
        I: IntoIterator<Item = &'a HistoryRecord>,
    {
        let inside: Vec<&HistoryRecord> = records
            .into_iter()
            .filter(|r| within(r, start, end))
            .collect();
        Self {
            start,
            end,
            average_price: weighted_average(inside.iter().copied()),
            volume: inside.iter().map(|r| r.item_count).sum(),
        }
    }
}

fn within(record: &HistoryRecord, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> bool {
    record.date_auction_buy >= start && record.date_auction_buy <= end
}

/// Start of `hour` on the KST calendar day of `local`.
fn at_hour(local: DateTime<FixedOffset>, hour: u32) -> DateTime<FixedOffset> {
    NaiveTime::from_hms_opt(hour, 0, 0)
        .map(|t| local.date_naive().and_time(t))
        .and_then(|naive| config::kst().from_local_datetime(&naive).single())
        .unwrap_or(local)
}

/// Split records by item name, keeping their relative order.
pub fn group_by_item(records: Vec<HistoryRecord>) -> HashMap<String, Vec<HistoryRecord>> {
    let mut groups: HashMap<String, Vec<HistoryRecord>> = HashMap::new();
    for record in records {
        groups.entry(record.item_name.clone()).or_default().push(record);
    }
    groups
}

/// `floor(sum(price * count) / sum(count))`, or 0 when there is no volume.
pub fn weighted_average<'a, I>(records: I) -> u64
where
    I: IntoIterator<Item = &'a HistoryRecord>,
{
    let (value, volume) = records.into_iter().fold((0u128, 0u128), |(v, n), r| {
        (
            v + u128::from(r.auction_price_per_unit) * u128::from(r.item_count),
            n + u128::from(r.item_count),
        )
    });
    if volume == 0 {
        return 0;
    }
    u64::try_from(value / volume).unwrap_or(u64::MAX)
}

/// Trades in the 24 hours up to and including `now`.
pub fn last_24h(records: &[HistoryRecord], now: DateTime<Utc>) -> Vec<&HistoryRecord> {
    let end = now.with_timezone(&config::kst());
    let start = end - chrono::Duration::hours(24);
    records.iter().filter(|r| within(r, start, end)).collect()
}

pub fn average_24h(records: &[HistoryRecord], now: DateTime<Utc>) -> u64 {
    weighted_average(last_24h(records, now))
}

/// Six consecutive 4-hour slots, oldest first, the last one containing
/// `now`. Slots start at KST hours divisible by four.
pub fn four_hour_slots(records: &[HistoryRecord], now: DateTime<Utc>) -> Vec<TrendSlot> {
    let local = now.with_timezone(&config::kst());
    let latest = at_hour(local, local.hour() / 4 * 4);

    (0..FOUR_HOUR_SLOTS)
        .rev()
        .map(|i| {
            let start = latest - chrono::Duration::hours(4 * i);
            let end = start + chrono::Duration::hours(4);
            TrendSlot::collect(start, end, records)
        })
        .collect()
}

/// Seven KST calendar days ending today, oldest first.
pub fn daily_slots(records: &[HistoryRecord], now: DateTime<Utc>) -> Vec<TrendSlot> {
    let today = at_hour(now.with_timezone(&config::kst()), 0);

    (0..DAILY_SLOTS)
        .rev()
        .map(|i| {
            let start = today - chrono::Duration::days(i);
            let end = start + chrono::Duration::days(1) - chrono::Duration::milliseconds(1);
            TrendSlot::collect(start, end, records)
        })
        .collect()
}

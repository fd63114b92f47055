//! Shared test fixtures for the auction SDK integration tests.
//!
//! Provides a scripted [`MockTransport`] that records every request and the
//! peak number of requests in flight, a [`MockStats`] statistics source, and
//! helpers for building listing and gzip partition payloads.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;

use mabi_auction_sdk::transport::HttpResponse;
use mabi_auction_sdk::{AuctionError, AuctionListing, HistoryRecord, Result, StatisticsSummary, StatsSource, Transport};

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Transport answering from scripted routes.
///
/// A route matches a URL that starts with its prefix; the longest matching
/// prefix wins. A route with several queued responses serves them in order
/// and then keeps repeating the last one. Unrouted URLs get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<Request>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    offline: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every request open for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn route(&self, prefix: &str, response: HttpResponse) {
        self.route_sequence(prefix, vec![response]);
    }

    pub fn route_sequence(&self, prefix: &str, responses: Vec<HttpResponse>) {
        self.routes
            .lock()
            .insert(prefix.to_string(), responses.into_iter().collect());
    }

    /// Make every request fail at the connection level.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests_to(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.starts_with(prefix))
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, url: &str) -> HttpResponse {
        let mut routes = self.routes.lock();
        let best = routes
            .keys()
            .filter(|prefix| url.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())
            .cloned();
        match best.and_then(|prefix| routes.get_mut(&prefix)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::new(404, b"Not Found".to_vec())
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.requests.lock().push(Request {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(AuctionError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "offline",
            )));
        }
        Ok(self.respond(url))
    }
}

// ---------------------------------------------------------------------------
// MockStats
// ---------------------------------------------------------------------------

/// Statistics source with canned summaries and a call log.
#[derive(Default)]
pub struct MockStats {
    stats: HashMap<String, StatisticsSummary>,
    calls: Mutex<Vec<String>>,
    unavailable: bool,
}

impl MockStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, item: &str, summary: StatisticsSummary) -> Self {
        self.stats.insert(item.to_string(), summary);
        self
    }

    /// Behave like a client with no credentials.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl StatsSource for MockStats {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn fetch_stats(&self, item_name: &str) -> Result<StatisticsSummary> {
        self.calls.lock().push(item_name.to_string());
        tokio::task::yield_now().await;
        self.stats
            .get(item_name)
            .copied()
            .ok_or_else(|| AuctionError::NotFound(item_name.to_string()))
    }
}

/// A summary with every statistic set to `price` and the given volume.
pub fn flat_summary(price: u64, volume: u64) -> StatisticsSummary {
    StatisticsSummary {
        min_price: price,
        avg25: price,
        avg50: price,
        avg100: price,
        avg200: price,
        total_volume: volume,
    }
}

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

pub fn listing(price: u64, count: u64) -> AuctionListing {
    AuctionListing::new("Fine Leather", price, count)
}

/// JSON body of a `/list` response.
pub fn list_body(listings: &[AuctionListing]) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "auction_item": listings,
        "next_cursor": null,
    }))
    .unwrap()
}

pub fn ok_json(value: serde_json::Value) -> HttpResponse {
    HttpResponse::new(200, serde_json::to_vec(&value).unwrap())
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// A 200 response carrying a gzip-compressed partition.
pub fn partition_response(records: &[HistoryRecord]) -> HttpResponse {
    HttpResponse::new(200, gzip(&serde_json::to_vec(records).unwrap()))
}

pub fn trade(item: &str, price: u64, count: u64, at: DateTime<Utc>) -> HistoryRecord {
    HistoryRecord::new(item, price, count, at)
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

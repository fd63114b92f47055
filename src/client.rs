//! Nexon Open API client for the Mabinogi auction house.
//!
//! Requests rotate round-robin through a pool of API keys, wait a short fixed
//! delay before each attempt, and retry with linear backoff. When the API
//! reports that the quota is exhausted the client's cancellation token is
//! tripped: retries in flight stop and later calls fail fast until
//! [`NexonClient::reset_quota`] is called.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::aggregate::aggregate;
use crate::cache::{CacheEntry, CachePayload, CacheStore};
use crate::config;
use crate::error::{AuctionError, Result};
use crate::models::{AuctionHistoryResponse, AuctionListResponse, HistoryRecord, StatisticsSummary};
use crate::resolver::StatsSource;
use crate::retry::{retry, CancelToken, RetryPolicy};
use crate::transport::{HttpResponse, Transport};

/// Split a comma-separated key string, dropping blanks.
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

/// Turn a non-success response into the matching error.
fn error_from_response(response: &HttpResponse) -> AuctionError {
    match response.json::<ErrorBody>() {
        Ok(ErrorBody {
            error: Some(detail),
        }) => {
            if detail.name == config::QUOTA_EXHAUSTED_CODE {
                AuctionError::QuotaExhausted
            } else {
                AuctionError::Api {
                    name: detail.name,
                    message: detail.message,
                }
            }
        }
        _ => AuctionError::Status {
            status: response.status,
            message: String::from_utf8_lossy(&response.body)
                .chars()
                .take(200)
                .collect(),
        },
    }
}

// ---------------------------------------------------------------------------
// NexonClient
// ---------------------------------------------------------------------------

pub struct NexonClient {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
    keys: Vec<String>,
    next_key: AtomicUsize,
    base_url: String,
    retry_policy: RetryPolicy,
    request_delay: Duration,
    listing_ttl: Duration,
    quota: CancelToken,
}

impl NexonClient {
    /// Create a client over `keys`. Keys are trimmed and blanks dropped.
    pub fn new<I, S>(keys: I, transport: Arc<dyn Transport>, cache: Arc<dyn CacheStore>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            transport,
            cache,
            keys,
            next_key: AtomicUsize::new(0),
            base_url: config::NEXON_API_BASE.to_string(),
            retry_policy: RetryPolicy::default(),
            request_delay: config::REQUEST_DELAY,
            listing_ttl: config::LISTING_CACHE_TTL,
            quota: CancelToken::new(),
        }
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Fixed pause before every request attempt. Defaults to 500 ms.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listing_ttl = ttl;
        self
    }

    pub fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn is_quota_exhausted(&self) -> bool {
        self.quota.is_cancelled()
    }

    /// Re-enable requests after a quota exhaustion.
    pub fn reset_quota(&self) {
        self.quota.reset();
    }

    fn next_key(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.next_key.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(&self.keys[index])
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| AuctionError::InvalidArgument(format!("Bad API URL: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url.into())
    }

    async fn request_once<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        let key = self
            .next_key()
            .ok_or_else(|| AuctionError::InvalidArgument("No API keys configured".into()))?;

        let response = self
            .transport
            .get(url, &[(config::API_KEY_HEADER, key)])
            .await?;
        if !response.is_success() {
            return Err(error_from_response(&response));
        }
        response.json()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        if !self.has_keys() {
            return Err(AuctionError::InvalidArgument(
                "No API keys configured".into(),
            ));
        }
        retry(&self.retry_policy, &self.quota, |_| self.request_once::<T>(url)).await
    }

    /// Active listings for an exact item name.
    ///
    /// Responses are cached for five minutes keyed by request URL. Cache
    /// read or write problems are logged and otherwise ignored.
    pub async fn get_auction_list(&self, item_name: &str) -> Result<AuctionListResponse> {
        let url = self.endpoint("list", &[("item_name", item_name)])?;

        match self.cache.get(&url).await {
            Ok(Some(entry)) if entry.is_fresh(self.listing_ttl, Utc::now()) => {
                if let CachePayload::Body(bytes) = &entry.payload {
                    match serde_json::from_slice::<AuctionListResponse>(bytes) {
                        Ok(cached) => {
                            debug!(item = item_name, "Auction list cache hit");
                            return Ok(cached);
                        }
                        Err(e) => warn!(item = item_name, error = %e, "Unreadable cached auction list"),
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!(item = item_name, error = %e, "Cache read error"),
        }

        let response: AuctionListResponse = self.get_json(&url).await?;

        match serde_json::to_vec(&response) {
            Ok(bytes) => {
                if let Err(e) = self.cache.put(&url, CacheEntry::body(bytes)).await {
                    warn!(item = item_name, error = %e, "Cache write error");
                }
            }
            Err(e) => warn!(item = item_name, error = %e, "Cache write error"),
        }

        Ok(response)
    }

    /// Keyword search across item names. Not cached.
    pub async fn search_auction_items(
        &self,
        keyword: &str,
        cursor: Option<&str>,
    ) -> Result<AuctionListResponse> {
        let mut params = vec![("keyword", keyword)];
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            params.push(("cursor", cursor));
        }
        let url = self.endpoint("keyword-search", &params)?;
        self.get_json(&url).await
    }

    /// One page of recently executed trades.
    pub async fn get_auction_history(&self, cursor: Option<&str>) -> Result<AuctionHistoryResponse> {
        let params: Vec<(&str, &str)> = cursor
            .filter(|c| !c.is_empty())
            .map(|c| vec![("cursor", c)])
            .unwrap_or_default();
        let url = self.endpoint("history", &params)?;
        self.get_json(&url).await
    }

    /// Follow `next_cursor` for up to `max_pages` additional pages.
    ///
    /// Stops early on an empty page or a missing cursor.
    pub async fn get_all_recent_auction_history(&self, max_pages: usize) -> Result<Vec<HistoryRecord>> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages_fetched = 0;

        while pages_fetched < max_pages {
            let page = self.get_auction_history(cursor.as_deref()).await?;
            let empty = page.auction_history.is_empty();
            all.extend(page.auction_history);

            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) if !empty => cursor = Some(next),
                _ => break,
            }
            pages_fetched += 1;
        }

        info!(pages_fetched, records = all.len(), "Fetched recent auction history");
        Ok(all)
    }

    /// [`get_all_recent_auction_history`](Self::get_all_recent_auction_history)
    /// capped at the default page count.
    pub async fn get_recent_auction_history(&self) -> Result<Vec<HistoryRecord>> {
        self.get_all_recent_auction_history(config::HISTORY_MAX_PAGES).await
    }
}

#[async_trait]
impl StatsSource for NexonClient {
    fn is_available(&self) -> bool {
        self.has_keys() && !self.is_quota_exhausted()
    }

    async fn fetch_stats(&self, item_name: &str) -> Result<StatisticsSummary> {
        let response = self.get_auction_list(item_name).await?;
        Ok(aggregate(&response.auction_item))
    }
}

//! Hourly trade-history snapshots.
//!
//! Executed trades are dumped to one gzip-compressed JSON array per hour,
//! named after the hour's start in KST, e.g.
//! `data/2026/01/2026-01-03T15-00-00+09-00.json.gz`. [`HistorySync`] finds
//! the partitions inside a look-back window, fetches them with bounded
//! concurrency through the cache, and merges them into one time-ordered
//! sequence. A partition that cannot be fetched or decoded contributes
//! nothing; `sync` itself never fails.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDateTime, TimeZone, Timelike, Utc};
use flate2::read::GzDecoder;
use futures::future::join_all;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CachePayload, CacheStore};
use crate::config;
use crate::error::{AuctionError, Result};
use crate::models::HistoryRecord;
use crate::transport::Transport;

const FILE_NAME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S+09-00";
const FILE_SUFFIX: &str = ".json.gz";

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// One hourly snapshot, identified by its start time in KST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    start: DateTime<FixedOffset>,
}

impl Partition {
    /// The partition containing `at`.
    pub fn containing(at: DateTime<Utc>) -> Self {
        let local = at.with_timezone(&config::kst());
        let start = local
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(local);
        Self { start }
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    /// The partition one hour earlier.
    pub fn previous(&self) -> Self {
        Self {
            start: self.start - chrono::Duration::hours(1),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", self.start.format(FILE_NAME_FORMAT), FILE_SUFFIX)
    }

    /// Repository path, `data/{yyyy}/{MM}/{file}`.
    pub fn path(&self) -> String {
        format!(
            "data/{}/{:02}/{}",
            self.start.year(),
            self.start.month(),
            self.file_name()
        )
    }

    /// Parse a snapshot file name back into its partition.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(FILE_SUFFIX)?;
        let naive = NaiveDateTime::parse_from_str(stem, FILE_NAME_FORMAT).ok()?;
        let start = config::kst().from_local_datetime(&naive).single()?;
        Some(Self { start })
    }
}

// ---------------------------------------------------------------------------
// SnapshotRepo
// ---------------------------------------------------------------------------

/// Location of the snapshot repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRepo {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub raw_base: String,
    pub listing_base: String,
}

impl Default for SnapshotRepo {
    fn default() -> Self {
        Self::new(config::SNAPSHOT_OWNER, config::SNAPSHOT_REPO, config::SNAPSHOT_BRANCH)
    }
}

impl SnapshotRepo {
    pub fn new(owner: &str, repo: &str, branch: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            raw_base: config::SNAPSHOT_RAW_BASE.to_string(),
            listing_base: config::SNAPSHOT_LISTING_BASE.to_string(),
        }
    }

    pub fn partition_url(&self, partition: &Partition) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base,
            self.owner,
            self.repo,
            self.branch,
            partition.path()
        )
    }

    /// Contents-API URL listing one month directory.
    pub fn listing_url(&self, year: i32, month: u32) -> String {
        format!(
            "{}/{}/{}/contents/data/{}/{:02}?ref={}",
            self.listing_base, self.owner, self.repo, year, month, self.branch
        )
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Chooses which partitions a sync should fetch.
#[async_trait]
pub trait PartitionDiscovery: Send + Sync {
    /// Partitions starting strictly after `now - lookback`.
    async fn partitions(&self, now: DateTime<Utc>, lookback: Duration) -> Vec<Partition>;
}

fn cutoff(now: DateTime<Utc>, lookback: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lookback)
        .ok()
        .and_then(|lb| now.checked_sub_signed(lb))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Every hour from the current one back to the cutoff, whether or not it
/// has been published yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLookback;

#[async_trait]
impl PartitionDiscovery for FixedLookback {
    async fn partitions(&self, now: DateTime<Utc>, lookback: Duration) -> Vec<Partition> {
        let cutoff = cutoff(now, lookback);
        let mut out = Vec::new();
        let mut current = Partition::containing(now);
        while current.start_utc() > cutoff {
            out.push(current);
            current = current.previous();
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
}

/// Lists the current and previous KST month directories and keeps the
/// published files inside the window.
pub struct DirectoryListing {
    transport: Arc<dyn Transport>,
    repo: SnapshotRepo,
}

impl DirectoryListing {
    pub fn new(transport: Arc<dyn Transport>, repo: SnapshotRepo) -> Self {
        Self { transport, repo }
    }

    async fn list_month(&self, year: i32, month: u32) -> Result<Vec<Partition>> {
        let url = self.repo.listing_url(year, month);
        let response = self
            .transport
            .get(&url, &[("Accept", "application/vnd.github+json")])
            .await?;
        if !response.is_success() {
            return Err(AuctionError::Status {
                status: response.status,
                message: format!("listing {url}"),
            });
        }
        let entries: Vec<ListingEntry> = response.json()?;
        Ok(entries
            .iter()
            .filter_map(|e| Partition::from_file_name(&e.name))
            .collect())
    }
}

#[async_trait]
impl PartitionDiscovery for DirectoryListing {
    async fn partitions(&self, now: DateTime<Utc>, lookback: Duration) -> Vec<Partition> {
        let cutoff = cutoff(now, lookback);
        let local = now.with_timezone(&config::kst());
        let this_month = (local.year(), local.month());
        let last_month = local
            .checked_sub_months(Months::new(1))
            .map(|t| (t.year(), t.month()))
            .unwrap_or(this_month);

        let mut out = Vec::new();
        for (year, month) in [this_month, last_month] {
            match self.list_month(year, month).await {
                Ok(partitions) => out.extend(partitions.into_iter().filter(|p| p.start_utc() > cutoff)),
                Err(e) => warn!(year, month, error = %e, "Failed to list snapshot directory"),
            }
        }
        out.sort_unstable_by(|a, b| b.cmp(a));
        out.dedup();
        out
    }
}

// ---------------------------------------------------------------------------
// HistorySync
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct HistorySyncConfig {
    pub lookback: Duration,
    /// Maximum partition fetches in flight.
    pub permits: usize,
    pub success_ttl: Duration,
    pub failure_ttl: Duration,
    /// Serve from cache only; never touch the network.
    pub offline: bool,
}

impl Default for HistorySyncConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::from_secs(config::HISTORY_LOOKBACK_DAYS as u64 * 24 * 60 * 60),
            permits: config::HISTORY_FETCH_PERMITS,
            success_ttl: config::PARTITION_SUCCESS_TTL,
            failure_ttl: config::PARTITION_FAILURE_TTL,
            offline: false,
        }
    }
}

pub struct HistorySync {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
    discovery: Arc<dyn PartitionDiscovery>,
    repo: SnapshotRepo,
    config: HistorySyncConfig,
    semaphore: Semaphore,
}

impl HistorySync {
    /// Sync engine using [`FixedLookback`] discovery against the default repository.
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn CacheStore>) -> Self {
        let config = HistorySyncConfig::default();
        Self {
            transport,
            cache,
            discovery: Arc::new(FixedLookback),
            repo: SnapshotRepo::default(),
            semaphore: Semaphore::new(config.permits.max(1)),
            config,
        }
    }

    pub fn with_config(mut self, config: HistorySyncConfig) -> Self {
        self.semaphore = Semaphore::new(config.permits.max(1));
        self.config = config;
        self
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn PartitionDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_repo(mut self, repo: SnapshotRepo) -> Self {
        self.repo = repo;
        self
    }

    pub fn config(&self) -> &HistorySyncConfig {
        &self.config
    }

    pub fn repo(&self) -> &SnapshotRepo {
        &self.repo
    }

    /// Fetch and merge every partition in the look-back window ending now.
    pub async fn sync(&self) -> Vec<HistoryRecord> {
        self.sync_at(Utc::now()).await
    }

    /// Fetch and merge every partition in the look-back window ending at `now`.
    ///
    /// Records come back sorted ascending by trade time.
    pub async fn sync_at(&self, now: DateTime<Utc>) -> Vec<HistoryRecord> {
        let partitions = self.discovery.partitions(now, self.config.lookback).await;
        let fetches = partitions.iter().map(|p| self.fetch_guarded(p, now));
        let results = join_all(fetches).await;

        let mut records: Vec<HistoryRecord> = results.into_iter().flatten().collect();
        records.sort_by_key(|r| r.date_auction_buy);

        info!(partitions = partitions.len(), records = records.len(), "History sync complete");
        records
    }

    async fn fetch_guarded(&self, partition: &Partition, now: DateTime<Utc>) -> Vec<HistoryRecord> {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return Vec::new();
        };
        match self.load_partition_at(partition, now).await {
            Ok(records) => records,
            Err(e) => {
                warn!(partition = %partition.start(), error = %e, "Failed to load history partition");
                Vec::new()
            }
        }
    }

    /// Load one partition through the cache.
    pub async fn load_partition(&self, partition: &Partition) -> Result<Vec<HistoryRecord>> {
        self.load_partition_at(partition, Utc::now()).await
    }

    /// Load one partition, judging and stamping cache entries as of `now`.
    pub async fn load_partition_at(&self, partition: &Partition, now: DateTime<Utc>) -> Result<Vec<HistoryRecord>> {
        let url = self.repo.partition_url(partition);

        let cached = match self.cache.get(&url).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(url = %url, error = %e, "Cache read error");
                None
            }
        };

        if let Some(entry) = cached {
            let ttl = if entry.is_failure() {
                self.config.failure_ttl
            } else {
                self.config.success_ttl
            };
            if entry.is_fresh(ttl, now) {
                match entry.payload {
                    CachePayload::Failure(message) => {
                        debug!(url = %url, "Negative cache hit");
                        return Err(AuctionError::NotFound(format!("{url} (cached: {message})")));
                    }
                    CachePayload::Body(bytes) => match decode_partition(&bytes) {
                        Ok(records) => {
                            debug!(url = %url, records = records.len(), "Partition cache hit");
                            return Ok(records);
                        }
                        Err(e) => {
                            warn!(url = %url, error = %e, "Corrupt cached partition -- removing");
                            if let Err(e) = self.cache.remove(&url).await {
                                warn!(url = %url, error = %e, "Cache remove error");
                            }
                        }
                    },
                }
            }
        }

        if self.config.offline {
            return Err(AuctionError::NotFound(format!(
                "{url} not cached and offline mode is enabled"
            )));
        }

        debug!(url = %url, "Fetching history partition");
        let response = self.transport.get(&url, &[]).await?;

        if !response.is_success() {
            let message = format!("HTTP {}", response.status);
            self.store(&url, CacheEntry::failure(message.clone()).stored_at(now)).await;
            return Err(AuctionError::Status {
                status: response.status,
                message,
            });
        }

        let records = decode_partition(&response.body)?;
        self.store(&url, CacheEntry::body(response.body).stored_at(now)).await;
        Ok(records)
    }

    async fn store(&self, url: &str, entry: CacheEntry) {
        if let Err(e) = self.cache.put(url, entry).await {
            warn!(url = %url, error = %e, "Cache write error");
        }
    }
}

/// Gunzip a partition body and parse the JSON array inside.
pub fn decode_partition(bytes: &[u8]) -> Result<Vec<HistoryRecord>> {
    let mut json = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|e| AuctionError::Decode(format!("gzip: {e}")))?;
    serde_json::from_slice(&json).map_err(|e| AuctionError::Decode(format!("json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_path_uses_kst_wall_clock() {
        // 2026-01-03 15:40 UTC is 2026-01-04 00:40 KST
        let at = Utc.with_ymd_and_hms(2026, 1, 3, 15, 40, 55).unwrap();
        let p = Partition::containing(at);
        assert_eq!(p.path(), "data/2026/01/2026-01-04T00-00-00+09-00.json.gz");
        assert_eq!(p.start_utc(), Utc.with_ymd_and_hms(2026, 1, 3, 15, 0, 0).unwrap());
    }

    #[test]
    fn file_name_round_trips_through_parser() {
        let p = Partition::containing(Utc.with_ymd_and_hms(2026, 2, 28, 23, 5, 0).unwrap());
        assert_eq!(Partition::from_file_name(&p.file_name()), Some(p));
        assert_eq!(Partition::from_file_name("README.md"), None);
    }

    #[tokio::test]
    async fn fixed_lookback_covers_eight_days_of_hours() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 30, 0).unwrap();
        let parts = FixedLookback
            .partitions(now, HistorySyncConfig::default().lookback)
            .await;
        assert_eq!(parts.len(), 8 * 24);
        assert_eq!(parts[0], Partition::containing(now));
        assert!(parts.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn fixed_lookback_excludes_the_cutoff_hour() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        let parts = FixedLookback.partitions(now, Duration::from_secs(2 * 3600)).await;
        // 12:00 and 11:00 are after the 10:00 cutoff; 10:00 itself is not.
        assert_eq!(parts.len(), 2);
    }
}

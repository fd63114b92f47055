//! Mabinogi auction price-watch SDK for Rust.
//!
//! Fetches live auction listings from the Nexon Open API, summarizes them
//! into price statistics, and evaluates user-defined alert thresholds that
//! may reference other items' prices (`@"Item Name" * 0.9`). Executed-trade
//! history is synced from hourly snapshot archives and cached locally.
//!
//! # Quick start
//!
//! ```no_run
//! use mabi_auction_sdk::{AuctionSdk, PriceExpression};
//!
//! # async fn run() -> mabi_auction_sdk::Result<()> {
//! let sdk = AuctionSdk::builder().api_keys_from_env().build()?;
//!
//! // Statistics for one item
//! let own = sdk.item_stats("Fine Leather").await?;
//!
//! // A threshold relative to another item
//! let expr = PriceExpression::new(r#"@"Iron Ore" * 3 + minPrice * 0.1"#);
//! let values = sdk.alerts().evaluate(&expr, &own).await;
//!
//! // Eight days of trade history, oldest first
//! let trades = sdk.history().sync().await;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod alert;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod expr;
pub mod history;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod retry;
pub mod transport;
pub mod trends;

pub use aggregate::aggregate;
pub use alert::{AlertEngine, AlertThreshold, ItemAlerts, PriceAlert, ThresholdResult, ThresholdValues};
pub use cache::{CacheEntry, CacheStore, DiskCache, MemoryCache};
pub use catalog::{CatalogSource, ItemCatalog};
pub use client::NexonClient;
pub use error::{AuctionError, Result};
pub use expr::{compile, CompiledExpression, EvaluationError, ParseError, PriceExpression};
pub use history::{HistorySync, HistorySyncConfig, Partition, SnapshotRepo};
pub use models::{AuctionListing, HistoryRecord, ItemSettings, StatKind, StatisticsSummary};
pub use resolver::{ItemReferenceResolver, StatsSource};
pub use transport::{ReqwestTransport, Transport};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use catalog::HistoryCatalog;
use history::{DirectoryListing, PartitionDiscovery};

// ---------------------------------------------------------------------------
// AuctionSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AuctionSdk`] instance.
///
/// Use [`AuctionSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](AuctionSdkBuilder::build) to create the SDK.
pub struct AuctionSdkBuilder {
    api_keys: Vec<String>,
    cache_dir: Option<PathBuf>,
    in_memory_cache: bool,
    offline: bool,
    timeout: Duration,
    history_repo: SnapshotRepo,
    history_config: HistorySyncConfig,
    list_partitions: bool,
    transport: Option<Arc<dyn Transport>>,
    catalog_source: Option<Arc<dyn CatalogSource>>,
}

impl Default for AuctionSdkBuilder {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            cache_dir: None,
            in_memory_cache: false,
            offline: false,
            timeout: Duration::from_secs(30),
            history_repo: SnapshotRepo::default(),
            history_config: HistorySyncConfig::default(),
            list_partitions: false,
            transport: None,
            catalog_source: None,
        }
    }
}

impl AuctionSdkBuilder {
    /// Add Nexon Open API keys. Requests rotate through them round-robin.
    pub fn api_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Add the comma-separated keys in `NEXON_API_KEYS`, if set.
    pub fn api_keys_from_env(mut self) -> Self {
        if let Ok(raw) = std::env::var(config::API_KEYS_ENV) {
            self.api_keys.extend(client::parse_api_keys(&raw));
        }
        self
    }

    /// Set a custom cache directory.
    ///
    /// If not set, the platform-appropriate default cache directory is used
    /// (e.g. `~/.cache/mabi-auction-sdk` on Linux).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep cached data in memory only. Nothing is written to disk.
    pub fn in_memory_cache(mut self, enabled: bool) -> Self {
        self.in_memory_cache = enabled;
        self
    }

    /// Enable or disable offline mode.
    ///
    /// When offline, history sync only uses previously cached partitions.
    /// Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the HTTP request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sync history from a different snapshot repository.
    pub fn history_repo(mut self, repo: SnapshotRepo) -> Self {
        self.history_repo = repo;
        self
    }

    /// Look-back window, concurrency and TTLs for history sync.
    pub fn history_config(mut self, config: HistorySyncConfig) -> Self {
        self.history_config = config;
        self
    }

    /// Discover history partitions by listing the snapshot repository
    /// instead of probing every hour in the window.
    pub fn list_partitions(mut self, enabled: bool) -> Self {
        self.list_partitions = enabled;
        self
    }

    /// Use a custom HTTP transport instead of `reqwest`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Where item names for autocompletion come from. Defaults to the names
    /// seen in synced history.
    pub fn catalog_source(mut self, source: Arc<dyn CatalogSource>) -> Self {
        self.catalog_source = Some(source);
        self
    }

    /// Build the SDK, opening the cache and HTTP client.
    ///
    /// No network request is made until a query method is called.
    pub fn build(self) -> Result<AuctionSdk> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };

        let (cache, cache_dir): (Arc<dyn CacheStore>, Option<PathBuf>) = if self.in_memory_cache {
            (Arc::new(MemoryCache::new()) as Arc<dyn CacheStore>, None)
        } else {
            let disk = DiskCache::new(self.cache_dir)?;
            let dir = disk.cache_dir.clone();
            (Arc::new(disk) as Arc<dyn CacheStore>, Some(dir))
        };

        let client = Arc::new(NexonClient::new(
            &self.api_keys,
            Arc::clone(&transport),
            Arc::clone(&cache),
        ));

        let history_config = HistorySyncConfig {
            offline: self.offline || self.history_config.offline,
            ..self.history_config
        };
        let mut sync = HistorySync::new(Arc::clone(&transport), Arc::clone(&cache))
            .with_repo(self.history_repo.clone())
            .with_config(history_config);
        if self.list_partitions {
            let discovery: Arc<dyn PartitionDiscovery> =
                Arc::new(DirectoryListing::new(Arc::clone(&transport), self.history_repo));
            sync = sync.with_discovery(discovery);
        }
        let history = Arc::new(sync);

        let catalog_source = self
            .catalog_source
            .unwrap_or_else(|| Arc::new(HistoryCatalog::new(Arc::clone(&history))) as Arc<dyn CatalogSource>);

        Ok(AuctionSdk {
            alerts: AlertEngine::new(Arc::clone(&client) as Arc<dyn StatsSource>),
            catalog: ItemCatalog::new(catalog_source),
            client,
            history,
            cache,
            cache_dir,
            offline: history_config.offline,
        })
    }
}

// ---------------------------------------------------------------------------
// AuctionSdk
// ---------------------------------------------------------------------------

/// The main entry point for the auction SDK.
///
/// Owns the API client, the alert engine, the history sync engine and the
/// item catalog, all sharing one HTTP transport and one cache.
///
/// Created via [`AuctionSdk::builder()`].
pub struct AuctionSdk {
    client: Arc<NexonClient>,
    alerts: AlertEngine,
    history: Arc<HistorySync>,
    catalog: ItemCatalog,
    cache: Arc<dyn CacheStore>,
    cache_dir: Option<PathBuf>,
    offline: bool,
}

impl AuctionSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> AuctionSdkBuilder {
        AuctionSdkBuilder::default()
    }

    // -- Component accessors -----------------------------------------------

    /// The Nexon Open API client.
    pub fn client(&self) -> &NexonClient {
        &self.client
    }

    /// Threshold evaluation against live statistics.
    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    /// Reference resolution backed by the API client.
    pub fn resolver(&self) -> &ItemReferenceResolver {
        self.alerts.resolver()
    }

    /// Trade history sync from the snapshot archive.
    pub fn history(&self) -> &HistorySync {
        &self.history
    }

    /// Known item names for autocompletion.
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    // -- Convenience methods -----------------------------------------------

    /// Fetch current listings for `item_name` and summarize them.
    pub async fn item_stats(&self, item_name: &str) -> Result<StatisticsSummary> {
        self.client.fetch_stats(item_name).await
    }

    /// Evaluate both thresholds configured for an item against its own
    /// current statistics.
    pub async fn check_item(&self, settings: &ItemSettings) -> Result<(StatisticsSummary, ItemAlerts)> {
        let own = self.item_stats(&settings.name).await?;
        let alerts = self.alerts.evaluate_item(settings, &own).await;
        Ok((own, alerts))
    }

    /// Remove every cached response and partition.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await?;
        self.catalog.invalidate().await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for AuctionSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = match &self.cache_dir {
            Some(dir) => dir.display().to_string(),
            None => "memory".to_string(),
        };
        let repo = self.history.repo();
        write!(
            f,
            "AuctionSdk(cache={}, keys={}, history={}/{}@{}, offline={})",
            cache,
            self.client.key_count(),
            repo.owner,
            repo.repo,
            repo.branch,
            self.offline
        )
    }
}

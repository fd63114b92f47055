//! Known item names, for reference autocompletion.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config;
use crate::error::{AuctionError, Result};
use crate::history::HistorySync;
use crate::transport::Transport;

/// Where the list of item names comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load(&self) -> Result<Vec<String>>;
}

/// A fixed list supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    names: Vec<String>,
}

impl StaticCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn load(&self) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }
}

/// A JSON array of names served at a URL.
pub struct UrlCatalog {
    transport: Arc<dyn Transport>,
    url: String,
}

impl UrlCatalog {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for UrlCatalog {
    async fn load(&self) -> Result<Vec<String>> {
        let response = self.transport.get(&self.url, &[]).await?;
        if !response.is_success() {
            return Err(AuctionError::Status {
                status: response.status,
                message: format!("item catalog {}", self.url),
            });
        }
        response.json()
    }
}

/// Distinct names of everything traded in the synced history window, sorted.
pub struct HistoryCatalog {
    sync: Arc<HistorySync>,
}

impl HistoryCatalog {
    pub fn new(sync: Arc<HistorySync>) -> Self {
        Self { sync }
    }
}

#[async_trait]
impl CatalogSource for HistoryCatalog {
    async fn load(&self) -> Result<Vec<String>> {
        let names: BTreeSet<String> = self
            .sync
            .sync()
            .await
            .into_iter()
            .map(|r| r.item_name)
            .collect();
        Ok(names.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// ItemCatalog
// ---------------------------------------------------------------------------

struct Loaded {
    at: DateTime<Utc>,
    names: Arc<Vec<String>>,
}

/// Lazily loaded, time-limited cache over a [`CatalogSource`].
pub struct ItemCatalog {
    source: Arc<dyn CatalogSource>,
    ttl: Duration,
    loaded: Mutex<Option<Loaded>>,
}

impl ItemCatalog {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            ttl: config::CATALOG_TTL,
            loaded: Mutex::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The cached list, reloading it once it is older than the TTL.
    ///
    /// If a reload fails but an older list exists, the older list is
    /// returned.
    pub async fn get_or_load(&self) -> Result<Arc<Vec<String>>> {
        let mut loaded = self.loaded.lock().await;

        if let Some(l) = loaded.as_ref() {
            let age = Utc::now().signed_duration_since(l.at);
            if chrono::Duration::from_std(self.ttl).map_or(true, |ttl| age < ttl) {
                return Ok(Arc::clone(&l.names));
            }
        }

        match self.source.load().await {
            Ok(names) => {
                debug!(items = names.len(), "Loaded item catalog");
                let names = Arc::new(names);
                *loaded = Some(Loaded {
                    at: Utc::now(),
                    names: Arc::clone(&names),
                });
                Ok(names)
            }
            Err(e) => match loaded.as_ref() {
                Some(stale) => {
                    warn!(error = %e, "Item catalog reload failed, serving stale list");
                    Ok(Arc::clone(&stale.names))
                }
                None => Err(e),
            },
        }
    }

    /// Drop the cached list so the next lookup reloads it.
    pub async fn invalidate(&self) {
        *self.loaded.lock().await = None;
    }

    /// Up to `limit` names containing `term`, ignoring case, in catalog order.
    pub async fn search(&self, term: &str, limit: usize) -> Result<Vec<String>> {
        let names = self.get_or_load().await?;
        let needle = term.to_lowercase();
        Ok(names
            .iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    /// [`search`](Self::search) with the default suggestion count.
    pub async fn suggest(&self, term: &str) -> Result<Vec<String>> {
        self.search(term, config::CATALOG_SEARCH_LIMIT).await
    }

    /// Text to insert when `name` is picked. The name is JSON-quoted; `@` is
    /// prepended unless the cursor already follows one.
    pub fn completion(name: &str, has_at_prefix: bool) -> String {
        let quoted = serde_json::to_string(name).unwrap_or_else(|_| format!("\"{name}\""));
        if has_at_prefix {
            quoted
        } else {
            format!("@{quoted}")
        }
    }
}

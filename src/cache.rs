//! Key-value cache with per-entry timestamps.
//!
//! Entries record when they were stored; freshness is decided by the reader
//! with whatever TTL applies to that kind of data. A failed fetch can be
//! stored as a negative entry so callers can skip the network until it
//! expires.

use crate::config;
use crate::error::{AuctionError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePayload {
    Body(Vec<u8>),
    /// Negative entry: the fetch failed with this message.
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub stored_at: DateTime<Utc>,
    pub payload: CachePayload,
}

impl CacheEntry {
    pub fn body(bytes: Vec<u8>) -> Self {
        Self {
            stored_at: Utc::now(),
            payload: CachePayload::Body(bytes),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stored_at: Utc::now(),
            payload: CachePayload::Failure(message.into()),
        }
    }

    /// Override the storage timestamp.
    pub fn stored_at(mut self, at: DateTime<Utc>) -> Self {
        self.stored_at = at;
        self
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.payload, CachePayload::Failure(_))
    }

    /// Whether the entry is younger than `ttl` at `now`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.stored_at) < ttl,
            Err(_) => true,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

/// Storage backend for cached remote data.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;
    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Process-lifetime cache held in a hash map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DiskCache
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct DiskMeta {
    key: String,
    stored_at: DateTime<Utc>,
    #[serde(default)]
    failure: Option<String>,
}

/// Cache persisted under a directory, one `.bin` body and one `.meta.json`
/// sidecar per key.
///
/// Files are written to a temp path and renamed, so an interrupted write
/// never leaves a half-written entry behind.
#[derive(Debug, Clone)]
pub struct DiskCache {
    /// Directory where cached files are stored.
    pub cache_dir: PathBuf,
}

impl DiskCache {
    /// Open a disk cache, creating the directory if it does not exist.
    ///
    /// If `cache_dir` is `None`, uses the platform-appropriate default cache directory.
    pub fn new(cache_dir: Option<PathBuf>) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(config::default_cache_dir);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { cache_dir: dir })
    }

    fn paths(&self, key: &str) -> (PathBuf, PathBuf) {
        let stem = file_stem(key);
        (
            self.cache_dir.join(format!("{stem}.meta.json")),
            self.cache_dir.join(format!("{stem}.bin")),
        )
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let (meta_path, body_path) = self.paths(key);

        let raw = match tokio::fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let meta: DiskMeta = match serde_json::from_slice(&raw) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %meta_path.display(), error = %e, "Corrupt cache metadata -- removing");
                self.remove(key).await?;
                return Ok(None);
            }
        };
        if meta.key != key {
            return Ok(None);
        }

        let payload = match meta.failure {
            Some(message) => CachePayload::Failure(message),
            None => match tokio::fs::read(&body_path).await {
                Ok(bytes) => CachePayload::Body(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(path = %body_path.display(), "Cache body missing -- removing entry");
                    self.remove(key).await?;
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            },
        };

        Ok(Some(CacheEntry {
            stored_at: meta.stored_at,
            payload,
        }))
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let (meta_path, body_path) = self.paths(key);

        let failure = match &entry.payload {
            CachePayload::Body(bytes) => {
                write_atomic(&body_path, bytes).await?;
                None
            }
            CachePayload::Failure(message) => {
                remove_if_exists(&body_path).await?;
                Some(message.clone())
            }
        };

        let meta = DiskMeta {
            key: key.to_string(),
            stored_at: entry.stored_at,
            failure,
        };
        write_atomic(&meta_path, &serde_json::to_vec(&meta)?).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let (meta_path, body_path) = self.paths(key);
        remove_if_exists(&meta_path).await?;
        remove_if_exists(&body_path).await
    }

    /// Remove all cached files and recreate the cache directory.
    async fn clear(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.cache_dir).await? {
            tokio::fs::remove_dir_all(&self.cache_dir).await?;
        }
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        Ok(())
    }
}

async fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = dest.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = async {
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, dest).await?;
        Ok::<(), AuctionError>(())
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Filesystem-safe name for a cache key: a readable prefix plus a stable
/// 64-bit FNV-1a hash of the full key.
fn file_stem(key: &str) -> String {
    let readable: String = key
        .chars()
        .rev()
        .take(60)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();

    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }

    format!("{readable}-{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_is_stable_and_distinguishes_similar_keys() {
        let a = file_stem("https://host/data/2026/01/a.json.gz");
        let b = file_stem("https://host/data/2026/01/a_json.gz");
        assert_eq!(a, file_stem("https://host/data/2026/01/a.json.gz"));
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn freshness_respects_ttl() {
        let now = Utc::now();
        let entry = CacheEntry::failure("404").stored_at(now - chrono::Duration::minutes(30));
        assert!(entry.is_fresh(Duration::from_secs(3600), now));
        assert!(!entry.is_fresh(Duration::from_secs(600), now));
    }
}

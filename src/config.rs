use chrono::FixedOffset;
use std::path::PathBuf;
use std::time::Duration;

pub const NEXON_API_BASE: &str = "https://open.api.nexon.com/mabinogi/v1/auction";
pub const API_KEY_HEADER: &str = "x-nxopen-api-key";
pub const API_KEYS_ENV: &str = "NEXON_API_KEYS";

/// Upstream error name signalling that the key pool has run out of quota.
pub const QUOTA_EXHAUSTED_CODE: &str = "OPENAPI00005";

pub const SNAPSHOT_RAW_BASE: &str = "https://raw.githubusercontent.com";
pub const SNAPSHOT_LISTING_BASE: &str = "https://api.github.com/repos";
pub const SNAPSHOT_OWNER: &str = "anch0vy";
pub const SNAPSHOT_REPO: &str = "mabi_auctuion_dump_data";
pub const SNAPSHOT_BRANCH: &str = "main";

pub const HISTORY_LOOKBACK_DAYS: i64 = 8;
pub const HISTORY_FETCH_PERMITS: usize = 5;
pub const PARTITION_SUCCESS_TTL: Duration = Duration::from_secs(8 * 24 * 60 * 60);
pub const PARTITION_FAILURE_TTL: Duration = Duration::from_secs(60 * 60);

pub const LISTING_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const CATALOG_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const CATALOG_SEARCH_LIMIT: usize = 10;

pub const REQUEST_DELAY: Duration = Duration::from_millis(500);
pub const RETRY_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const HISTORY_MAX_PAGES: usize = 50;

/// Volume cutoffs for the cheapest-N averages, in summary field order.
pub const AVERAGE_CUTOFFS: [u64; 4] = [25, 50, 100, 200];

const KST_OFFSET_SECS: i32 = 9 * 60 * 60;

/// Korea Standard Time. Fixed +09:00, no daylight saving.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("+09:00 is a valid offset")
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("mabi-auction-sdk")
    } else {
        PathBuf::from(".mabi-auction-sdk-cache")
    }
}

//! Offline cache: namespaced, versioned, expiring JSON entries on top of a
//! pluggable [`Storage`]. Consumers get a [`CacheService`] injected; there is
//! no process-wide instance.

pub mod clock;
pub mod storage;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{FileStorage, MemoryStorage, Storage};

pub const CACHE_PREFIX: &str = "torneo-cache";
pub const CACHE_VERSION: &str = "v1";

/// Cache key of the standings offline fallback.
pub const STANDINGS_KEY: &str = "standings";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache entry could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Cache storage lock poisoned")]
    Poisoned,
}

/// Persisted envelope. Times are milliseconds since the Unix epoch.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry<T> {
    data: T,
    timestamp: i64,
    expires_at: i64,
}

#[derive(Clone)]
pub struct CacheService {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl CacheService {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// File-backed cache on the system clock.
    pub fn open(directory: impl AsRef<std::path::Path>) -> Result<Self, CacheError> {
        let storage = FileStorage::open(directory)?;
        Ok(Self::new(Arc::new(storage), Arc::new(SystemClock)))
    }

    pub fn storage_key(key: &str) -> String {
        format!("{}-{}-{}", CACHE_PREFIX, CACHE_VERSION, key)
    }

    /// Store `data` under `key` for `ttl_seconds`. Failures are logged, not raised.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl_seconds: u64) {
        let now = self.clock.now().timestamp_millis();
        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .and_then(|ttl_ms| now.checked_add(ttl_ms))
            .unwrap_or(i64::MAX);
        let entry = CacheEntry {
            data,
            timestamp: now,
            expires_at,
        };

        let result = serde_json::to_string(&entry)
            .map_err(CacheError::from)
            .and_then(|json| self.storage.set(&Self::storage_key(key), &json));

        if let Err(e) = result {
            tracing::error!("Error setting cache entry {}: {}", key, e);
        }
    }

    /// Fetch the entry under `key`. Missing, expired and undecodable entries
    /// all read as `None`; the latter two are evicted.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = Self::storage_key(key);
        let raw = match self.storage.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!("Error reading cache entry {}: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                self.evict(&storage_key);
                return None;
            }
        };

        if self.clock.now().timestamp_millis() > entry.expires_at {
            tracing::debug!("Cache entry {} expired", key);
            self.evict(&storage_key);
            return None;
        }

        Some(entry.data)
    }

    pub fn clear(&self, key: &str) {
        self.evict(&Self::storage_key(key));
    }

    /// Remove every entry under the cache prefix, whatever its version.
    pub fn clear_all(&self) {
        match self.storage.keys() {
            Ok(keys) => {
                for key in keys.iter().filter(|k| k.starts_with(CACHE_PREFIX)) {
                    self.evict(key);
                }
            }
            Err(e) => tracing::error!("Error listing cache entries: {}", e),
        }
    }

    fn evict(&self, storage_key: &str) {
        if let Err(e) = self.storage.remove(storage_key) {
            tracing::error!("Error removing cache entry {}: {}", storage_key, e);
        }
    }
}

use serde::Deserialize;
use std::path::PathBuf;

/// Default lifetime of an offline cache entry (24 hours).
pub const DEFAULT_TTL_SECONDS: u64 = 60 * 60 * 24;

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    pub directory: PathBuf,
    #[serde(default = "default_ttl")]
    pub standings_ttl_seconds: u64,
    /// Drop every cached entry at boot, e.g. after a schema change.
    #[serde(default)]
    pub clear_on_start: bool,
}

fn default_ttl() -> u64 {
    DEFAULT_TTL_SECONDS
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveSettings {
    pub network_check_interval_seconds: u64,
    pub change_feed_capacity: usize,
}

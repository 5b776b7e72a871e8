use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{CacheService, STANDINGS_KEY};
use crate::config::cache::DEFAULT_TTL_SECONDS;
use crate::db::view_queries::{FetchError, ViewSource};
use crate::league::ranking::rank_scorers;
use crate::models::matches::{MatchDetail, MatchStatus, MatchWithTeams};
use crate::models::scorer::RankedScorer;
use crate::models::standing::StandingRow;
use crate::services::network_status::NetworkStatus;

/// Size of the top scorers leaderboard.
pub const TOP_SCORERS_LIMIT: i64 = 20;

/// Reads the derived views and shapes them for presentation. Safe to call
/// any number of times: initial load, manual refresh and change-triggered
/// refresh all go through here.
pub struct ViewFetcher<S> {
    source: Arc<S>,
    cache: Option<CacheService>,
    network: NetworkStatus,
    standings_ttl_seconds: u64,
}

impl<S> Clone for ViewFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            cache: self.cache.clone(),
            network: self.network.clone(),
            standings_ttl_seconds: self.standings_ttl_seconds,
        }
    }
}

impl<S: ViewSource> ViewFetcher<S> {
    pub fn new(source: S, network: NetworkStatus) -> Self {
        Self {
            source: Arc::new(source),
            cache: None,
            network,
            standings_ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }

    /// Enable the standings offline fallback.
    pub fn with_cache(mut self, cache: CacheService, standings_ttl_seconds: u64) -> Self {
        self.cache = Some(cache);
        self.standings_ttl_seconds = standings_ttl_seconds;
        self
    }

    pub fn network(&self) -> &NetworkStatus {
        &self.network
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    #[tracing::instrument(name = "Fetch top scorers", skip(self))]
    pub async fn fetch_top_scorers(&self, limit: i64) -> Result<Vec<RankedScorer>, FetchError> {
        let scorers = self.source.top_scorers(limit).await?;
        Ok(rank_scorers(scorers))
    }

    /// Standings, cached on success. When the query fails while the backend is
    /// known to be unreachable, a still valid cached copy is returned instead
    /// of the error. An empty table drops the cached copy, so a reset league
    /// never falls back to last season's table.
    #[tracing::instrument(name = "Fetch standings", skip(self))]
    pub async fn fetch_standings(&self) -> Result<Vec<StandingRow>, FetchError> {
        match self.source.standings().await {
            Ok(standings) => {
                if let Some(cache) = &self.cache {
                    if standings.is_empty() {
                        cache.clear(STANDINGS_KEY);
                    } else {
                        cache.set(STANDINGS_KEY, &standings, self.standings_ttl_seconds);
                    }
                }
                Ok(standings)
            }
            Err(e) => {
                if !self.network.is_online() {
                    if let Some(cached) = self.cached_standings() {
                        tracing::warn!(
                            "Standings fetch failed while offline, serving {} cached rows: {}",
                            cached.len(),
                            e
                        );
                        return Ok(cached);
                    }
                }
                Err(e)
            }
        }
    }

    /// Last cached standings, if still valid. Used to render something while a
    /// fresh fetch is in flight.
    pub fn cached_standings(&self) -> Option<Vec<StandingRow>> {
        self.cache.as_ref()?.get(STANDINGS_KEY)
    }

    #[tracing::instrument(name = "Fetch matches", skip(self))]
    pub async fn fetch_matches(&self, status: Option<MatchStatus>) -> Result<Vec<MatchWithTeams>, FetchError> {
        self.source.matches(status).await
    }

    /// A match and its timeline, `None` when no such match exists.
    #[tracing::instrument(name = "Fetch match detail", skip(self))]
    pub async fn fetch_match_detail(&self, match_id: Uuid) -> Result<Option<MatchDetail>, FetchError> {
        let Some(match_info) = self.source.match_by_id(match_id).await? else {
            return Ok(None);
        };
        let events = self.source.match_events(match_id).await?;
        Ok(Some(MatchDetail { match_info, events }))
    }
}

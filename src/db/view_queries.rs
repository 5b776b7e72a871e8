use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::future::Future;
use uuid::Uuid;

use crate::models::matches::{
    MatchEventKind, MatchEventWithPlayer, MatchStatus, MatchWithTeams, TeamSummary,
};
use crate::models::scorer::ScorerRecord;
use crate::models::standing::StandingRow;

/// A read against the backend failed. Distinct from an empty (successful) result.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Backend query failed: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("Malformed row in {view}: {reason}")]
    Decode { view: &'static str, reason: String },
}

/// Read-only access to the backend-computed aggregates and the match tables.
/// Every method issues a single query and sorts server-side.
pub trait ViewSource: Send + Sync + 'static {
    fn standings(&self) -> impl Future<Output = Result<Vec<StandingRow>, FetchError>> + Send;

    fn top_scorers(&self, limit: i64) -> impl Future<Output = Result<Vec<ScorerRecord>, FetchError>> + Send;

    fn matches(
        &self,
        status: Option<MatchStatus>,
    ) -> impl Future<Output = Result<Vec<MatchWithTeams>, FetchError>> + Send;

    fn match_by_id(&self, match_id: Uuid) -> impl Future<Output = Result<Option<MatchWithTeams>, FetchError>> + Send;

    fn match_events(
        &self,
        match_id: Uuid,
    ) -> impl Future<Output = Result<Vec<MatchEventWithPlayer>, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct PgViewSource {
    pool: PgPool,
}

impl PgViewSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MATCH_COLUMNS: &str = r#"
    SELECT
        m.id,
        m.home_team_id,
        m.away_team_id,
        m.home_score::int4 AS home_score,
        m.away_score::int4 AS away_score,
        m.match_date,
        m.status::text AS status,
        m.venue,
        ht.name AS home_team_name,
        ht.logo_url AS home_team_logo_url,
        at.name AS away_team_name,
        at.logo_url AS away_team_logo_url
    FROM matches m
    JOIN teams ht ON ht.id = m.home_team_id
    JOIN teams at ON at.id = m.away_team_id
"#;

#[derive(Debug, FromRow)]
struct MatchRow {
    id: Uuid,
    home_team_id: Uuid,
    away_team_id: Uuid,
    home_score: Option<i32>,
    away_score: Option<i32>,
    match_date: DateTime<Utc>,
    status: String,
    venue: Option<String>,
    home_team_name: String,
    home_team_logo_url: Option<String>,
    away_team_name: String,
    away_team_logo_url: Option<String>,
}

impl TryFrom<MatchRow> for MatchWithTeams {
    type Error = FetchError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<MatchStatus>()
            .map_err(|reason| FetchError::Decode { view: "matches", reason })?;

        Ok(MatchWithTeams {
            id: row.id,
            home_team_id: row.home_team_id,
            away_team_id: row.away_team_id,
            home_score: row.home_score,
            away_score: row.away_score,
            match_date: row.match_date,
            status,
            venue: row.venue,
            home_team: TeamSummary {
                id: row.home_team_id,
                name: row.home_team_name,
                logo_url: row.home_team_logo_url,
            },
            away_team: TeamSummary {
                id: row.away_team_id,
                name: row.away_team_name,
                logo_url: row.away_team_logo_url,
            },
        })
    }
}

#[derive(Debug, FromRow)]
struct MatchEventRow {
    id: Uuid,
    match_id: Uuid,
    team_id: Uuid,
    player_id: Uuid,
    player_name: String,
    jersey_number: Option<i32>,
    event_type: String,
    minute: Option<i32>,
}

impl TryFrom<MatchEventRow> for MatchEventWithPlayer {
    type Error = FetchError;

    fn try_from(row: MatchEventRow) -> Result<Self, Self::Error> {
        let event_type = row
            .event_type
            .parse::<MatchEventKind>()
            .map_err(|reason| FetchError::Decode { view: "match_events", reason })?;

        Ok(MatchEventWithPlayer {
            id: row.id,
            match_id: row.match_id,
            team_id: row.team_id,
            player_id: row.player_id,
            player_name: row.player_name,
            jersey_number: row.jersey_number,
            event_type,
            minute: row.minute,
        })
    }
}

impl ViewSource for PgViewSource {
    #[tracing::instrument(name = "Query standings view", skip(self))]
    async fn standings(&self) -> Result<Vec<StandingRow>, FetchError> {
        let rows = sqlx::query_as::<_, StandingRow>(
            r#"
            SELECT
                team_id,
                team_name,
                logo_url,
                position::int8 AS position,
                COALESCE(points, 0)::int8 AS points,
                COALESCE(matches_played, 0)::int8 AS matches_played,
                COALESCE(wins, 0)::int8 AS wins,
                COALESCE(draws, 0)::int8 AS draws,
                COALESCE(losses, 0)::int8 AS losses,
                COALESCE(goals_for, 0)::int8 AS goals_for,
                COALESCE(goals_against, 0)::int8 AS goals_against,
                COALESCE(goal_difference, 0)::int8 AS goal_difference,
                COALESCE(yellow_cards, 0)::int8 AS yellow_cards,
                COALESCE(red_cards, 0)::int8 AS red_cards
            FROM standings
            ORDER BY position ASC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(name = "Query top scorers view", skip(self))]
    async fn top_scorers(&self, limit: i64) -> Result<Vec<ScorerRecord>, FetchError> {
        let rows = sqlx::query_as::<_, ScorerRecord>(
            r#"
            SELECT
                player_id,
                player_name,
                jersey_number::int4 AS jersey_number,
                photo_url,
                team_id,
                team_name,
                team_logo_url,
                COALESCE(goals, 0)::int8 AS goals,
                COALESCE(matches_with_goals, 0)::int8 AS matches_with_goals,
                COALESCE(yellow_cards, 0)::int8 AS yellow_cards,
                COALESCE(red_cards, 0)::int8 AS red_cards
            FROM top_scorers
            ORDER BY goals DESC, matches_with_goals DESC, player_name ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(name = "Query matches", skip(self))]
    async fn matches(&self, status: Option<MatchStatus>) -> Result<Vec<MatchWithTeams>, FetchError> {
        let query = format!(
            "{} WHERE ($1::text IS NULL OR m.status::text = $1) ORDER BY m.match_date ASC",
            MATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, MatchRow>(&query)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(MatchWithTeams::try_from).collect()
    }

    #[tracing::instrument(name = "Query match by id", skip(self))]
    async fn match_by_id(&self, match_id: Uuid) -> Result<Option<MatchWithTeams>, FetchError> {
        let query = format!("{} WHERE m.id = $1", MATCH_COLUMNS);
        let row = sqlx::query_as::<_, MatchRow>(&query)
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(MatchWithTeams::try_from).transpose()
    }

    #[tracing::instrument(name = "Query match events", skip(self))]
    async fn match_events(&self, match_id: Uuid) -> Result<Vec<MatchEventWithPlayer>, FetchError> {
        let rows = sqlx::query_as::<_, MatchEventRow>(
            r#"
            SELECT
                e.id,
                e.match_id,
                e.team_id,
                e.player_id,
                p.name AS player_name,
                p.jersey_number::int4 AS jersey_number,
                e.event_type::text AS event_type,
                e.minute::int4 AS minute
            FROM match_events e
            JOIN players p ON p.id = e.player_id
            WHERE e.match_id = $1
            ORDER BY e.minute ASC NULLS LAST, e.created_at ASC
            "#,
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MatchEventWithPlayer::try_from).collect()
    }
}

// src/models/scorer.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row of the `top_scorers` aggregate. Superseded wholesale on every re-fetch.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScorerRecord {
    pub player_id: Uuid,
    pub player_name: String,
    pub jersey_number: Option<i32>,
    pub photo_url: Option<String>,
    pub team_id: Uuid,
    pub team_name: String,
    pub team_logo_url: Option<String>,
    pub goals: i64,
    pub matches_with_goals: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
}

/// A scorer annotated with its competition rank (1-based, repeats on ties).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RankedScorer {
    #[serde(flatten)]
    pub scorer: ScorerRecord,
    pub rank: u32,
}

// src/models/standing.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::display::OrUnset;

/// One row of the server-computed `standings` view. Every figure is an opaque
/// aggregate: nothing here is recomputed on our side.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(into = "StandingPayload")]
pub struct StandingRow {
    pub team_id: Uuid,
    pub team_name: String,
    pub logo_url: Option<String>,
    // The view leaves position NULL until a team has played
    pub position: Option<i64>,
    pub points: i64,
    pub matches_played: i64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    pub goal_difference: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
}

/// Wire shape of a standings row: the stored fields plus the position as
/// shown in the table (`-` while unranked).
#[derive(Serialize)]
struct StandingPayload {
    team_id: Uuid,
    team_name: String,
    logo_url: Option<String>,
    position: Option<i64>,
    position_label: String,
    points: i64,
    matches_played: i64,
    wins: i64,
    draws: i64,
    losses: i64,
    goals_for: i64,
    goals_against: i64,
    goal_difference: i64,
    yellow_cards: i64,
    red_cards: i64,
}

impl From<StandingRow> for StandingPayload {
    fn from(row: StandingRow) -> Self {
        let position_label = OrUnset(&row.position).to_string();
        Self {
            team_id: row.team_id,
            team_name: row.team_name,
            logo_url: row.logo_url,
            position: row.position,
            position_label,
            points: row.points,
            matches_played: row.matches_played,
            wins: row.wins,
            draws: row.draws,
            losses: row.losses,
            goals_for: row.goals_for,
            goals_against: row.goals_against,
            goal_difference: row.goal_difference,
            yellow_cards: row.yellow_cards,
            red_cards: row.red_cards,
        }
    }
}

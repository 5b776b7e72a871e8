// src/models/matches.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::display::OrUnset;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "in_progress" => Ok(MatchStatus::InProgress),
            "finished" => Ok(MatchStatus::Finished),
            other => Err(format!("unknown match status '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(into = "MatchPayload")]
pub struct MatchWithTeams {
    pub id: Uuid,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub match_date: DateTime<Utc>,
    pub status: MatchStatus,
    pub venue: Option<String>,
    pub home_team: TeamSummary,
    pub away_team: TeamSummary,
}

impl MatchWithTeams {
    /// `"2 - 1"` once a match has started, `"-"` while it is still scheduled.
    pub fn scoreline(&self) -> String {
        match (self.status, self.home_score, self.away_score) {
            (MatchStatus::Scheduled, _, _) | (_, None, None) => "-".to_string(),
            _ => format!("{} - {}", OrUnset(&self.home_score), OrUnset(&self.away_score)),
        }
    }
}

/// Wire shape of a match: the stored fields plus the rendered scoreline.
#[derive(Serialize)]
struct MatchPayload {
    id: Uuid,
    home_team_id: Uuid,
    away_team_id: Uuid,
    home_score: Option<i32>,
    away_score: Option<i32>,
    match_date: DateTime<Utc>,
    status: MatchStatus,
    venue: Option<String>,
    home_team: TeamSummary,
    away_team: TeamSummary,
    scoreline: String,
}

impl From<MatchWithTeams> for MatchPayload {
    fn from(m: MatchWithTeams) -> Self {
        let scoreline = m.scoreline();
        Self {
            id: m.id,
            home_team_id: m.home_team_id,
            away_team_id: m.away_team_id,
            home_score: m.home_score,
            away_score: m.away_score,
            match_date: m.match_date,
            status: m.status,
            venue: m.venue,
            home_team: m.home_team,
            away_team: m.away_team,
            scoreline,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchEventKind {
    Goal,
    YellowCard,
    RedCard,
}

impl FromStr for MatchEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goal" => Ok(MatchEventKind::Goal),
            "yellow_card" => Ok(MatchEventKind::YellowCard),
            "red_card" => Ok(MatchEventKind::RedCard),
            other => Err(format!("unknown match event type '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchEventWithPlayer {
    pub id: Uuid,
    pub match_id: Uuid,
    pub team_id: Uuid,
    pub player_id: Uuid,
    pub player_name: String,
    pub jersey_number: Option<i32>,
    pub event_type: MatchEventKind,
    pub minute: Option<i32>,
}

/// A single match together with its timeline, as shown on the match page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchDetail {
    #[serde(rename = "match")]
    pub match_info: MatchWithTeams,
    pub events: Vec<MatchEventWithPlayer>,
}

// src/models/change.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Upstream tables whose changes are broadcast on the change feed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    TeamStatistics,
    Matches,
    MatchEvents,
    Teams,
    Players,
    #[serde(other)]
    Unknown,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::TeamStatistics => "team_statistics",
            Table::Matches => "matches",
            Table::MatchEvents => "match_events",
            Table::Teams => "teams",
            Table::Players => "players",
            Table::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// "Something changed" notification. Consumers never read a delta from it,
/// it only tells them which rows to re-fetch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub record_id: Option<Uuid>,
    /// Set for `match_events` rows: the match the event belongs to.
    #[serde(default)]
    pub match_id: Option<Uuid>,
    #[serde(default = "Utc::now")]
    pub committed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind) -> Self {
        Self {
            table,
            kind,
            record_id: None,
            match_id: None,
            committed_at: Utc::now(),
        }
    }

    pub fn with_record(mut self, record_id: Uuid) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn with_match(mut self, match_id: Uuid) -> Self {
        self.match_id = Some(match_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_notification_payload() {
        let payload = r#"{"table":"match_events","type":"INSERT","match_id":"7f0c5c52-3c0f-4a5e-9d4e-1b7a0e3f6a11"}"#;
        let event: ChangeEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.table, Table::MatchEvents);
        assert_eq!(event.kind, ChangeKind::Insert);
        assert!(event.record_id.is_none());
        assert!(event.match_id.is_some());
    }

    #[test]
    fn test_unknown_table_is_tolerated() {
        let payload = r#"{"table":"audit_log","type":"DELETE"}"#;
        let event: ChangeEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.table, Table::Unknown);
    }
}

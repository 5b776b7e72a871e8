use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::matches::MatchWithTeams;

/// Group matches by the UTC calendar day they are played on, days ascending.
/// Matches keep their relative order inside a day.
pub fn group_by_day(matches: Vec<MatchWithTeams>) -> BTreeMap<NaiveDate, Vec<MatchWithTeams>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<MatchWithTeams>> = BTreeMap::new();
    for m in matches {
        grouped.entry(m.match_date.date_naive()).or_default().push(m);
    }
    grouped
}

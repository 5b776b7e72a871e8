use std::cmp::Ordering;

use crate::models::scorer::{RankedScorer, ScorerRecord};

/// Competition ("1224") ranks for an already ordered slice: an item whose key
/// equals its predecessor's shares that rank, otherwise its rank is `index + 1`.
///
/// Single pass, the slice is never reordered.
pub fn competition_ranks<T, K, F>(items: &[T], key: F) -> Vec<u32>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut ranks = Vec::with_capacity(items.len());
    let mut previous: Option<K> = None;
    let mut current_rank = 0u32;

    for (index, item) in items.iter().enumerate() {
        let item_key = key(item);
        if previous.as_ref() != Some(&item_key) {
            current_rank = rank_at(index);
        }
        ranks.push(current_rank);
        previous = Some(item_key);
    }

    ranks
}

/// 1-based rank of the item at `index`, saturating at `u32::MAX`.
fn rank_at(index: usize) -> u32 {
    u32::try_from(index)
        .ok()
        .and_then(|index| index.checked_add(1))
        .unwrap_or(u32::MAX)
}

/// Annotate a top-scorer result set with ranks, ties sharing a rank on `goals`.
///
/// Expects the rows in [`leaderboard_order`], which is how the query sorts them.
pub fn rank_scorers(records: Vec<ScorerRecord>) -> Vec<RankedScorer> {
    debug_assert!(
        records.windows(2).all(|pair| pair[0].goals >= pair[1].goals),
        "scorers must be sorted by goals descending"
    );

    let ranks = competition_ranks(&records, |scorer| scorer.goals);
    records
        .into_iter()
        .zip(ranks)
        .map(|(scorer, rank)| RankedScorer { scorer, rank })
        .collect()
}

/// Goals descending, then matches with goals descending, then player name ascending.
pub fn leaderboard_order(a: &ScorerRecord, b: &ScorerRecord) -> Ordering {
    b.goals
        .cmp(&a.goals)
        .then_with(|| b.matches_with_goals.cmp(&a.matches_with_goals))
        .then_with(|| a.player_name.cmp(&b.player_name))
}

//! Team aggregate reconciliation
//!
//! After the player rows for a match are built, each team's formation,
//! average player rating and squad market value are folded into one targeted
//! update for that team's full-match statistics row.

use crate::normalize::round2;
use match_store::{PlayerMatchStatsRecord, TeamAggregateUpdate};

/// Build the aggregate update for one team from the match's player rows.
///
/// Unrated players (no rating, or a zero rating) are left out of the average
/// entirely; a squad with no rated players gets a NULL average rather than 0.
/// Unknown market values contribute nothing to the total.
pub fn build_team_aggregate(
    match_id: i64,
    team_id: i64,
    formation: Option<String>,
    stats: &[PlayerMatchStatsRecord],
) -> TeamAggregateUpdate {
    let team_rows = || stats.iter().filter(|record| record.team_id == team_id);

    let ratings: Vec<f64> = team_rows()
        .filter_map(|record| record.rating)
        .filter(|rating| *rating > 0.0)
        .collect();
    let average_rating = if ratings.is_empty() {
        None
    } else {
        Some(round2(ratings.iter().sum::<f64>() / ratings.len() as f64))
    };

    let total_market_value_eur = team_rows()
        .filter_map(|record| record.market_value_eur)
        .sum();

    TeamAggregateUpdate {
        match_id,
        team_id,
        formation,
        average_rating,
        total_market_value_eur,
    }
}

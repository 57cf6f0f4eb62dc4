//! Lineup processing: per-player match statistics
//!
//! Turns one lineups payload into player dimension rows and
//! `player_match_stats` rows. Entries whose statistics map is empty belong to
//! unused bench players and produce nothing.

use crate::models::{RawLineup, RawLineupEntry, RawLineupsPayload};
use crate::normalize::parse_stat;
use match_store::{PlayerMatchStatsRecord, PlayerRecord};
use serde_json::{Map, Value};
use tracing::debug;

/// Everything extracted from one lineups payload
#[derive(Debug, Clone)]
pub struct LineupBuild {
    pub players: Vec<PlayerRecord>,
    pub stats: Vec<PlayerMatchStatsRecord>,
    pub home_formation: Option<String>,
    pub away_formation: Option<String>,
}

/// Build player rows for both squads of one match
pub fn build_lineups(
    match_id: i64,
    home_team_id: i64,
    away_team_id: i64,
    payload: &RawLineupsPayload,
) -> LineupBuild {
    let mut build = LineupBuild {
        players: Vec::new(),
        stats: Vec::new(),
        home_formation: payload.home.formation.clone(),
        away_formation: payload.away.formation.clone(),
    };
    collect_side(match_id, home_team_id, &payload.home, &mut build);
    collect_side(match_id, away_team_id, &payload.away, &mut build);
    build
}

fn collect_side(match_id: i64, team_id: i64, lineup: &RawLineup, build: &mut LineupBuild) {
    for entry in &lineup.players {
        if let Some((player, stats)) = build_entry(match_id, team_id, entry) {
            build.players.push(player);
            build.stats.push(stats);
        }
    }
}

fn build_entry(
    match_id: i64,
    team_id: i64,
    entry: &RawLineupEntry,
) -> Option<(PlayerRecord, PlayerMatchStatsRecord)> {
    // No statistics means the player never entered the match
    let stats = entry.statistics.as_ref().filter(|map| !map.is_empty())?;

    let player = match entry.player.to_player_record() {
        Some(player) => player,
        None => {
            debug!(
                "Skipping lineup entry without usable player identity in match {}",
                match_id
            );
            return None;
        }
    };

    let mut record = PlayerMatchStatsRecord::new(match_id, player.player_id, team_id);
    record.is_substitute = entry.substitute;
    record.played_position = entry
        .position
        .clone()
        .or_else(|| player.primary_position.clone());
    record.jersey_number = entry
        .jersey_number
        .as_ref()
        .and_then(|raw| parse_stat(raw).as_int())
        .and_then(|n| i32::try_from(n).ok());
    record.market_value_eur = entry
        .player
        .proposed_market_value_raw
        .as_ref()
        .and_then(|mv| mv.value);
    record.rating = stat_f64(stats, "rating");

    record.minutes_played = stat_i64(stats, "minutesPlayed");
    record.touches = stat_i64(stats, "touches");
    record.goals = stat_i64(stats, "goals");
    record.assists = stat_i64(stats, "goalAssist");
    record.own_goals = stat_i64(stats, "ownGoals");
    record.passes_accurate = stat_i64(stats, "accuratePass");
    record.passes_total = stat_i64(stats, "totalPass");
    record.passes_key = stat_i64(stats, "keyPass");
    record.long_balls_accurate = stat_i64(stats, "accurateLongBalls");
    record.long_balls_total = stat_i64(stats, "totalLongBalls");
    record.crosses_accurate = stat_i64(stats, "accurateCross");
    record.crosses_total = stat_i64(stats, "totalCross");
    record.shots_total = stat_i64(stats, "totalShoot");
    record.shots_on_target = stat_i64(stats, "onTargetScoringAttempt");
    record.shots_off_target = stat_i64(stats, "shotOffTarget");
    record.shots_blocked_by_opponent = stat_i64(stats, "blockedScoringAttempt");
    record.dribbles_successful = stat_i64(stats, "dribbleWon");
    record.dribbles_attempts = stat_i64(stats, "dribbleAttempt");
    record.possession_lost = stat_i64(stats, "possessionLostCtrl");
    record.dispossessed = stat_i64(stats, "dispossessed");
    record.duels_won = stat_i64(stats, "duelWon");
    record.duels_lost = stat_i64(stats, "duelLost");
    record.aerials_won = stat_i64(stats, "aerialWon");
    record.aerials_lost = stat_i64(stats, "aerialLost");
    record.tackles = stat_i64(stats, "totalTackle");
    record.interceptions = stat_i64(stats, "interceptionWon");
    record.clearances = stat_i64(stats, "totalClearance");
    record.shots_blocked_by_player = stat_i64(stats, "outfielderBlock");
    record.dribbled_past = stat_i64(stats, "challengeLost");
    record.fouls_committed = stat_i64(stats, "fouls");
    record.fouls_suffered = stat_i64(stats, "wasFouled");
    record.saves = stat_i64(stats, "saves");
    record.punches_made = stat_i64(stats, "punches");
    record.high_claims = stat_i64(stats, "goodHighClaim");
    record.saves_inside_box = stat_i64(stats, "savedShotsFromInsideTheBox");
    record.sweeper_keeper_successful = stat_i64(stats, "keeperSweeperWon");
    record.sweeper_keeper_total = stat_i64(stats, "totalKeeperSweeper");
    record.expected_goals = stat_f64(stats, "expectedGoals");
    record.expected_assists = stat_f64(stats, "expectedAssists");

    let (ground_won, ground_total) = ground_duels(stats, &record);
    record.ground_duels_won = ground_won;
    record.ground_duels_total = ground_total;

    Some((player, record))
}

fn stat_i64(stats: &Map<String, Value>, key: &str) -> i64 {
    stat_i64_opt(stats, key).unwrap_or(0)
}

fn stat_i64_opt(stats: &Map<String, Value>, key: &str) -> Option<i64> {
    stats.get(key).and_then(|raw| parse_stat(raw).as_int())
}

fn stat_f64(stats: &Map<String, Value>, key: &str) -> Option<f64> {
    stats.get(key).and_then(|raw| parse_stat(raw).as_float())
}

/// Ground duels: the feed sometimes carries the pair directly; otherwise it
/// is derived as total duels minus aerial duels. A derivation that would go
/// negative or put won above total is dropped entirely, both columns NULL.
fn ground_duels(
    stats: &Map<String, Value>,
    record: &PlayerMatchStatsRecord,
) -> (Option<i64>, Option<i64>) {
    let direct_won = stat_i64_opt(stats, "groundDuelWon");
    let direct_total = stat_i64_opt(stats, "groundDuelTotal");
    if let (Some(won), Some(total)) = (direct_won, direct_total) {
        return (Some(won), Some(total));
    }

    let won = record.duels_won - record.aerials_won;
    let total = (record.duels_won + record.duels_lost) - (record.aerials_won + record.aerials_lost);
    if won >= 0 && total >= won {
        (Some(won), Some(total))
    } else {
        debug!(
            "Inconsistent ground duel derivation for player {} in match {} ({}/{})",
            record.player_id, record.match_id, won, total
        );
        (None, None)
    }
}

//! Team statistics processing
//!
//! The statistics payload is a list of period blocks, each holding named
//! home/away value pairs. A first pass collects the known statistics into a
//! per-side map of normalized values; a second pass lays them out into
//! `team_match_stats` rows. Only periods present in the payload produce rows,
//! so one match yields up to six records.

use crate::models::{RawStatisticsItem, RawStatisticsPeriod};
use crate::normalize::{fraction_from_counts, parse_stat, round4, Fraction, StatValue};
use match_store::{Period, TeamMatchStatsRecord};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

type SideStats = HashMap<&'static str, StatValue>;

/// Map an API statistic name to its intermediate key. Names outside this
/// table are not stored.
fn temp_key(api_name: &str) -> Option<&'static str> {
    Some(match api_name {
        "Ball possession" => "possession",
        "Big chances" => "big_chances",
        "Total shots" => "total_shots",
        "Goalkeeper saves" | "Total saves" => "saves",
        "Corner kicks" => "corners",
        "Fouls" => "fouls",
        "Passes" => "passes",
        "Tackles" => "tackles",
        "Total tackles" => "tackles_total",
        "Free kicks" => "free_kicks",
        "Yellow cards" => "yellow_cards",
        "Red cards" => "red_cards",
        "Shots on target" => "shots_on_target",
        "Hit woodwork" => "hit_woodwork",
        "Shots off target" => "shots_off_target",
        "Blocked shots" => "blocked_shots",
        "Shots inside box" => "shots_inside_box",
        "Shots outside box" => "shots_outside_box",
        "Big chances missed" => "big_chances_missed",
        "Fouled in final third" => "fouled_final_third",
        "Offsides" => "offsides",
        "Accurate passes" => "accurate_passes",
        "Throw-ins" => "throw_ins",
        "Final third entries" => "final_third_entries",
        "Long balls" => "long_balls",
        "Crosses" => "crosses",
        "Duels" => "duels",
        "Dispossessed" => "dispossessed",
        "Ground duels" => "ground_duels",
        "Aerial duels" => "aerial_duels",
        "Dribbles" => "dribbles",
        "Tackles won" => "tackles_won",
        "Interceptions" => "interceptions",
        "Clearances" => "clearances",
        "Goal kicks" => "goal_kicks",
        _ => return None,
    })
}

/// Build team stat records for every period block in the payload
pub fn build_team_stats(
    match_id: i64,
    home_team_id: i64,
    away_team_id: i64,
    periods: &[RawStatisticsPeriod],
) -> Vec<TeamMatchStatsRecord> {
    let mut records = Vec::new();
    for block in periods {
        let period = match block.period.as_deref().and_then(Period::parse) {
            Some(period) => period,
            None => {
                warn!(
                    "Ignoring unexpected statistics period {:?} in match {}",
                    block.period, match_id
                );
                continue;
            }
        };

        let (home, away) = collect_period(block);
        records.push(build_record(match_id, home_team_id, true, period, &home));
        records.push(build_record(match_id, away_team_id, false, period, &away));
    }
    records
}

fn collect_period(block: &RawStatisticsPeriod) -> (SideStats, SideStats) {
    let mut home = SideStats::new();
    let mut away = SideStats::new();
    for group in &block.groups {
        for item in &group.statistics_items {
            let key = match temp_key(&item.name) {
                Some(key) => key,
                None => continue,
            };

            // Tackles won carries its counts in side-specific fields instead
            // of a combined display string
            if key == "tackles_won" {
                if let Some(f) = side_fraction(item.home_value, item.home_total, item.home.as_ref())
                {
                    home.insert(key, StatValue::Fraction(f));
                }
                if let Some(f) = side_fraction(item.away_value, item.away_total, item.away.as_ref())
                {
                    away.insert(key, StatValue::Fraction(f));
                }
                continue;
            }

            if let Some(raw) = &item.home {
                home.insert(key, parse_stat(raw));
            }
            if let Some(raw) = &item.away {
                away.insert(key, parse_stat(raw));
            }
        }
    }
    (home, away)
}

fn side_fraction(
    successful: Option<f64>,
    total: Option<i64>,
    display: Option<&Value>,
) -> Option<Fraction> {
    match (successful, total) {
        (Some(successful), Some(total)) => Some(fraction_from_counts(successful as i64, total)),
        _ => display.and_then(|raw| parse_stat(raw).as_fraction()),
    }
}

fn build_record(
    match_id: i64,
    team_id: i64,
    is_home_team: bool,
    period: Period,
    stats: &SideStats,
) -> TeamMatchStatsRecord {
    let mut record = TeamMatchStatsRecord::new(match_id, team_id, is_home_team, period);

    record.possession_percentage = stats.get("possession").and_then(ratio);

    record.big_chances = counter(stats, "big_chances");
    record.total_shots = counter(stats, "total_shots");
    record.saves = counter(stats, "saves");
    record.corners = counter(stats, "corners");
    record.fouls = counter(stats, "fouls");
    record.free_kicks = counter(stats, "free_kicks");
    record.yellow_cards = counter(stats, "yellow_cards");
    record.red_cards = counter(stats, "red_cards");
    record.shots_on_target = counter(stats, "shots_on_target");
    record.hit_woodwork = counter(stats, "hit_woodwork");
    record.shots_off_target = counter(stats, "shots_off_target");
    record.blocked_shots = counter(stats, "blocked_shots");
    record.shots_inside_box = counter(stats, "shots_inside_box");
    record.shots_outside_box = counter(stats, "shots_outside_box");
    record.big_chances_missed = counter(stats, "big_chances_missed");
    record.fouled_final_third = counter(stats, "fouled_final_third");
    record.offsides = counter(stats, "offsides");
    record.throw_ins = counter(stats, "throw_ins");
    record.final_third_entries = counter(stats, "final_third_entries");
    record.dispossessed = counter(stats, "dispossessed");
    record.interceptions = counter(stats, "interceptions");
    record.clearances = counter(stats, "clearances");
    record.goal_kicks = counter(stats, "goal_kicks");

    let (successful, total, percentage) = composite(stats, "long_balls");
    record.long_balls_successful = successful;
    record.long_balls_total = total;
    record.long_balls_percentage = percentage;

    let (successful, total, percentage) = composite(stats, "crosses");
    record.crosses_successful = successful;
    record.crosses_total = total;
    record.crosses_percentage = percentage;

    let (successful, total, percentage) = composite(stats, "ground_duels");
    record.ground_duels_successful = successful;
    record.ground_duels_total = total;
    record.ground_duels_percentage = percentage;

    let (successful, total, percentage) = composite(stats, "aerial_duels");
    record.aerial_duels_successful = successful;
    record.aerial_duels_total = total;
    record.aerial_duels_percentage = percentage;

    let (successful, total, percentage) = composite(stats, "dribbles");
    record.dribbles_successful = successful;
    record.dribbles_total = total;
    record.dribbles_percentage = percentage;

    // Duels sometimes arrives as a bare ratio rather than a fraction; a
    // float at or below 1.0 is a percentage, not a total
    match stats.get("duels") {
        Some(StatValue::Fraction(f)) => {
            record.duels_won_successful = f.successful;
            record.duels_won_total = f.total;
            record.duels_won_percentage = f.percentage;
        }
        Some(StatValue::Float(f)) if *f <= 1.0 => {
            warn!(
                "Duels value {} read as a percentage for team {} in match {}",
                f, team_id, match_id
            );
            record.duels_won_percentage = Some(*f);
        }
        Some(other) => {
            record.duels_won_total = other.as_int().unwrap_or(0);
        }
        None => {}
    }

    apply_passes(&mut record, stats);
    apply_tackles(&mut record, stats);

    record
}

/// Passes and accurate-passes describe the same attempt counts in different
/// shapes; populate the columns from whichever form is present, preferring a
/// real fraction.
fn apply_passes(record: &mut TeamMatchStatsRecord, stats: &SideStats) {
    let passes = stats.get("passes").copied();
    let accurate = stats.get("accurate_passes").copied();

    let fraction = passes
        .and_then(|v| v.as_fraction())
        .or_else(|| accurate.and_then(|v| v.as_fraction()));
    if let Some(f) = fraction {
        record.passes_successful = f.successful;
        record.passes_total = f.total;
        record.passes_percentage = f.percentage;
    } else if let Some(total) = passes.and_then(|v| v.as_int()) {
        record.passes_total = total;
    }

    record.accurate_passes_percentage = match accurate {
        Some(StatValue::Fraction(f)) => f.percentage,
        Some(value) => ratio(&value),
        None => None,
    };
}

/// Tackle counts are spread over up to three statistics depending on the
/// payload vintage: a combined fraction, a won-fraction with side counts,
/// and a bare total.
fn apply_tackles(record: &mut TeamMatchStatsRecord, stats: &SideStats) {
    match stats.get("tackles") {
        Some(StatValue::Fraction(f)) => {
            record.tackles_successful = f.successful;
            record.tackles_total = f.total;
            record.tackles_won_percentage = f.percentage;
        }
        Some(other) => {
            record.tackles_total = other.as_int().unwrap_or(0);
        }
        None => {}
    }

    if let Some(f) = stats.get("tackles_won").and_then(|v| v.as_fraction()) {
        record.tackles_successful = f.successful;
        record.tackles_won_percentage = f.percentage;
        if record.tackles_total == 0 {
            record.tackles_total = f.total;
        }
    }

    if record.tackles_total == 0 {
        if let Some(total) = stats.get("tackles_total").and_then(|v| v.as_int()) {
            record.tackles_total = total;
        }
    }
}

fn counter(stats: &SideStats, key: &str) -> i64 {
    match stats.get(key) {
        Some(StatValue::Fraction(f)) => {
            warn!("Counter statistic {} arrived as a fraction ({}); storing 0", key, f);
            0
        }
        Some(value) => value.as_int().unwrap_or(0),
        None => 0,
    }
}

fn composite(stats: &SideStats, key: &str) -> (i64, i64, Option<f64>) {
    match stats.get(key) {
        Some(StatValue::Fraction(f)) => (f.successful, f.total, f.percentage),
        Some(other) => (0, other.as_int().unwrap_or(0), None),
        None => (0, 0, None),
    }
}

/// Interpret a bare value as a 0..=1 ratio; whole numbers are percentages
fn ratio(value: &StatValue) -> Option<f64> {
    match value {
        StatValue::Float(f) if *f <= 1.0 => Some(*f),
        StatValue::Float(f) => Some(round4(f / 100.0)),
        StatValue::Int(n) => Some(round4(*n as f64 / 100.0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn periods(value: Value) -> Vec<RawStatisticsPeriod> {
        serde_json::from_value(value).unwrap()
    }

    fn item(name: &str, home: Value, away: Value) -> Value {
        json!({"name": name, "home": home, "away": away})
    }

    #[test]
    fn one_record_per_team_per_present_period() {
        let blocks = periods(json!([
            {"period": "ALL", "groups": [{"groupName": "Overview", "statisticsItems": [
                item("Ball possession", json!("54%"), json!("46%")),
                item("Corner kicks", json!("5"), json!(3)),
            ]}]},
            {"period": "1ST", "groups": [{"groupName": "Overview", "statisticsItems": [
                item("Ball possession", json!("60%"), json!("40%")),
            ]}]}
        ]));

        let records = build_team_stats(10, 2817, 2836, &blocks);
        assert_eq!(records.len(), 4);

        let home_all = &records[0];
        assert_eq!(home_all.period, Period::All);
        assert!(home_all.is_home_team);
        assert_eq!(home_all.possession_percentage, Some(0.54));
        assert_eq!(home_all.corners, 5);

        let away_all = &records[1];
        assert_eq!(away_all.team_id, 2836);
        assert_eq!(away_all.possession_percentage, Some(0.46));
        assert_eq!(away_all.corners, 3);

        assert_eq!(records[2].period, Period::FirstHalf);
        assert_eq!(records[2].possession_percentage, Some(0.6));
    }

    #[test]
    fn unknown_periods_are_ignored() {
        let blocks = periods(json!([
            {"period": "OT", "groups": []},
            {"groups": []}
        ]));
        assert!(build_team_stats(10, 2817, 2836, &blocks).is_empty());
    }

    #[test]
    fn composites_decompose_into_three_columns() {
        let blocks = periods(json!([
            {"period": "ALL", "groups": [{"groupName": "Passes", "statisticsItems": [
                item("Passes", json!("455/524 (87%)"), json!("301/392 (77%)")),
                item("Accurate passes", json!("87%"), json!("301/392 (77%)")),
                item("Long balls", json!("30/60 (50%)"), json!(41)),
            ]}]}
        ]));

        let records = build_team_stats(10, 2817, 2836, &blocks);
        let home = &records[0];
        assert_eq!(home.passes_successful, 455);
        assert_eq!(home.passes_total, 524);
        assert_eq!(home.passes_percentage, Some(0.87));
        assert_eq!(home.accurate_passes_percentage, Some(0.87));
        assert_eq!(home.long_balls_successful, 30);
        assert_eq!(home.long_balls_percentage, Some(0.5));

        // Bare number for a composite is a total
        let away = &records[1];
        assert_eq!(away.long_balls_total, 41);
        assert_eq!(away.long_balls_successful, 0);
        assert_eq!(away.long_balls_percentage, None);
        // Fraction-shaped accurate passes also fills the percentage
        assert_eq!(away.accurate_passes_percentage, Some(0.77));
    }

    #[test]
    fn accurate_passes_fraction_backfills_pass_counts() {
        let blocks = periods(json!([
            {"period": "ALL", "groups": [{"groupName": "Passes", "statisticsItems": [
                item("Accurate passes", json!("301/392 (77%)"), json!("87%")),
            ]}]}
        ]));
        let records = build_team_stats(10, 2817, 2836, &blocks);
        assert_eq!(records[0].passes_successful, 301);
        assert_eq!(records[0].passes_total, 392);
        assert_eq!(records[1].passes_total, 0);
        assert_eq!(records[1].accurate_passes_percentage, Some(0.87));
    }

    #[test]
    fn bare_duel_ratio_is_a_percentage_not_a_total() {
        let blocks = periods(json!([
            {"period": "ALL", "groups": [{"groupName": "Duels", "statisticsItems": [
                item("Duels", json!("62%"), json!("48/103 (47%)")),
            ]}]}
        ]));
        let records = build_team_stats(10, 2817, 2836, &blocks);
        assert_eq!(records[0].duels_won_percentage, Some(0.62));
        assert_eq!(records[0].duels_won_total, 0);
        assert_eq!(records[1].duels_won_successful, 48);
        assert_eq!(records[1].duels_won_total, 103);
    }

    #[test]
    fn tackles_won_uses_side_specific_counts() {
        let blocks = periods(json!([
            {"period": "ALL", "groups": [{"groupName": "Defending", "statisticsItems": [
                {"name": "Tackles won", "home": "58%", "away": "42%",
                 "homeValue": 11.0, "homeTotal": 19, "awayValue": 8.0, "awayTotal": 19},
                item("Total tackles", json!(19), json!(19)),
            ]}]}
        ]));
        let records = build_team_stats(10, 2817, 2836, &blocks);
        let home = &records[0];
        assert_eq!(home.tackles_successful, 11);
        assert_eq!(home.tackles_total, 19);
        assert_eq!(home.tackles_won_percentage, Some(0.5789));
        let away = &records[1];
        assert_eq!(away.tackles_successful, 8);
    }

    #[test]
    fn combined_tackle_fraction_still_works() {
        let blocks = periods(json!([
            {"period": "ALL", "groups": [{"groupName": "Defending", "statisticsItems": [
                item("Tackles", json!("14/20 (70%)"), json!(17)),
            ]}]}
        ]));
        let records = build_team_stats(10, 2817, 2836, &blocks);
        assert_eq!(records[0].tackles_successful, 14);
        assert_eq!(records[0].tackles_total, 20);
        assert_eq!(records[0].tackles_won_percentage, Some(0.7));
        assert_eq!(records[1].tackles_total, 17);
        assert_eq!(records[1].tackles_successful, 0);
    }

    #[test]
    fn missing_and_malformed_counters_default_to_zero() {
        let blocks = periods(json!([
            {"period": "ALL", "groups": [{"groupName": "Shots", "statisticsItems": [
                item("Total shots", json!("n/a"), json!("12/20 (60%)")),
            ]}]}
        ]));
        let records = build_team_stats(10, 2817, 2836, &blocks);
        // Unparseable and fraction-shaped counter values are both rejected
        assert_eq!(records[0].total_shots, 0);
        assert_eq!(records[1].total_shots, 0);
        assert_eq!(records[0].saves, 0);
        assert_eq!(records[0].formation, None);
        assert_eq!(records[0].average_team_rating, None);
    }
}

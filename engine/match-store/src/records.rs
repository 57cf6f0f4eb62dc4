//! Typed row records for the ingestion schema
//!
//! One struct per table, named fields end to end. The `*_COLUMNS` constants
//! are the schema contract: the Postgres writer generates its upsert SQL from
//! them, and width checks in the tests keep the bind lists honest. Field
//! names equal column names throughout.

use chrono::{DateTime, Utc};

/// Match time segment for team stat aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    All,
    FirstHalf,
    SecondHalf,
}

/// All periods, in storage order
pub const PERIODS: [Period; 3] = [Period::All, Period::FirstHalf, Period::SecondHalf];

impl Period {
    /// Storage representation, matching the source API period codes
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::All => "ALL",
            Period::FirstHalf => "1ST",
            Period::SecondHalf => "2ND",
        }
    }

    /// Parse a source period code; unknown codes return None
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "ALL" => Some(Period::All),
            "1ST" => Some(Period::FirstHalf),
            "2ND" => Some(Period::SecondHalf),
            _ => None,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimension row for a tournament (competition)
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentRecord {
    pub tournament_id: i64,
    pub name: String,
    pub country: Option<String>,
}

/// Dimension row for a season of one tournament
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRecord {
    pub season_id: i64,
    pub tournament_id: i64,
    pub name: String,
}

/// Dimension row for a team
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRecord {
    pub team_id: i64,
    pub name: String,
    pub country: Option<String>,
}

/// Dimension row for a player; the source numeric id is the identity
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub player_id: i64,
    pub name: String,
    pub height_cm: Option<i32>,
    pub primary_position: Option<String>,
    pub country: Option<String>,
}

/// Fact row for one match, refreshed from round listings
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: i64,
    pub season_id: i64,
    pub round_number: Option<i32>,
    pub kickoff_utc: Option<DateTime<Utc>>,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub home_score_ht: Option<i32>,
    pub away_score_ht: Option<i32>,
}

/// Read-back of the match fact used by the event backfill path
#[derive(Debug, Clone, PartialEq)]
pub struct MatchContext {
    pub season_id: i64,
    pub round_number: Option<i32>,
    pub kickoff_utc: Option<DateTime<Utc>>,
    pub home_team_id: i64,
    pub away_team_id: i64,
}

/// One row per (match_id, player_id).
///
/// Counters default to 0 when the source omits them; rating and the
/// expected-goals style floats default to None because 0 is a valid observed
/// value there. The ground duel pair is nullable: None encodes the
/// inconsistent-derivation case, never a negative count.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMatchStatsRecord {
    pub match_id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub is_substitute: bool,
    pub played_position: Option<String>,
    pub jersey_number: Option<i32>,
    pub market_value_eur: Option<i64>,
    pub rating: Option<f64>,
    pub minutes_played: i64,
    pub touches: i64,
    pub goals: i64,
    pub assists: i64,
    pub own_goals: i64,
    pub passes_accurate: i64,
    pub passes_total: i64,
    pub passes_key: i64,
    pub long_balls_accurate: i64,
    pub long_balls_total: i64,
    pub crosses_accurate: i64,
    pub crosses_total: i64,
    pub shots_total: i64,
    pub shots_on_target: i64,
    pub shots_off_target: i64,
    pub shots_blocked_by_opponent: i64,
    pub dribbles_successful: i64,
    pub dribbles_attempts: i64,
    pub possession_lost: i64,
    pub dispossessed: i64,
    pub duels_won: i64,
    pub duels_lost: i64,
    pub aerials_won: i64,
    pub aerials_lost: i64,
    pub ground_duels_won: Option<i64>,
    pub ground_duels_total: Option<i64>,
    pub tackles: i64,
    pub interceptions: i64,
    pub clearances: i64,
    pub shots_blocked_by_player: i64,
    pub dribbled_past: i64,
    pub fouls_committed: i64,
    pub fouls_suffered: i64,
    pub saves: i64,
    pub punches_made: i64,
    pub high_claims: i64,
    pub saves_inside_box: i64,
    pub sweeper_keeper_successful: i64,
    pub sweeper_keeper_total: i64,
    pub expected_goals: Option<f64>,
    pub expected_assists: Option<f64>,
}

impl PlayerMatchStatsRecord {
    /// Fresh record with every counter at 0 and every nullable field unset.
    /// Each entry gets its own instance; there is no shared template.
    pub fn new(match_id: i64, player_id: i64, team_id: i64) -> Self {
        Self {
            match_id,
            player_id,
            team_id,
            is_substitute: false,
            played_position: None,
            jersey_number: None,
            market_value_eur: None,
            rating: None,
            minutes_played: 0,
            touches: 0,
            goals: 0,
            assists: 0,
            own_goals: 0,
            passes_accurate: 0,
            passes_total: 0,
            passes_key: 0,
            long_balls_accurate: 0,
            long_balls_total: 0,
            crosses_accurate: 0,
            crosses_total: 0,
            shots_total: 0,
            shots_on_target: 0,
            shots_off_target: 0,
            shots_blocked_by_opponent: 0,
            dribbles_successful: 0,
            dribbles_attempts: 0,
            possession_lost: 0,
            dispossessed: 0,
            duels_won: 0,
            duels_lost: 0,
            aerials_won: 0,
            aerials_lost: 0,
            ground_duels_won: None,
            ground_duels_total: None,
            tackles: 0,
            interceptions: 0,
            clearances: 0,
            shots_blocked_by_player: 0,
            dribbled_past: 0,
            fouls_committed: 0,
            fouls_suffered: 0,
            saves: 0,
            punches_made: 0,
            high_claims: 0,
            saves_inside_box: 0,
            sweeper_keeper_successful: 0,
            sweeper_keeper_total: 0,
            expected_goals: None,
            expected_assists: None,
        }
    }
}

/// Column table for `player_match_stats`, in bind order
pub const PLAYER_STAT_COLUMNS: &[&str] = &[
    "match_id",
    "player_id",
    "team_id",
    "is_substitute",
    "played_position",
    "jersey_number",
    "market_value_eur",
    "rating",
    "minutes_played",
    "touches",
    "goals",
    "assists",
    "own_goals",
    "passes_accurate",
    "passes_total",
    "passes_key",
    "long_balls_accurate",
    "long_balls_total",
    "crosses_accurate",
    "crosses_total",
    "shots_total",
    "shots_on_target",
    "shots_off_target",
    "shots_blocked_by_opponent",
    "dribbles_successful",
    "dribbles_attempts",
    "possession_lost",
    "dispossessed",
    "duels_won",
    "duels_lost",
    "aerials_won",
    "aerials_lost",
    "ground_duels_won",
    "ground_duels_total",
    "tackles",
    "interceptions",
    "clearances",
    "shots_blocked_by_player",
    "dribbled_past",
    "fouls_committed",
    "fouls_suffered",
    "saves",
    "punches_made",
    "high_claims",
    "saves_inside_box",
    "sweeper_keeper_successful",
    "sweeper_keeper_total",
    "expected_goals",
    "expected_assists",
];

/// Natural key of `player_match_stats`
pub const PLAYER_STAT_KEY: &[&str] = &["match_id", "player_id"];

/// One row per (match_id, team_id, period).
///
/// formation, average_team_rating and total_team_market_value_eur stay None
/// until the aggregate reconciler fills them on the ALL row.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamMatchStatsRecord {
    pub match_id: i64,
    pub team_id: i64,
    pub is_home_team: bool,
    pub period: Period,
    pub formation: Option<String>,
    pub average_team_rating: Option<f64>,
    pub total_team_market_value_eur: Option<i64>,
    pub possession_percentage: Option<f64>,
    pub big_chances: i64,
    pub total_shots: i64,
    pub saves: i64,
    pub corners: i64,
    pub fouls: i64,
    pub passes_successful: i64,
    pub passes_total: i64,
    pub passes_percentage: Option<f64>,
    pub tackles_successful: i64,
    pub tackles_total: i64,
    pub tackles_won_percentage: Option<f64>,
    pub free_kicks: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
    pub shots_on_target: i64,
    pub hit_woodwork: i64,
    pub shots_off_target: i64,
    pub blocked_shots: i64,
    pub shots_inside_box: i64,
    pub shots_outside_box: i64,
    pub big_chances_missed: i64,
    pub fouled_final_third: i64,
    pub offsides: i64,
    pub accurate_passes_percentage: Option<f64>,
    pub throw_ins: i64,
    pub final_third_entries: i64,
    pub long_balls_successful: i64,
    pub long_balls_total: i64,
    pub long_balls_percentage: Option<f64>,
    pub crosses_successful: i64,
    pub crosses_total: i64,
    pub crosses_percentage: Option<f64>,
    pub duels_won_successful: i64,
    pub duels_won_total: i64,
    pub duels_won_percentage: Option<f64>,
    pub dispossessed: i64,
    pub ground_duels_successful: i64,
    pub ground_duels_total: i64,
    pub ground_duels_percentage: Option<f64>,
    pub aerial_duels_successful: i64,
    pub aerial_duels_total: i64,
    pub aerial_duels_percentage: Option<f64>,
    pub dribbles_successful: i64,
    pub dribbles_total: i64,
    pub dribbles_percentage: Option<f64>,
    pub interceptions: i64,
    pub clearances: i64,
    pub goal_kicks: i64,
}

impl TeamMatchStatsRecord {
    /// Fresh record with every counter at 0 and every ratio unset
    pub fn new(match_id: i64, team_id: i64, is_home_team: bool, period: Period) -> Self {
        Self {
            match_id,
            team_id,
            is_home_team,
            period,
            formation: None,
            average_team_rating: None,
            total_team_market_value_eur: None,
            possession_percentage: None,
            big_chances: 0,
            total_shots: 0,
            saves: 0,
            corners: 0,
            fouls: 0,
            passes_successful: 0,
            passes_total: 0,
            passes_percentage: None,
            tackles_successful: 0,
            tackles_total: 0,
            tackles_won_percentage: None,
            free_kicks: 0,
            yellow_cards: 0,
            red_cards: 0,
            shots_on_target: 0,
            hit_woodwork: 0,
            shots_off_target: 0,
            blocked_shots: 0,
            shots_inside_box: 0,
            shots_outside_box: 0,
            big_chances_missed: 0,
            fouled_final_third: 0,
            offsides: 0,
            accurate_passes_percentage: None,
            throw_ins: 0,
            final_third_entries: 0,
            long_balls_successful: 0,
            long_balls_total: 0,
            long_balls_percentage: None,
            crosses_successful: 0,
            crosses_total: 0,
            crosses_percentage: None,
            duels_won_successful: 0,
            duels_won_total: 0,
            duels_won_percentage: None,
            dispossessed: 0,
            ground_duels_successful: 0,
            ground_duels_total: 0,
            ground_duels_percentage: None,
            aerial_duels_successful: 0,
            aerial_duels_total: 0,
            aerial_duels_percentage: None,
            dribbles_successful: 0,
            dribbles_total: 0,
            dribbles_percentage: None,
            interceptions: 0,
            clearances: 0,
            goal_kicks: 0,
        }
    }
}

/// Column table for `team_match_stats`, in bind order
pub const TEAM_STAT_COLUMNS: &[&str] = &[
    "match_id",
    "team_id",
    "is_home_team",
    "period",
    "formation",
    "average_team_rating",
    "total_team_market_value_eur",
    "possession_percentage",
    "big_chances",
    "total_shots",
    "saves",
    "corners",
    "fouls",
    "passes_successful",
    "passes_total",
    "passes_percentage",
    "tackles_successful",
    "tackles_total",
    "tackles_won_percentage",
    "free_kicks",
    "yellow_cards",
    "red_cards",
    "shots_on_target",
    "hit_woodwork",
    "shots_off_target",
    "blocked_shots",
    "shots_inside_box",
    "shots_outside_box",
    "big_chances_missed",
    "fouled_final_third",
    "offsides",
    "accurate_passes_percentage",
    "throw_ins",
    "final_third_entries",
    "long_balls_successful",
    "long_balls_total",
    "long_balls_percentage",
    "crosses_successful",
    "crosses_total",
    "crosses_percentage",
    "duels_won_successful",
    "duels_won_total",
    "duels_won_percentage",
    "dispossessed",
    "ground_duels_successful",
    "ground_duels_total",
    "ground_duels_percentage",
    "aerial_duels_successful",
    "aerial_duels_total",
    "aerial_duels_percentage",
    "dribbles_successful",
    "dribbles_total",
    "dribbles_percentage",
    "interceptions",
    "clearances",
    "goal_kicks",
];

/// Natural key of `team_match_stats`
pub const TEAM_STAT_KEY: &[&str] = &["match_id", "team_id", "period"];

/// Base event row; `event_id` is generated on insert and joins the detail row
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEventRecord {
    pub match_id: i64,
    pub minute: i32,
    pub event_type: String,
    pub team_id: i64,
    pub player_id: Option<i64>,
    /// None means the base event stands alone (e.g. a goal whose scorer
    /// could not be resolved)
    pub detail: Option<EventDetail>,
}

/// Specialized sub-record, one kind per base event
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    Goal(GoalDetail),
    Card(CardDetail),
    Substitution(SubstitutionDetail),
    VarDecision(VarDecisionDetail),
    Shot(ShotDetail),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalDetail {
    pub scoring_player_id: i64,
    pub assist_player_id: Option<i64>,
    pub goal_type: Option<String>,
    pub body_part: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardDetail {
    pub card_type: String,
    pub reason: Option<String>,
    pub is_rescinded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionDetail {
    pub player_in_id: i64,
    pub player_out_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecisionDetail {
    pub decision_type: String,
    pub decision_outcome: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShotDetail {
    pub shooter_player_id: i64,
    pub outcome: Option<String>,
    pub situation: Option<String>,
    pub body_part: Option<String>,
    pub xg: Option<f64>,
    pub xgot: Option<f64>,
    pub player_coord_x: Option<f64>,
    pub player_coord_y: Option<f64>,
    pub goal_mouth_location: Option<String>,
    pub goal_mouth_coord_x: Option<f64>,
    pub goal_mouth_coord_y: Option<f64>,
    pub goal_mouth_coord_z: Option<f64>,
    pub block_coord_x: Option<f64>,
    pub block_coord_y: Option<f64>,
    pub goalkeeper_id: Option<i64>,
    pub added_time: Option<i32>,
    /// A missed penalty (outcome "miss", situation "penalty") gets an extra
    /// sub-record on the same base event
    pub missed_penalty: bool,
}

/// Targeted update the aggregate reconciler applies to the ALL-period row
#[derive(Debug, Clone, PartialEq)]
pub struct TeamAggregateUpdate {
    pub match_id: i64,
    pub team_id: i64,
    pub formation: Option<String>,
    pub average_rating: Option<f64>,
    pub total_market_value_eur: i64,
}

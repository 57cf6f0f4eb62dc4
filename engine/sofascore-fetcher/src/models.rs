//! Raw API payload shapes and their conversions to storage records
//!
//! Every field that the feed is known to omit is an `Option`; conversion
//! methods decide what absence means (fallback id, skipped record, NULL
//! column). Structs mirror the JSON verbatim, records carry the cleaned-up
//! form.

use chrono::{DateTime, Utc};
use match_store::{MatchRecord, PlayerRecord, SeasonRecord, TeamRecord, TournamentRecord};
use serde::Deserialize;
use serde_json::Value;

/// Status code the source uses for a finished match
const STATUS_FINISHED: i64 = 100;

/// Round listing payload: one entry per scheduled match
#[derive(Debug, Deserialize, Clone)]
pub struct RawRoundEventsPayload {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// One match as listed in a round
#[derive(Debug, Deserialize, Clone)]
pub struct RawEvent {
    pub id: i64,

    #[serde(rename = "startTimestamp")]
    pub start_timestamp: Option<i64>,

    pub status: Option<RawStatus>,

    #[serde(rename = "homeTeam")]
    pub home_team: RawTeam,

    #[serde(rename = "awayTeam")]
    pub away_team: RawTeam,

    #[serde(rename = "homeScore")]
    pub home_score: Option<RawScore>,

    #[serde(rename = "awayScore")]
    pub away_score: Option<RawScore>,

    #[serde(rename = "roundInfo")]
    pub round_info: Option<RawRoundInfo>,

    pub tournament: Option<RawTournament>,

    pub season: Option<RawSeason>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawStatus {
    pub code: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawTeam {
    pub id: i64,
    pub name: String,
    pub country: Option<RawCountry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawCountry {
    pub name: Option<String>,
}

/// Score object; `period1` is the half-time score
#[derive(Debug, Deserialize, Clone)]
pub struct RawScore {
    pub current: Option<i64>,
    pub period1: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawRoundInfo {
    pub round: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawTournament {
    pub name: Option<String>,

    pub category: Option<RawCategory>,

    #[serde(rename = "uniqueTournament")]
    pub unique_tournament: Option<RawUniqueTournament>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawCategory {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawUniqueTournament {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawSeason {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub year: Option<String>,
}

/// Lineups payload with both squads
#[derive(Debug, Deserialize, Clone)]
pub struct RawLineupsPayload {
    #[serde(default)]
    pub confirmed: bool,

    pub home: RawLineup,

    pub away: RawLineup,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawLineup {
    #[serde(default)]
    pub players: Vec<RawLineupEntry>,

    pub formation: Option<String>,
}

/// One squad slot: player identity plus the per-match statistics map
#[derive(Debug, Deserialize, Clone)]
pub struct RawLineupEntry {
    pub player: RawPlayer,

    /// Position for this match; falls back to the player's primary position
    pub position: Option<String>,

    /// Sometimes a number, sometimes a string in the feed
    #[serde(rename = "jerseyNumber")]
    pub jersey_number: Option<Value>,

    #[serde(default)]
    pub substitute: bool,

    pub statistics: Option<serde_json::Map<String, Value>>,
}

/// Player object as embedded in lineups, incidents and shotmaps
#[derive(Debug, Deserialize, Clone)]
pub struct RawPlayer {
    pub id: Option<i64>,

    pub name: Option<String>,

    pub height: Option<i32>,

    pub position: Option<String>,

    pub country: Option<RawCountry>,

    #[serde(rename = "proposedMarketValueRaw")]
    pub proposed_market_value_raw: Option<RawMarketValue>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawMarketValue {
    pub value: Option<i64>,
}

/// One period block of the team statistics payload
#[derive(Debug, Deserialize, Clone)]
pub struct RawStatisticsPeriod {
    pub period: Option<String>,

    #[serde(default)]
    pub groups: Vec<RawStatisticsGroup>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawStatisticsGroup {
    #[serde(rename = "groupName")]
    pub group_name: Option<String>,

    #[serde(rename = "statisticsItems", default)]
    pub statistics_items: Vec<RawStatisticsItem>,
}

/// One named statistic with home/away display values and optional raw counts
#[derive(Debug, Deserialize, Clone)]
pub struct RawStatisticsItem {
    pub name: String,

    pub home: Option<Value>,

    pub away: Option<Value>,

    #[serde(rename = "homeValue")]
    pub home_value: Option<f64>,

    #[serde(rename = "awayValue")]
    pub away_value: Option<f64>,

    #[serde(rename = "homeTotal")]
    pub home_total: Option<i64>,

    #[serde(rename = "awayTotal")]
    pub away_total: Option<i64>,
}

/// Incident timeline payload
#[derive(Debug, Deserialize, Clone)]
pub struct RawIncidentsPayload {
    #[serde(default)]
    pub incidents: Vec<RawIncident>,
}

/// One timeline incident; which fields are populated depends on the type
#[derive(Debug, Deserialize, Clone)]
pub struct RawIncident {
    #[serde(rename = "incidentType")]
    pub incident_type: Option<String>,

    /// Match minute
    pub time: Option<i64>,

    #[serde(rename = "isHome")]
    pub is_home: Option<bool>,

    pub player: Option<RawPlayer>,

    #[serde(rename = "playerIn")]
    pub player_in: Option<RawPlayer>,

    #[serde(rename = "playerOut")]
    pub player_out: Option<RawPlayer>,

    pub assist1: Option<RawPlayer>,

    #[serde(rename = "incidentClass")]
    pub incident_class: Option<String>,

    pub reason: Option<String>,

    pub rescinded: Option<bool>,

    #[serde(rename = "goalType")]
    pub goal_type: Option<String>,

    #[serde(rename = "footballPassingNetworkAction")]
    pub football_passing_network_action: Option<Vec<RawPassingNetworkAction>>,

    /// Present on manager cards, which the timeline ignores
    pub manager: Option<Value>,
}

/// Passing-network action attached to goals; the goal action carries the
/// scoring body part, and the participants feed the player dimension
#[derive(Debug, Deserialize, Clone)]
pub struct RawPassingNetworkAction {
    #[serde(rename = "eventType")]
    pub event_type: Option<String>,

    #[serde(rename = "bodyPart")]
    pub body_part: Option<String>,

    pub player: Option<RawPlayer>,

    pub goalkeeper: Option<RawPlayer>,
}

/// Shotmap payload
#[derive(Debug, Deserialize, Clone)]
pub struct RawShotmapPayload {
    #[serde(default)]
    pub shotmap: Vec<RawShot>,
}

/// One attempt from the shotmap
#[derive(Debug, Deserialize, Clone)]
pub struct RawShot {
    pub player: Option<RawPlayer>,

    pub time: Option<i64>,

    #[serde(rename = "isHome")]
    pub is_home: Option<bool>,

    #[serde(rename = "shotType")]
    pub shot_type: Option<String>,

    pub situation: Option<String>,

    #[serde(rename = "bodyPart")]
    pub body_part: Option<String>,

    pub xg: Option<f64>,

    pub xgot: Option<f64>,

    #[serde(rename = "playerCoordinates")]
    pub player_coordinates: Option<RawPoint>,

    #[serde(rename = "goalMouthLocation")]
    pub goal_mouth_location: Option<String>,

    #[serde(rename = "goalMouthCoordinates")]
    pub goal_mouth_coordinates: Option<RawPoint3>,

    #[serde(rename = "blockCoordinates")]
    pub block_coordinates: Option<RawPoint>,

    pub goalkeeper: Option<RawPlayer>,

    #[serde(rename = "addedTime")]
    pub added_time: Option<i64>,

    #[serde(rename = "incidentType")]
    pub incident_type: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RawPoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RawPoint3 {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl RawEvent {
    /// Whether the match has been played to completion
    pub fn is_finished(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.code)
            .map(|code| code == STATUS_FINISHED)
            .unwrap_or(false)
    }

    /// Convert to the match fact row. Listings for future rounds omit scores;
    /// those columns stay NULL until the match finishes and is re-cataloged.
    pub fn to_match_record(&self, fallback_season_id: i64) -> MatchRecord {
        MatchRecord {
            match_id: self.id,
            season_id: self
                .season
                .as_ref()
                .and_then(|s| s.id)
                .unwrap_or(fallback_season_id),
            round_number: self
                .round_info
                .as_ref()
                .and_then(|r| r.round)
                .map(|r| r as i32),
            kickoff_utc: self
                .start_timestamp
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            home_team_id: self.home_team.id,
            away_team_id: self.away_team.id,
            home_score: self.home_score.as_ref().and_then(|s| s.current).map(|s| s as i32),
            away_score: self.away_score.as_ref().and_then(|s| s.current).map(|s| s as i32),
            home_score_ht: self.home_score.as_ref().and_then(|s| s.period1).map(|s| s as i32),
            away_score_ht: self.away_score.as_ref().and_then(|s| s.period1).map(|s| s as i32),
        }
    }

    /// Home and away dimension rows
    pub fn team_records(&self) -> (TeamRecord, TeamRecord) {
        (team_record(&self.home_team), team_record(&self.away_team))
    }

    /// Tournament dimension row, using the configured id when the listing
    /// does not carry one
    pub fn tournament_record(&self, fallback_tournament_id: i64) -> TournamentRecord {
        let tournament = self.tournament.as_ref();
        let unique = tournament.and_then(|t| t.unique_tournament.as_ref());
        TournamentRecord {
            tournament_id: unique.and_then(|u| u.id).unwrap_or(fallback_tournament_id),
            name: tournament
                .and_then(|t| t.name.clone())
                .or_else(|| unique.and_then(|u| u.name.clone()))
                .unwrap_or_default(),
            country: tournament
                .and_then(|t| t.category.as_ref())
                .and_then(|c| c.name.clone()),
        }
    }

    /// Season dimension row
    pub fn season_record(&self, fallback_season_id: i64, tournament_id: i64) -> SeasonRecord {
        let season = self.season.as_ref();
        SeasonRecord {
            season_id: season.and_then(|s| s.id).unwrap_or(fallback_season_id),
            tournament_id,
            name: season
                .and_then(|s| s.name.clone())
                .or_else(|| season.and_then(|s| s.year.clone()))
                .unwrap_or_default(),
        }
    }
}

fn team_record(team: &RawTeam) -> TeamRecord {
    TeamRecord {
        team_id: team.id,
        name: team.name.clone(),
        country: team.country.as_ref().and_then(|c| c.name.clone()),
    }
}

impl RawPlayer {
    /// Convert to the player dimension row. Entries without both an id and a
    /// name are not usable as dimension rows and yield None.
    pub fn to_player_record(&self) -> Option<PlayerRecord> {
        let player_id = self.id?;
        let name = self.name.clone()?;
        Some(PlayerRecord {
            player_id,
            name,
            height_cm: self.height,
            primary_position: self.position.clone(),
            country: self.country.as_ref().and_then(|c| c.name.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_event() -> RawEvent {
        serde_json::from_value(json!({
            "id": 8897222,
            "startTimestamp": 1600536600,
            "status": {"code": 100, "description": "Ended"},
            "homeTeam": {"id": 2817, "name": "Valencia", "country": {"name": "Spain"}},
            "awayTeam": {"id": 2836, "name": "Levante", "country": {"name": "Spain"}},
            "homeScore": {"current": 4, "period1": 2},
            "awayScore": {"current": 2, "period1": 1},
            "roundInfo": {"round": 1},
            "tournament": {
                "name": "LaLiga",
                "category": {"name": "Spain"},
                "uniqueTournament": {"id": 8, "name": "LaLiga"}
            },
            "season": {"id": 32501, "name": "LaLiga 20/21", "year": "20/21"}
        }))
        .unwrap()
    }

    #[test]
    fn finished_status_comes_from_the_code() {
        let mut event = round_event();
        assert!(event.is_finished());

        event.status = Some(RawStatus { code: Some(60) });
        assert!(!event.is_finished());
        event.status = None;
        assert!(!event.is_finished());
    }

    #[test]
    fn match_record_carries_scores_and_kickoff() {
        let record = round_event().to_match_record(0);
        assert_eq!(record.match_id, 8897222);
        assert_eq!(record.season_id, 32501);
        assert_eq!(record.round_number, Some(1));
        assert_eq!(record.home_score, Some(4));
        assert_eq!(record.away_score_ht, Some(1));
        assert_eq!(
            record.kickoff_utc.map(|k| k.timestamp()),
            Some(1600536600)
        );
    }

    #[test]
    fn unplayed_listing_leaves_scores_null() {
        let event: RawEvent = serde_json::from_value(json!({
            "id": 9000001,
            "status": {"code": 0},
            "homeTeam": {"id": 2817, "name": "Valencia"},
            "awayTeam": {"id": 2836, "name": "Levante"},
            "homeScore": {},
            "awayScore": {}
        }))
        .unwrap();

        let record = event.to_match_record(32501);
        assert_eq!(record.season_id, 32501);
        assert_eq!(record.home_score, None);
        assert_eq!(record.kickoff_utc, None);
        assert_eq!(record.round_number, None);
    }

    #[test]
    fn dimension_rows_use_fallback_ids_when_absent() {
        let event = round_event();
        let tournament = event.tournament_record(99);
        assert_eq!(tournament.tournament_id, 8);
        assert_eq!(tournament.country.as_deref(), Some("Spain"));

        let season = event.season_record(0, tournament.tournament_id);
        assert_eq!(season.season_id, 32501);
        assert_eq!(season.name, "LaLiga 20/21");

        let bare: RawEvent = serde_json::from_value(json!({
            "id": 1,
            "homeTeam": {"id": 2, "name": "A"},
            "awayTeam": {"id": 3, "name": "B"}
        }))
        .unwrap();
        assert_eq!(bare.tournament_record(99).tournament_id, 99);
        assert_eq!(bare.season_record(32501, 99).season_id, 32501);
    }

    #[test]
    fn player_record_requires_id_and_name() {
        let full: RawPlayer = serde_json::from_value(json!({
            "id": 70996,
            "name": "Jose Luis Gaya",
            "height": 172,
            "position": "D",
            "country": {"name": "Spain"},
            "proposedMarketValueRaw": {"value": 30000000}
        }))
        .unwrap();
        let record = full.to_player_record().unwrap();
        assert_eq!(record.player_id, 70996);
        assert_eq!(record.height_cm, Some(172));
        assert_eq!(record.country.as_deref(), Some("Spain"));

        let nameless: RawPlayer = serde_json::from_value(json!({"id": 70996})).unwrap();
        assert!(nameless.to_player_record().is_none());
    }
}

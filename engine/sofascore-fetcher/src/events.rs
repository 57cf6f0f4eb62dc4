//! Event timeline processing
//!
//! Folds the incident list and the shotmap of one match into base event
//! records with typed detail sub-records. Every player referenced anywhere in
//! the timeline is collected for dimension upserts. Incidents that violate
//! their type's requirements (a goal without a scorer, a card without a
//! class) still produce the base event but are flagged as failures so the
//! match can be reported and retried.

use crate::models::{RawIncident, RawPlayer, RawShot};
use match_store::{
    CardDetail, EventDetail, GoalDetail, MatchEventRecord, PlayerRecord, ShotDetail,
    SubstitutionDetail, VarDecisionDetail,
};
use std::collections::BTreeMap;
use tracing::warn;

/// Everything extracted from one match's timeline payloads
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub events: Vec<MatchEventRecord>,
    /// Distinct referenced players, ordered by id
    pub players: Vec<PlayerRecord>,
    /// Human-readable descriptions of records that could not be fully built
    pub failures: Vec<String>,
}

/// Build the event batch for one match. Either payload may be absent; an
/// absent payload simply contributes nothing.
pub fn build_events(
    match_id: i64,
    home_team_id: i64,
    away_team_id: i64,
    incidents: Option<&[RawIncident]>,
    shots: Option<&[RawShot]>,
) -> EventBatch {
    let mut builder = EventBuilder {
        match_id,
        home_team_id,
        away_team_id,
        events: Vec::new(),
        players: BTreeMap::new(),
        failures: Vec::new(),
    };

    for incident in incidents.unwrap_or_default() {
        builder.add_incident(incident);
    }
    for shot in shots.unwrap_or_default() {
        builder.add_shot(shot);
    }

    EventBatch {
        events: builder.events,
        players: builder.players.into_values().collect(),
        failures: builder.failures,
    }
}

struct EventBuilder {
    match_id: i64,
    home_team_id: i64,
    away_team_id: i64,
    events: Vec<MatchEventRecord>,
    players: BTreeMap<i64, PlayerRecord>,
    failures: Vec<String>,
}

impl EventBuilder {
    fn side_team_id(&self, is_home: bool) -> i64 {
        if is_home {
            self.home_team_id
        } else {
            self.away_team_id
        }
    }

    fn remember(&mut self, player: Option<&RawPlayer>) {
        if let Some(record) = player.and_then(RawPlayer::to_player_record) {
            self.players.entry(record.player_id).or_insert(record);
        }
    }

    fn add_incident(&mut self, incident: &RawIncident) {
        let kind = match incident.incident_type.as_deref() {
            Some(kind) => kind,
            None => {
                warn!("Skipping untyped incident in match {}", self.match_id);
                return;
            }
        };

        // Period markers and injury-time announcements are not events
        if kind == "period" || kind == "injuryTime" {
            return;
        }
        // The schema models player cards only
        if kind == "card" && incident.manager.is_some() {
            return;
        }

        self.remember(incident.player.as_ref());
        self.remember(incident.player_in.as_ref());
        self.remember(incident.player_out.as_ref());
        self.remember(incident.assist1.as_ref());
        for action in incident.football_passing_network_action.as_deref().unwrap_or_default() {
            self.remember(action.player.as_ref());
            self.remember(action.goalkeeper.as_ref());
        }

        let (minute, team_id) = match (incident.time, incident.is_home) {
            (Some(minute), Some(is_home)) => (minute as i32, self.side_team_id(is_home)),
            _ => {
                warn!(
                    "Skipping {} incident with missing minute or side in match {}",
                    kind, self.match_id
                );
                return;
            }
        };

        // Substitutions are anchored to the departing player; everything
        // else to the main participant when there is one
        let player_id = match kind {
            "substitution" => incident.player_out.as_ref().and_then(|p| p.id),
            _ => incident.player.as_ref().and_then(|p| p.id),
        };

        let detail = match kind {
            "goal" => self.goal_detail(incident, minute),
            "card" => self.card_detail(incident, minute),
            "substitution" => self.substitution_detail(incident, minute),
            "varDecision" => Some(EventDetail::VarDecision(VarDecisionDetail {
                decision_type: "VAR decision".to_string(),
                decision_outcome: incident.incident_class.clone(),
            })),
            // Other timeline entries (e.g. missed penalties) keep their base
            // row without a detail record
            _ => None,
        };

        self.events.push(MatchEventRecord {
            match_id: self.match_id,
            minute,
            event_type: kind.to_string(),
            team_id,
            player_id,
            detail,
        });
    }

    fn goal_detail(&mut self, incident: &RawIncident, minute: i32) -> Option<EventDetail> {
        let scoring_player_id = match incident.player.as_ref().and_then(|p| p.id) {
            Some(id) => id,
            None => {
                warn!(
                    "Goal at minute {} in match {} has no scoring player",
                    minute, self.match_id
                );
                self.failures
                    .push(format!("goal at minute {minute} has no scoring player"));
                return None;
            }
        };

        let body_part = incident
            .football_passing_network_action
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|action| {
                action.event_type.as_deref() == Some("goal") && action.body_part.is_some()
            })
            .and_then(|action| action.body_part.clone());

        Some(EventDetail::Goal(GoalDetail {
            scoring_player_id,
            assist_player_id: incident.assist1.as_ref().and_then(|p| p.id),
            goal_type: incident.goal_type.clone(),
            body_part,
        }))
    }

    fn card_detail(&mut self, incident: &RawIncident, minute: i32) -> Option<EventDetail> {
        let player_id = incident.player.as_ref().and_then(|p| p.id);
        match (player_id, incident.incident_class.clone()) {
            (Some(_), Some(card_type)) => Some(EventDetail::Card(CardDetail {
                card_type,
                reason: incident.reason.clone(),
                is_rescinded: incident.rescinded.unwrap_or(false),
            })),
            _ => {
                warn!(
                    "Card at minute {} in match {} missing player or card class",
                    minute, self.match_id
                );
                self.failures
                    .push(format!("card at minute {minute} missing player or card class"));
                None
            }
        }
    }

    fn substitution_detail(&mut self, incident: &RawIncident, minute: i32) -> Option<EventDetail> {
        let player_in_id = incident.player_in.as_ref().and_then(|p| p.id);
        let player_out_id = incident.player_out.as_ref().and_then(|p| p.id);
        match (player_in_id, player_out_id) {
            (Some(player_in_id), Some(player_out_id)) => {
                Some(EventDetail::Substitution(SubstitutionDetail {
                    player_in_id,
                    player_out_id,
                }))
            }
            _ => {
                warn!(
                    "Substitution at minute {} in match {} missing a player id",
                    minute, self.match_id
                );
                self.failures
                    .push(format!("substitution at minute {minute} missing a player id"));
                None
            }
        }
    }

    fn add_shot(&mut self, shot: &RawShot) {
        if shot.incident_type.as_deref() != Some("shot") {
            return;
        }

        self.remember(shot.player.as_ref());
        self.remember(shot.goalkeeper.as_ref());

        let shooter = shot.player.as_ref().and_then(|p| p.id);
        let (shooter_player_id, minute, is_home) = match (shooter, shot.time, shot.is_home) {
            (Some(shooter), Some(minute), Some(is_home)) => (shooter, minute as i32, is_home),
            _ => {
                warn!(
                    "Skipping shot with missing shooter, minute or side in match {}",
                    self.match_id
                );
                self.failures
                    .push("shot missing shooter, minute or side".to_string());
                return;
            }
        };

        let missed_penalty = shot.shot_type.as_deref() == Some("miss")
            && shot.situation.as_deref() == Some("penalty");

        let detail = ShotDetail {
            shooter_player_id,
            outcome: shot.shot_type.clone(),
            situation: shot.situation.clone(),
            body_part: shot.body_part.clone(),
            xg: shot.xg,
            xgot: shot.xgot,
            player_coord_x: shot.player_coordinates.and_then(|c| c.x),
            player_coord_y: shot.player_coordinates.and_then(|c| c.y),
            goal_mouth_location: shot.goal_mouth_location.clone(),
            goal_mouth_coord_x: shot.goal_mouth_coordinates.and_then(|c| c.x),
            goal_mouth_coord_y: shot.goal_mouth_coordinates.and_then(|c| c.y),
            goal_mouth_coord_z: shot.goal_mouth_coordinates.and_then(|c| c.z),
            block_coord_x: shot.block_coordinates.and_then(|c| c.x),
            block_coord_y: shot.block_coordinates.and_then(|c| c.y),
            goalkeeper_id: shot.goalkeeper.as_ref().and_then(|g| g.id),
            added_time: shot.added_time.map(|t| t as i32),
            missed_penalty,
        };

        self.events.push(MatchEventRecord {
            match_id: self.match_id,
            minute,
            event_type: "shot".to_string(),
            team_id: self.side_team_id(is_home),
            player_id: Some(shooter_player_id),
            detail: Some(EventDetail::Shot(detail)),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn incidents(value: serde_json::Value) -> Vec<RawIncident> {
        serde_json::from_value(value).unwrap()
    }

    fn shots(value: serde_json::Value) -> Vec<RawShot> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn goal_maps_scorer_assist_and_body_part() {
        let incidents = incidents(json!([{
            "incidentType": "goal",
            "time": 23,
            "isHome": true,
            "goalType": "penalty",
            "player": {"id": 44, "name": "Scorer"},
            "assist1": {"id": 45, "name": "Assister"},
            "footballPassingNetworkAction": [
                {"eventType": "pass", "player": {"id": 46, "name": "Builder"}},
                {"eventType": "goal", "bodyPart": "left-foot", "player": {"id": 44, "name": "Scorer"}}
            ]
        }]));

        let batch = build_events(10, 2817, 2836, Some(&incidents), None);
        assert!(batch.failures.is_empty());
        assert_eq!(batch.events.len(), 1);

        let event = &batch.events[0];
        assert_eq!(event.event_type, "goal");
        assert_eq!(event.minute, 23);
        assert_eq!(event.team_id, 2817);
        assert_eq!(event.player_id, Some(44));
        match event.detail.as_ref().unwrap() {
            EventDetail::Goal(goal) => {
                assert_eq!(goal.scoring_player_id, 44);
                assert_eq!(goal.assist_player_id, Some(45));
                assert_eq!(goal.goal_type.as_deref(), Some("penalty"));
                assert_eq!(goal.body_part.as_deref(), Some("left-foot"));
            }
            other => panic!("expected goal detail, got {other:?}"),
        }

        // Scorer, assister and the buildup player all land in the player set
        let ids: Vec<i64> = batch.players.iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![44, 45, 46]);
    }

    #[test]
    fn goal_without_scorer_keeps_base_event_and_flags_failure() {
        let incidents = incidents(json!([{
            "incidentType": "goal",
            "time": 81,
            "isHome": false
        }]));

        let batch = build_events(10, 2817, 2836, Some(&incidents), None);
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.events[0].team_id, 2836);
        assert!(batch.events[0].detail.is_none());
        assert_eq!(batch.failures.len(), 1);
    }

    #[test]
    fn period_markers_and_manager_cards_are_dropped() {
        let incidents = incidents(json!([
            {"incidentType": "period", "text": "HT"},
            {"incidentType": "injuryTime", "length": 4, "time": 45, "isHome": true},
            {"incidentType": "card", "time": 70, "isHome": true,
             "manager": {"id": 9, "name": "Coach"}, "incidentClass": "yellow"}
        ]));

        let batch = build_events(10, 2817, 2836, Some(&incidents), None);
        assert!(batch.events.is_empty());
        assert!(batch.failures.is_empty());
    }

    #[test]
    fn missing_minute_or_side_skips_without_failure() {
        let incidents = incidents(json!([
            {"incidentType": "card", "isHome": true,
             "player": {"id": 7, "name": "P"}, "incidentClass": "yellow"},
            {"incidentType": "goal", "time": 12, "player": {"id": 7, "name": "P"}}
        ]));

        let batch = build_events(10, 2817, 2836, Some(&incidents), None);
        assert!(batch.events.is_empty());
        assert!(batch.failures.is_empty());
        // Referenced players are still collected for the dimension
        assert_eq!(batch.players.len(), 1);
    }

    #[test]
    fn substitution_requires_both_players() {
        let incidents = incidents(json!([
            {"incidentType": "substitution", "time": 60, "isHome": true,
             "playerIn": {"id": 1, "name": "In"}, "playerOut": {"id": 2, "name": "Out"}},
            {"incidentType": "substitution", "time": 75, "isHome": true,
             "playerIn": {"id": 3, "name": "OnlyIn"}}
        ]));

        let batch = build_events(10, 2817, 2836, Some(&incidents), None);
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.events[0].player_id, Some(2));
        match batch.events[0].detail.as_ref().unwrap() {
            EventDetail::Substitution(sub) => {
                assert_eq!(sub.player_in_id, 1);
                assert_eq!(sub.player_out_id, 2);
            }
            other => panic!("expected substitution detail, got {other:?}"),
        }
        assert!(batch.events[1].detail.is_none());
        assert_eq!(batch.failures.len(), 1);
    }

    #[test]
    fn var_decision_allows_missing_player() {
        let incidents = incidents(json!([{
            "incidentType": "varDecision",
            "time": 33,
            "isHome": false,
            "incidentClass": "penaltyNotAwarded"
        }]));

        let batch = build_events(10, 2817, 2836, Some(&incidents), None);
        assert!(batch.failures.is_empty());
        let event = &batch.events[0];
        assert_eq!(event.player_id, None);
        match event.detail.as_ref().unwrap() {
            EventDetail::VarDecision(var) => {
                assert_eq!(var.decision_type, "VAR decision");
                assert_eq!(var.decision_outcome.as_deref(), Some("penaltyNotAwarded"));
            }
            other => panic!("expected VAR detail, got {other:?}"),
        }
    }

    #[test]
    fn shots_come_from_the_shot_list_only() {
        let shots = shots(json!([
            {"incidentType": "shot", "time": 55, "isHome": true, "shotType": "save",
             "situation": "assisted", "bodyPart": "right-foot", "xg": 0.12, "xgot": 0.31,
             "playerCoordinates": {"x": 88.2, "y": 44.1},
             "goalMouthLocation": "low-centre",
             "goalMouthCoordinates": {"x": 0.0, "y": 50.0, "z": 10.0},
             "player": {"id": 44, "name": "Shooter"},
             "goalkeeper": {"id": 99, "name": "Keeper"},
             "addedTime": 2},
            {"incidentType": "goal", "time": 60, "isHome": true,
             "player": {"id": 44, "name": "Shooter"}}
        ]));

        let batch = build_events(10, 2817, 2836, None, Some(&shots));
        assert_eq!(batch.events.len(), 1);
        let event = &batch.events[0];
        assert_eq!(event.event_type, "shot");
        match event.detail.as_ref().unwrap() {
            EventDetail::Shot(shot) => {
                assert_eq!(shot.shooter_player_id, 44);
                assert_eq!(shot.outcome.as_deref(), Some("save"));
                assert_eq!(shot.xg, Some(0.12));
                assert_eq!(shot.player_coord_x, Some(88.2));
                assert_eq!(shot.goal_mouth_coord_z, Some(10.0));
                assert_eq!(shot.block_coord_x, None);
                assert_eq!(shot.goalkeeper_id, Some(99));
                assert_eq!(shot.added_time, Some(2));
                assert!(!shot.missed_penalty);
            }
            other => panic!("expected shot detail, got {other:?}"),
        }
        // Shooter and keeper collected once each
        assert_eq!(batch.players.len(), 2);
    }

    #[test]
    fn missed_penalty_is_flagged_on_the_shot() {
        let shots = shots(json!([{
            "incidentType": "shot", "time": 78, "isHome": false,
            "shotType": "miss", "situation": "penalty",
            "player": {"id": 7, "name": "Taker"}
        }]));

        let batch = build_events(10, 2817, 2836, None, Some(&shots));
        match batch.events[0].detail.as_ref().unwrap() {
            EventDetail::Shot(shot) => assert!(shot.missed_penalty),
            other => panic!("expected shot detail, got {other:?}"),
        }
    }

    #[test]
    fn shot_without_shooter_is_a_failure() {
        let shots = shots(json!([{
            "incidentType": "shot", "time": 78, "isHome": false
        }]));

        let batch = build_events(10, 2817, 2836, None, Some(&shots));
        assert!(batch.events.is_empty());
        assert_eq!(batch.failures.len(), 1);
    }
}

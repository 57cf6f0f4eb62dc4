//! Ingestion pipeline
//!
//! Walks the configured round range: every listed match is cataloged
//! (dimensions plus the match fact), finished matches additionally go through
//! the lineup, team statistics, event and reconciliation phases. Phases
//! soft-fail: an error in one phase is logged and marks the match failed in
//! the report, but the remaining phases still run and rows already written
//! stay put.

use crate::config::FetcherConfig;
use crate::events::build_events;
use crate::fetch::{FetchError, PayloadSource, ResourceKey};
use crate::models::{
    RawEvent, RawIncidentsPayload, RawLineupsPayload, RawRoundEventsPayload, RawShotmapPayload,
    RawStatisticsPeriod,
};
use crate::players::build_lineups;
use crate::reconcile::build_team_aggregate;
use crate::teams::build_team_stats;
use anyhow::{Context, Result};
use futures::future;
use match_store::{MatchStore, TeamAggregateUpdate};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome summary of one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Finished matches fully ingested without a failed phase
    pub matches_processed: usize,
    /// Matches with at least one failed phase or rejected record
    pub matches_failed: usize,
    /// Ids of the failed matches, for retry
    pub failed_match_ids: Vec<i64>,
}

/// Round-range ingestion service
pub struct IngestPipeline {
    config: FetcherConfig,
    source: Arc<dyn PayloadSource>,
    store: Arc<dyn MatchStore>,
}

impl IngestPipeline {
    pub fn new(
        config: FetcherConfig,
        source: Arc<dyn PayloadSource>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        Self { config, source, store }
    }

    /// Ingest every round in the configured range
    pub async fn run(&self) -> Result<IngestReport> {
        let sofascore = &self.config.sofascore;
        let mut report = IngestReport::default();

        for round in sofascore.first_round..=sofascore.last_round {
            let events = match self.discover_round(round).await {
                Ok(events) => events,
                Err(e) => {
                    error!("Failed to list round {}: {}", round, e);
                    continue;
                }
            };
            info!("Round {} lists {} matches", round, events.len());

            for event in &events {
                if let Err(e) = self.catalog_event(event).await {
                    error!("Failed to catalog match {}: {}", event.id, e);
                    report.matches_failed += 1;
                    report.failed_match_ids.push(event.id);
                    continue;
                }

                if !event.is_finished() {
                    debug!("Match {} has not finished; cataloged only", event.id);
                    continue;
                }

                if self
                    .ingest_match(event.id, event.home_team.id, event.away_team.id)
                    .await
                {
                    report.matches_processed += 1;
                } else {
                    report.matches_failed += 1;
                    report.failed_match_ids.push(event.id);
                }

                if sofascore.pause_between_matches_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(sofascore.pause_between_matches_ms))
                        .await;
                }
            }
        }

        info!(
            "Ingest complete: {} matches processed, {} failed",
            report.matches_processed, report.matches_failed
        );
        if !report.failed_match_ids.is_empty() {
            warn!("Failed match ids: {:?}", report.failed_match_ids);
        }
        Ok(report)
    }

    /// Re-run only the event phase for an already-cataloged match
    pub async fn backfill_events(&self, match_id: i64) -> Result<bool> {
        let context = match self.store.match_context(match_id).await? {
            Some(context) => context,
            None => {
                warn!("Match {} is not cataloged; run a round ingest first", match_id);
                return Ok(false);
            }
        };

        let failures = self
            .ingest_events(match_id, context.home_team_id, context.away_team_id)
            .await?;
        for failure in &failures {
            warn!("Match {}: {}", match_id, failure);
        }
        Ok(failures.is_empty())
    }

    /// List one round; a missing listing is an empty round, not an error
    async fn discover_round(&self, round: u32) -> Result<Vec<RawEvent>> {
        let sofascore = &self.config.sofascore;
        let key = ResourceKey::RoundEvents {
            tournament_id: sofascore.tournament_id,
            season_id: sofascore.season_id,
            round,
        };

        let payload = match self.source.fetch(key).await {
            Ok(payload) => payload,
            Err(FetchError::NotFound) => {
                info!("Round {} has no listing", round);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let listing: RawRoundEventsPayload =
            serde_json::from_value(payload).context("Failed to parse round listing")?;

        // Stable id order, one entry per match
        let mut events = listing.events;
        events.sort_by_key(|event| event.id);
        events.dedup_by_key(|event| event.id);
        Ok(events)
    }

    /// Upsert the dimension rows and the match fact for one listed match.
    /// Dimensions go first so the fact row's foreign keys resolve.
    async fn catalog_event(&self, event: &RawEvent) -> Result<()> {
        let sofascore = &self.config.sofascore;
        let tournament = event.tournament_record(sofascore.tournament_id);
        let season = event.season_record(sofascore.season_id, tournament.tournament_id);
        let (home, away) = event.team_records();

        self.store.upsert_tournament(&tournament).await?;
        self.store.upsert_season(&season).await?;
        self.store.upsert_team(&home).await?;
        self.store.upsert_team(&away).await?;
        self.store
            .upsert_match(&event.to_match_record(sofascore.season_id))
            .await?;
        Ok(())
    }

    /// Run all detail phases for one finished match; returns whether every
    /// phase completed cleanly
    async fn ingest_match(&self, match_id: i64, home_team_id: i64, away_team_id: i64) -> bool {
        info!("Ingesting match {}", match_id);
        let mut success = true;

        let aggregates = match self
            .ingest_lineups(match_id, home_team_id, away_team_id)
            .await
        {
            Ok(aggregates) => aggregates,
            Err(e) => {
                error!("Lineup phase failed for match {}: {}", match_id, e);
                success = false;
                None
            }
        };

        if let Err(e) = self
            .ingest_statistics(match_id, home_team_id, away_team_id)
            .await
        {
            error!("Statistics phase failed for match {}: {}", match_id, e);
            success = false;
        }

        match self.ingest_events(match_id, home_team_id, away_team_id).await {
            Ok(failures) => {
                for failure in &failures {
                    warn!("Match {}: {}", match_id, failure);
                }
                if !failures.is_empty() {
                    success = false;
                }
            }
            Err(e) => {
                error!("Event phase failed for match {}: {}", match_id, e);
                success = false;
            }
        }

        // Reconcile last, after both the player and team stat rows exist
        if let Some((home_update, away_update)) = aggregates {
            for update in [home_update, away_update] {
                match self.store.update_team_aggregates(&update).await {
                    Ok(true) => {}
                    Ok(false) => warn!(
                        "No full-match statistics row to reconcile for team {} in match {}",
                        update.team_id, update.match_id
                    ),
                    Err(e) => {
                        error!(
                            "Failed to reconcile aggregates for team {} in match {}: {}",
                            update.team_id, update.match_id, e
                        );
                        success = false;
                    }
                }
            }
        }

        success
    }

    /// Lineup phase: player dimensions, player stat rows, and the per-team
    /// aggregates handed to the reconciler
    async fn ingest_lineups(
        &self,
        match_id: i64,
        home_team_id: i64,
        away_team_id: i64,
    ) -> Result<Option<(TeamAggregateUpdate, TeamAggregateUpdate)>> {
        let payload = match self.fetch_optional(ResourceKey::Lineups { match_id }).await? {
            Some(payload) => payload,
            None => {
                info!("No lineup data for match {}", match_id);
                return Ok(None);
            }
        };
        let lineups: RawLineupsPayload =
            serde_json::from_value(payload).context("Failed to parse lineups payload")?;

        let build = build_lineups(match_id, home_team_id, away_team_id, &lineups);

        // Player dimension rows must exist before the stat batch references
        // them; the upserts themselves are independent
        let upserts = build
            .players
            .iter()
            .map(|player| self.store.upsert_player(player));
        for result in future::join_all(upserts).await {
            result?;
        }

        let count = self.store.upsert_player_stats(&build.stats).await?;
        info!("Stored {} player stat rows for match {}", count, match_id);

        let home = build_team_aggregate(match_id, home_team_id, build.home_formation, &build.stats);
        let away = build_team_aggregate(match_id, away_team_id, build.away_formation, &build.stats);
        Ok(Some((home, away)))
    }

    /// Team statistics phase
    async fn ingest_statistics(
        &self,
        match_id: i64,
        home_team_id: i64,
        away_team_id: i64,
    ) -> Result<()> {
        let payload = match self
            .fetch_optional(ResourceKey::Statistics { match_id })
            .await?
        {
            Some(payload) => payload,
            None => {
                info!("No team statistics for match {}", match_id);
                return Ok(());
            }
        };
        let periods: Vec<RawStatisticsPeriod> =
            serde_json::from_value(payload).context("Failed to parse statistics payload")?;

        let records = build_team_stats(match_id, home_team_id, away_team_id, &periods);
        let count = self.store.upsert_team_stats(&records).await?;
        info!("Stored {} team stat rows for match {}", count, match_id);
        Ok(())
    }

    /// Event phase: incidents and shotmap folded into one replaced batch.
    /// Returns the per-record failure descriptions.
    async fn ingest_events(
        &self,
        match_id: i64,
        home_team_id: i64,
        away_team_id: i64,
    ) -> Result<Vec<String>> {
        let incidents = self
            .fetch_optional(ResourceKey::Incidents { match_id })
            .await?
            .map(serde_json::from_value::<RawIncidentsPayload>)
            .transpose()
            .context("Failed to parse incidents payload")?;
        let shotmap = self
            .fetch_optional(ResourceKey::Shotmap { match_id })
            .await?
            .map(serde_json::from_value::<RawShotmapPayload>)
            .transpose()
            .context("Failed to parse shotmap payload")?;

        if incidents.is_none() && shotmap.is_none() {
            info!("No timeline data for match {}", match_id);
            return Ok(Vec::new());
        }

        let batch = build_events(
            match_id,
            home_team_id,
            away_team_id,
            incidents.as_ref().map(|payload| payload.incidents.as_slice()),
            shotmap.as_ref().map(|payload| payload.shotmap.as_slice()),
        );

        let upserts = batch
            .players
            .iter()
            .map(|player| self.store.upsert_player(player));
        for result in future::join_all(upserts).await {
            result?;
        }

        let count = self.store.replace_match_events(match_id, &batch.events).await?;
        info!("Stored {} events for match {}", count, match_id);
        Ok(batch.failures)
    }

    /// Fetch a resource, mapping a 404 to "no data"
    async fn fetch_optional(&self, key: ResourceKey) -> Result<Option<Value>> {
        match self.source.fetch(key).await {
            Ok(payload) => Ok(Some(payload)),
            Err(FetchError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_store::{InMemoryMatchStore, Period};
    use serde_json::json;
    use std::collections::HashMap;

    struct StaticSource {
        payloads: HashMap<String, Value>,
    }

    impl StaticSource {
        fn new(entries: Vec<(ResourceKey, Value)>) -> Self {
            Self {
                payloads: entries
                    .into_iter()
                    .map(|(key, value)| (key.file_name(), value))
                    .collect(),
            }
        }
    }

    #[async_trait::async_trait]
    impl PayloadSource for StaticSource {
        async fn fetch(&self, key: ResourceKey) -> Result<Value, FetchError> {
            self.payloads
                .get(&key.file_name())
                .cloned()
                .ok_or(FetchError::NotFound)
        }
    }

    fn test_config() -> FetcherConfig {
        let mut config = FetcherConfig::default();
        config.sofascore.tournament_id = 8;
        config.sofascore.season_id = 32501;
        config.sofascore.first_round = 1;
        config.sofascore.last_round = 2;
        config.sofascore.pause_between_matches_ms = 0;
        config
    }

    fn round_listing() -> Value {
        json!({"events": [
            {
                "id": 8897222,
                "startTimestamp": 1600536600,
                "status": {"code": 100},
                "homeTeam": {"id": 2817, "name": "Valencia", "country": {"name": "Spain"}},
                "awayTeam": {"id": 2836, "name": "Levante", "country": {"name": "Spain"}},
                "homeScore": {"current": 4, "period1": 2},
                "awayScore": {"current": 2, "period1": 1},
                "roundInfo": {"round": 1},
                "tournament": {"name": "LaLiga", "category": {"name": "Spain"},
                               "uniqueTournament": {"id": 8, "name": "LaLiga"}},
                "season": {"id": 32501, "name": "LaLiga 20/21", "year": "20/21"}
            },
            {
                "id": 9000001,
                "status": {"code": 0},
                "homeTeam": {"id": 2817, "name": "Valencia"},
                "awayTeam": {"id": 2836, "name": "Levante"},
                "homeScore": {},
                "awayScore": {},
                "roundInfo": {"round": 1}
            }
        ]})
    }

    fn lineups() -> Value {
        json!({
            "confirmed": true,
            "home": {
                "formation": "4-4-2",
                "players": [
                    {"player": {"id": 44, "name": "Scorer",
                                "proposedMarketValueRaw": {"value": 20000000}},
                     "position": "F", "jerseyNumber": "9",
                     "statistics": {"minutesPlayed": 90, "rating": 7.8, "goals": 1}},
                    {"player": {"id": 45, "name": "Builder"},
                     "statistics": {"minutesPlayed": 90, "rating": 7.0}}
                ]
            },
            "away": {
                "formation": "4-3-3",
                "players": [
                    {"player": {"id": 99, "name": "Keeper"},
                     "position": "G",
                     "statistics": {"minutesPlayed": 90, "rating": 6.4, "saves": 5}}
                ]
            }
        })
    }

    fn statistics() -> Value {
        json!([
            {"period": "ALL", "groups": [{"groupName": "Overview", "statisticsItems": [
                {"name": "Ball possession", "home": "54%", "away": "46%"},
                {"name": "Passes", "home": "455/524 (87%)", "away": "301/392 (77%)"}
            ]}]},
            {"period": "1ST", "groups": [{"groupName": "Overview", "statisticsItems": [
                {"name": "Ball possession", "home": "60%", "away": "40%"}
            ]}]}
        ])
    }

    fn incidents() -> Value {
        json!({"incidents": [
            {"incidentType": "period", "text": "FT"},
            {"incidentType": "goal", "time": 23, "isHome": true, "goalType": "regular",
             "player": {"id": 44, "name": "Scorer"}},
            {"incidentType": "substitution", "time": 60, "isHome": false,
             "playerIn": {"id": 100, "name": "Fresh"}, "playerOut": {"id": 99, "name": "Keeper"}}
        ]})
    }

    fn shotmap() -> Value {
        json!({"shotmap": [
            {"incidentType": "shot", "time": 23, "isHome": true, "shotType": "goal",
             "situation": "assisted", "xg": 0.4, "player": {"id": 44, "name": "Scorer"}}
        ]})
    }

    fn full_source() -> Arc<StaticSource> {
        Arc::new(StaticSource::new(vec![
            (
                ResourceKey::RoundEvents { tournament_id: 8, season_id: 32501, round: 1 },
                round_listing(),
            ),
            (ResourceKey::Lineups { match_id: 8897222 }, lineups()),
            (ResourceKey::Statistics { match_id: 8897222 }, statistics()),
            (ResourceKey::Incidents { match_id: 8897222 }, incidents()),
            (ResourceKey::Shotmap { match_id: 8897222 }, shotmap()),
        ]))
    }

    #[tokio::test]
    async fn full_run_ingests_finished_matches_and_catalogs_the_rest() {
        let store = Arc::new(InMemoryMatchStore::new());
        let pipeline = IngestPipeline::new(test_config(), full_source(), store.clone());

        let report = pipeline.run().await.unwrap();
        assert_eq!(report.matches_processed, 1);
        assert_eq!(report.matches_failed, 0);

        // Both listed matches are cataloged, only the finished one has detail
        assert_eq!(store.match_count().await, 2);
        assert_eq!(store.tournament_count().await, 1);
        assert_eq!(store.season_count().await, 1);
        assert_eq!(store.team_count().await, 2);

        let fact = store.stored_match(8897222).await.unwrap();
        assert_eq!(fact.home_score, Some(4));
        assert_eq!(fact.round_number, Some(1));
        assert!(store.stored_match(9000001).await.unwrap().home_score.is_none());

        // Lineup phase
        let scorer_stats = store.player_stats(8897222, 44).await.unwrap();
        assert_eq!(scorer_stats.goals, 1);
        assert_eq!(scorer_stats.jersey_number, Some(9));
        assert!(store.stored_player(100).await.is_some());

        // Statistics phase: two periods, both sides
        let home_all = store.team_stats(8897222, 2817, Period::All).await.unwrap();
        assert_eq!(home_all.possession_percentage, Some(0.54));
        assert_eq!(home_all.passes_successful, 455);
        assert!(store.team_stats(8897222, 2836, Period::FirstHalf).await.is_some());
        assert!(store.team_stats(8897222, 2817, Period::SecondHalf).await.is_none());

        // Reconciler fills the ALL row only
        assert_eq!(home_all.formation.as_deref(), Some("4-4-2"));
        assert_eq!(home_all.average_team_rating, Some(7.4));
        assert_eq!(home_all.total_team_market_value_eur, Some(20000000));
        let home_first = store.team_stats(8897222, 2817, Period::FirstHalf).await.unwrap();
        assert_eq!(home_first.formation, None);

        // Event phase: period marker dropped, goal + substitution + shot kept
        let events = store.events(8897222).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, "goal");
        assert_eq!(events[2].event_type, "shot");
    }

    #[tokio::test]
    async fn rerunning_the_pipeline_does_not_duplicate_rows() {
        let store = Arc::new(InMemoryMatchStore::new());
        let pipeline = IngestPipeline::new(test_config(), full_source(), store.clone());

        pipeline.run().await.unwrap();
        let report = pipeline.run().await.unwrap();
        assert_eq!(report.matches_processed, 1);

        assert_eq!(store.match_count().await, 2);
        assert_eq!(store.team_count().await, 2);
        assert_eq!(store.events(8897222).await.len(), 3);
        let stats = store.player_stats(8897222, 44).await.unwrap();
        assert_eq!(stats.goals, 1);
    }

    #[tokio::test]
    async fn missing_detail_payloads_catalog_without_failing() {
        // Only the round listing exists; every per-match endpoint 404s
        let source = Arc::new(StaticSource::new(vec![(
            ResourceKey::RoundEvents { tournament_id: 8, season_id: 32501, round: 1 },
            round_listing(),
        )]));
        let store = Arc::new(InMemoryMatchStore::new());
        let pipeline = IngestPipeline::new(test_config(), source, store.clone());

        let report = pipeline.run().await.unwrap();
        assert_eq!(report.matches_processed, 1);
        assert_eq!(report.matches_failed, 0);
        assert_eq!(store.match_count().await, 2);
        assert!(store.player_stats(8897222, 44).await.is_none());
        assert!(store.events(8897222).await.is_empty());
    }

    #[tokio::test]
    async fn goal_without_scorer_marks_the_match_failed_but_keeps_rows() {
        let source = Arc::new(StaticSource::new(vec![
            (
                ResourceKey::RoundEvents { tournament_id: 8, season_id: 32501, round: 1 },
                round_listing(),
            ),
            (ResourceKey::Lineups { match_id: 8897222 }, lineups()),
            (ResourceKey::Statistics { match_id: 8897222 }, statistics()),
            (
                ResourceKey::Incidents { match_id: 8897222 },
                json!({"incidents": [
                    {"incidentType": "goal", "time": 81, "isHome": false}
                ]}),
            ),
        ]));
        let store = Arc::new(InMemoryMatchStore::new());
        let pipeline = IngestPipeline::new(test_config(), source, store.clone());

        let report = pipeline.run().await.unwrap();
        assert_eq!(report.matches_processed, 0);
        assert_eq!(report.matches_failed, 1);
        assert_eq!(report.failed_match_ids, vec![8897222]);

        // The base event and the other phases' rows are still there
        assert_eq!(store.events(8897222).await.len(), 1);
        assert!(store.player_stats(8897222, 44).await.is_some());
        assert!(store.team_stats(8897222, 2817, Period::All).await.is_some());
    }

    #[tokio::test]
    async fn backfill_requires_a_cataloged_match() {
        let store = Arc::new(InMemoryMatchStore::new());
        let source = Arc::new(StaticSource::new(vec![(
            ResourceKey::Incidents { match_id: 8897222 },
            incidents(),
        )]));
        let pipeline = IngestPipeline::new(test_config(), source, store.clone());

        assert!(!pipeline.backfill_events(8897222).await.unwrap());
        assert!(store.events(8897222).await.is_empty());
    }

    #[tokio::test]
    async fn backfill_replaces_events_for_a_known_match() {
        let store = Arc::new(InMemoryMatchStore::new());
        let pipeline = IngestPipeline::new(test_config(), full_source(), store.clone());
        pipeline.run().await.unwrap();

        assert!(pipeline.backfill_events(8897222).await.unwrap());
        assert_eq!(store.events(8897222).await.len(), 3);
    }
}

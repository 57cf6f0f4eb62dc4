//! In-memory match store
//!
//! Mirrors the Postgres writer's upsert and replace semantics over plain
//! maps. Used by pipeline tests and useful for dry runs against recorded
//! payloads without a database.

use crate::error::Result;
use crate::records::{
    MatchContext, MatchEventRecord, MatchRecord, Period, PlayerMatchStatsRecord, PlayerRecord,
    SeasonRecord, TeamAggregateUpdate, TeamMatchStatsRecord, TeamRecord, TournamentRecord,
};
use crate::store::MatchStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    tournaments: HashMap<i64, TournamentRecord>,
    seasons: HashMap<i64, SeasonRecord>,
    teams: HashMap<i64, TeamRecord>,
    players: HashMap<i64, PlayerRecord>,
    matches: HashMap<i64, MatchRecord>,
    player_stats: HashMap<(i64, i64), PlayerMatchStatsRecord>,
    team_stats: HashMap<(i64, i64, Period), TeamMatchStatsRecord>,
    events: HashMap<i64, Vec<(i64, MatchEventRecord)>>,
    next_event_id: i64,
}

/// Map-backed store with the same keying as the relational schema
pub struct InMemoryMatchStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_event_id: 1,
                ..Inner::default()
            })),
        }
    }

    pub async fn tournament_count(&self) -> usize {
        self.inner.lock().await.tournaments.len()
    }

    pub async fn season_count(&self) -> usize {
        self.inner.lock().await.seasons.len()
    }

    pub async fn team_count(&self) -> usize {
        self.inner.lock().await.teams.len()
    }

    pub async fn player_count(&self) -> usize {
        self.inner.lock().await.players.len()
    }

    pub async fn match_count(&self) -> usize {
        self.inner.lock().await.matches.len()
    }

    pub async fn stored_match(&self, match_id: i64) -> Option<MatchRecord> {
        self.inner.lock().await.matches.get(&match_id).cloned()
    }

    pub async fn stored_player(&self, player_id: i64) -> Option<PlayerRecord> {
        self.inner.lock().await.players.get(&player_id).cloned()
    }

    pub async fn player_stats(
        &self,
        match_id: i64,
        player_id: i64,
    ) -> Option<PlayerMatchStatsRecord> {
        self.inner
            .lock()
            .await
            .player_stats
            .get(&(match_id, player_id))
            .cloned()
    }

    pub async fn team_stats(
        &self,
        match_id: i64,
        team_id: i64,
        period: Period,
    ) -> Option<TeamMatchStatsRecord> {
        self.inner
            .lock()
            .await
            .team_stats
            .get(&(match_id, team_id, period))
            .cloned()
    }

    /// Stored events for a match, in insertion order
    pub async fn events(&self, match_id: i64) -> Vec<MatchEventRecord> {
        self.inner
            .lock()
            .await
            .events
            .get(&match_id)
            .map(|rows| rows.iter().map(|(_, event)| event.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryMatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn upsert_tournament(&self, tournament: &TournamentRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .tournaments
            .insert(tournament.tournament_id, tournament.clone());
        Ok(())
    }

    async fn upsert_season(&self, season: &SeasonRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.seasons.insert(season.season_id, season.clone());
        Ok(())
    }

    async fn upsert_team(&self, team: &TeamRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.teams.insert(team.team_id, team.clone());
        Ok(())
    }

    async fn upsert_player(&self, player: &PlayerRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.players.insert(player.player_id, player.clone());
        Ok(())
    }

    async fn upsert_match(&self, record: &MatchRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.matches.insert(record.match_id, record.clone());
        Ok(())
    }

    async fn upsert_player_stats(&self, rows: &[PlayerMatchStatsRecord]) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        for row in rows {
            inner
                .player_stats
                .insert((row.match_id, row.player_id), row.clone());
        }
        Ok(rows.len())
    }

    async fn upsert_team_stats(&self, rows: &[TeamMatchStatsRecord]) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        for row in rows {
            inner
                .team_stats
                .insert((row.match_id, row.team_id, row.period), row.clone());
        }
        Ok(rows.len())
    }

    async fn replace_match_events(
        &self,
        match_id: i64,
        events: &[MatchEventRecord],
    ) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let mut stored = Vec::with_capacity(events.len());
        for event in events {
            let event_id = inner.next_event_id;
            inner.next_event_id += 1;
            stored.push((event_id, event.clone()));
        }
        inner.events.insert(match_id, stored);
        Ok(events.len())
    }

    async fn update_team_aggregates(&self, update: &TeamAggregateUpdate) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner
            .team_stats
            .get_mut(&(update.match_id, update.team_id, Period::All))
        {
            Some(row) => {
                row.formation = update.formation.clone();
                row.average_team_rating = update.average_rating;
                row.total_team_market_value_eur = Some(update.total_market_value_eur);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn match_context(&self, match_id: i64) -> Result<Option<MatchContext>> {
        let inner = self.inner.lock().await;
        Ok(inner.matches.get(&match_id).map(|record| MatchContext {
            season_id: record.season_id,
            round_number: record.round_number,
            kickoff_utc: record.kickoff_utc,
            home_team_id: record.home_team_id,
            away_team_id: record.away_team_id,
        }))
    }
}

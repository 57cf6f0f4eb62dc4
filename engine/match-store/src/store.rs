//! Storage contract for the ingestion pipeline
//!
//! Every write is idempotent: dimensions and facts upsert on their primary
//! key ("insert, on conflict do update all mutable columns"), stat batches
//! upsert on their natural keys, and events are replaced per match inside
//! one transaction. Re-running ingestion for a match converges on the same
//! final state.

use crate::error::Result;
use crate::records::{
    MatchContext, MatchEventRecord, MatchRecord, PlayerMatchStatsRecord, PlayerRecord,
    SeasonRecord, TeamAggregateUpdate, TeamMatchStatsRecord, TeamRecord, TournamentRecord,
};

/// Abstract storage backend for normalized match records
#[async_trait::async_trait]
pub trait MatchStore: Send + Sync {
    /// Upsert a tournament dimension row
    async fn upsert_tournament(&self, tournament: &TournamentRecord) -> Result<()>;

    /// Upsert a season dimension row
    async fn upsert_season(&self, season: &SeasonRecord) -> Result<()>;

    /// Upsert a team dimension row
    async fn upsert_team(&self, team: &TeamRecord) -> Result<()>;

    /// Upsert a player dimension row
    async fn upsert_player(&self, player: &PlayerRecord) -> Result<()>;

    /// Upsert the match fact row. Must complete before any of the match's
    /// stat or event rows are written.
    async fn upsert_match(&self, record: &MatchRecord) -> Result<()>;

    /// Batch upsert player stat rows keyed by (match_id, player_id).
    /// Returns the number of rows written.
    async fn upsert_player_stats(&self, rows: &[PlayerMatchStatsRecord]) -> Result<usize>;

    /// Batch upsert team stat rows keyed by (match_id, team_id, period).
    /// Returns the number of rows written.
    async fn upsert_team_stats(&self, rows: &[TeamMatchStatsRecord]) -> Result<usize>;

    /// Replace all events for a match: delete existing rows, then insert the
    /// given set, base row first (the generated event_id is the detail row's
    /// foreign key). Runs in one transaction so a re-ingested match never
    /// holds a partial mix of old and new events. Returns the number of base
    /// events inserted.
    async fn replace_match_events(&self, match_id: i64, events: &[MatchEventRecord])
        -> Result<usize>;

    /// Targeted update of the (match_id, team_id, period='ALL') stat row with
    /// reconciled aggregates. Returns false when no such row exists.
    async fn update_team_aggregates(&self, update: &TeamAggregateUpdate) -> Result<bool>;

    /// Read back the stored match fact, for reprocessing paths that start
    /// from a bare match id
    async fn match_context(&self, match_id: i64) -> Result<Option<MatchContext>>;
}

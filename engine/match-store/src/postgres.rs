//! Postgres-backed match store
//!
//! Runtime-bound sqlx queries; the wide stat upserts are generated from the
//! column tables in `records` so the bind order has a single source of truth.
//! Apply `schema.sql` to the target database before first use.

use crate::error::{Result, StoreError};
use crate::records::{
    EventDetail, MatchContext, MatchEventRecord, MatchRecord, PlayerMatchStatsRecord,
    PlayerRecord, SeasonRecord, TeamAggregateUpdate, TeamMatchStatsRecord, TeamRecord,
    TournamentRecord, PLAYER_STAT_COLUMNS, PLAYER_STAT_KEY, TEAM_STAT_COLUMNS, TEAM_STAT_KEY,
};
use crate::store::MatchStore;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::debug;

/// Build an idempotent upsert statement from a column table
fn upsert_sql(table: &str, columns: &[&str], key: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|column| !key.contains(column))
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
        columns.join(", "),
        placeholders.join(", "),
        key.join(", "),
        updates.join(", "),
    )
}

/// Bind a player stat row in `PLAYER_STAT_COLUMNS` order
fn bind_player_stats<'q>(
    query: Query<'q, Postgres, PgArguments>,
    row: &'q PlayerMatchStatsRecord,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(row.match_id)
        .bind(row.player_id)
        .bind(row.team_id)
        .bind(row.is_substitute)
        .bind(row.played_position.as_deref())
        .bind(row.jersey_number)
        .bind(row.market_value_eur)
        .bind(row.rating)
        .bind(row.minutes_played)
        .bind(row.touches)
        .bind(row.goals)
        .bind(row.assists)
        .bind(row.own_goals)
        .bind(row.passes_accurate)
        .bind(row.passes_total)
        .bind(row.passes_key)
        .bind(row.long_balls_accurate)
        .bind(row.long_balls_total)
        .bind(row.crosses_accurate)
        .bind(row.crosses_total)
        .bind(row.shots_total)
        .bind(row.shots_on_target)
        .bind(row.shots_off_target)
        .bind(row.shots_blocked_by_opponent)
        .bind(row.dribbles_successful)
        .bind(row.dribbles_attempts)
        .bind(row.possession_lost)
        .bind(row.dispossessed)
        .bind(row.duels_won)
        .bind(row.duels_lost)
        .bind(row.aerials_won)
        .bind(row.aerials_lost)
        .bind(row.ground_duels_won)
        .bind(row.ground_duels_total)
        .bind(row.tackles)
        .bind(row.interceptions)
        .bind(row.clearances)
        .bind(row.shots_blocked_by_player)
        .bind(row.dribbled_past)
        .bind(row.fouls_committed)
        .bind(row.fouls_suffered)
        .bind(row.saves)
        .bind(row.punches_made)
        .bind(row.high_claims)
        .bind(row.saves_inside_box)
        .bind(row.sweeper_keeper_successful)
        .bind(row.sweeper_keeper_total)
        .bind(row.expected_goals)
        .bind(row.expected_assists)
}

/// Bind a team stat row in `TEAM_STAT_COLUMNS` order
fn bind_team_stats<'q>(
    query: Query<'q, Postgres, PgArguments>,
    row: &'q TeamMatchStatsRecord,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(row.match_id)
        .bind(row.team_id)
        .bind(row.is_home_team)
        .bind(row.period.as_str())
        .bind(row.formation.as_deref())
        .bind(row.average_team_rating)
        .bind(row.total_team_market_value_eur)
        .bind(row.possession_percentage)
        .bind(row.big_chances)
        .bind(row.total_shots)
        .bind(row.saves)
        .bind(row.corners)
        .bind(row.fouls)
        .bind(row.passes_successful)
        .bind(row.passes_total)
        .bind(row.passes_percentage)
        .bind(row.tackles_successful)
        .bind(row.tackles_total)
        .bind(row.tackles_won_percentage)
        .bind(row.free_kicks)
        .bind(row.yellow_cards)
        .bind(row.red_cards)
        .bind(row.shots_on_target)
        .bind(row.hit_woodwork)
        .bind(row.shots_off_target)
        .bind(row.blocked_shots)
        .bind(row.shots_inside_box)
        .bind(row.shots_outside_box)
        .bind(row.big_chances_missed)
        .bind(row.fouled_final_third)
        .bind(row.offsides)
        .bind(row.accurate_passes_percentage)
        .bind(row.throw_ins)
        .bind(row.final_third_entries)
        .bind(row.long_balls_successful)
        .bind(row.long_balls_total)
        .bind(row.long_balls_percentage)
        .bind(row.crosses_successful)
        .bind(row.crosses_total)
        .bind(row.crosses_percentage)
        .bind(row.duels_won_successful)
        .bind(row.duels_won_total)
        .bind(row.duels_won_percentage)
        .bind(row.dispossessed)
        .bind(row.ground_duels_successful)
        .bind(row.ground_duels_total)
        .bind(row.ground_duels_percentage)
        .bind(row.aerial_duels_successful)
        .bind(row.aerial_duels_total)
        .bind(row.aerial_duels_percentage)
        .bind(row.dribbles_successful)
        .bind(row.dribbles_total)
        .bind(row.dribbles_percentage)
        .bind(row.interceptions)
        .bind(row.clearances)
        .bind(row.goal_kicks)
}

/// Relational store backed by a Postgres connection pool
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    /// Connect a new pool against the given database URL
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        if max_connections == 0 {
            return Err(StoreError::config("max_connections must be at least 1"));
        }
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!("Connected to match store at {} connections", max_connections);
        Ok(Self { pool })
    }

    /// Wrap an existing pool (shared with other services)
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl MatchStore for PgMatchStore {
    async fn upsert_tournament(&self, tournament: &TournamentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tournaments (tournament_id, name, country)
            VALUES ($1, $2, $3)
            ON CONFLICT (tournament_id) DO UPDATE SET
                name = EXCLUDED.name,
                country = EXCLUDED.country
            "#,
        )
        .bind(tournament.tournament_id)
        .bind(tournament.name.as_str())
        .bind(tournament.country.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_season(&self, season: &SeasonRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seasons (season_id, tournament_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (season_id) DO UPDATE SET
                tournament_id = EXCLUDED.tournament_id,
                name = EXCLUDED.name
            "#,
        )
        .bind(season.season_id)
        .bind(season.tournament_id)
        .bind(season.name.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_team(&self, team: &TeamRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO teams (team_id, name, country)
            VALUES ($1, $2, $3)
            ON CONFLICT (team_id) DO UPDATE SET
                name = EXCLUDED.name,
                country = EXCLUDED.country
            "#,
        )
        .bind(team.team_id)
        .bind(team.name.as_str())
        .bind(team.country.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_player(&self, player: &PlayerRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO players (player_id, name, height_cm, primary_position, country)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (player_id) DO UPDATE SET
                name = EXCLUDED.name,
                height_cm = EXCLUDED.height_cm,
                primary_position = EXCLUDED.primary_position,
                country = EXCLUDED.country
            "#,
        )
        .bind(player.player_id)
        .bind(player.name.as_str())
        .bind(player.height_cm)
        .bind(player.primary_position.as_deref())
        .bind(player.country.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_match(&self, record: &MatchRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO matches (match_id, season_id, round_number, kickoff_utc,
                                 home_team_id, away_team_id, home_score, away_score,
                                 home_score_ht, away_score_ht)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (match_id) DO UPDATE SET
                season_id = EXCLUDED.season_id,
                round_number = EXCLUDED.round_number,
                kickoff_utc = EXCLUDED.kickoff_utc,
                home_team_id = EXCLUDED.home_team_id,
                away_team_id = EXCLUDED.away_team_id,
                home_score = EXCLUDED.home_score,
                away_score = EXCLUDED.away_score,
                home_score_ht = EXCLUDED.home_score_ht,
                away_score_ht = EXCLUDED.away_score_ht
            "#,
        )
        .bind(record.match_id)
        .bind(record.season_id)
        .bind(record.round_number)
        .bind(record.kickoff_utc)
        .bind(record.home_team_id)
        .bind(record.away_team_id)
        .bind(record.home_score)
        .bind(record.away_score)
        .bind(record.home_score_ht)
        .bind(record.away_score_ht)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_player_stats(&self, rows: &[PlayerMatchStatsRecord]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = upsert_sql("player_match_stats", PLAYER_STAT_COLUMNS, PLAYER_STAT_KEY);
        for row in rows {
            bind_player_stats(sqlx::query(&sql), row).execute(&self.pool).await?;
        }
        debug!("Upserted {} player stat rows for match {}", rows.len(), rows[0].match_id);
        Ok(rows.len())
    }

    async fn upsert_team_stats(&self, rows: &[TeamMatchStatsRecord]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = upsert_sql("team_match_stats", TEAM_STAT_COLUMNS, TEAM_STAT_KEY);
        for row in rows {
            bind_team_stats(sqlx::query(&sql), row).execute(&self.pool).await?;
        }
        debug!("Upserted {} team stat rows for match {}", rows.len(), rows[0].match_id);
        Ok(rows.len())
    }

    async fn replace_match_events(
        &self,
        match_id: i64,
        events: &[MatchEventRecord],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        // Sub-records cascade via their event_id foreign keys
        sqlx::query("DELETE FROM match_event_base WHERE match_id = $1")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        for event in events {
            let event_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO match_event_base (match_id, minute, event_type, team_id, player_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING event_id
                "#,
            )
            .bind(event.match_id)
            .bind(event.minute)
            .bind(event.event_type.as_str())
            .bind(event.team_id)
            .bind(event.player_id)
            .fetch_one(&mut *tx)
            .await?;

            match &event.detail {
                Some(EventDetail::Goal(goal)) => {
                    sqlx::query(
                        r#"
                        INSERT INTO goal_events (event_id, scoring_player_id, assist_player_id,
                                                 goal_type, body_part)
                        VALUES ($1, $2, $3, $4, $5)
                        "#,
                    )
                    .bind(event_id)
                    .bind(goal.scoring_player_id)
                    .bind(goal.assist_player_id)
                    .bind(goal.goal_type.as_deref())
                    .bind(goal.body_part.as_deref())
                    .execute(&mut *tx)
                    .await?;
                }
                Some(EventDetail::Card(card)) => {
                    sqlx::query(
                        r#"
                        INSERT INTO card_events (event_id, card_type, reason, is_rescinded)
                        VALUES ($1, $2, $3, $4)
                        "#,
                    )
                    .bind(event_id)
                    .bind(card.card_type.as_str())
                    .bind(card.reason.as_deref())
                    .bind(card.is_rescinded)
                    .execute(&mut *tx)
                    .await?;
                }
                Some(EventDetail::Substitution(sub)) => {
                    sqlx::query(
                        r#"
                        INSERT INTO substitution_events (event_id, player_in_id, player_out_id)
                        VALUES ($1, $2, $3)
                        "#,
                    )
                    .bind(event_id)
                    .bind(sub.player_in_id)
                    .bind(sub.player_out_id)
                    .execute(&mut *tx)
                    .await?;
                }
                Some(EventDetail::VarDecision(var)) => {
                    sqlx::query(
                        r#"
                        INSERT INTO var_decision_events (event_id, decision_type, decision_outcome)
                        VALUES ($1, $2, $3)
                        "#,
                    )
                    .bind(event_id)
                    .bind(var.decision_type.as_str())
                    .bind(var.decision_outcome.as_deref())
                    .execute(&mut *tx)
                    .await?;
                }
                Some(EventDetail::Shot(shot)) => {
                    sqlx::query(
                        r#"
                        INSERT INTO shot_events (event_id, shooter_player_id, outcome, situation,
                                                 body_part, xg, xgot, player_coord_x, player_coord_y,
                                                 goal_mouth_location, goal_mouth_coord_x,
                                                 goal_mouth_coord_y, goal_mouth_coord_z,
                                                 block_coord_x, block_coord_y, goalkeeper_id,
                                                 added_time)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                                $16, $17)
                        "#,
                    )
                    .bind(event_id)
                    .bind(shot.shooter_player_id)
                    .bind(shot.outcome.as_deref())
                    .bind(shot.situation.as_deref())
                    .bind(shot.body_part.as_deref())
                    .bind(shot.xg)
                    .bind(shot.xgot)
                    .bind(shot.player_coord_x)
                    .bind(shot.player_coord_y)
                    .bind(shot.goal_mouth_location.as_deref())
                    .bind(shot.goal_mouth_coord_x)
                    .bind(shot.goal_mouth_coord_y)
                    .bind(shot.goal_mouth_coord_z)
                    .bind(shot.block_coord_x)
                    .bind(shot.block_coord_y)
                    .bind(shot.goalkeeper_id)
                    .bind(shot.added_time)
                    .execute(&mut *tx)
                    .await?;

                    if shot.missed_penalty {
                        sqlx::query(
                            "INSERT INTO missed_penalty_events (event_id, outcome) VALUES ($1, $2)",
                        )
                        .bind(event_id)
                        .bind("missed")
                        .execute(&mut *tx)
                        .await?;
                    }
                }
                None => {}
            }
        }

        tx.commit().await?;
        debug!("Replaced events for match {}: {} base rows", match_id, events.len());
        Ok(events.len())
    }

    async fn update_team_aggregates(&self, update: &TeamAggregateUpdate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE team_match_stats
            SET formation = $1,
                average_team_rating = $2,
                total_team_market_value_eur = $3
            WHERE match_id = $4 AND team_id = $5 AND period = 'ALL'
            "#,
        )
        .bind(update.formation.as_deref())
        .bind(update.average_rating)
        .bind(update.total_market_value_eur)
        .bind(update.match_id)
        .bind(update.team_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn match_context(&self, match_id: i64) -> Result<Option<MatchContext>> {
        let row: Option<(i64, Option<i32>, Option<DateTime<Utc>>, i64, i64)> = sqlx::query_as(
            r#"
            SELECT season_id, round_number, kickoff_utc, home_team_id, away_team_id
            FROM matches
            WHERE match_id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(season_id, round_number, kickoff_utc, home_team_id, away_team_id)| MatchContext {
                season_id,
                round_number,
                kickoff_utc,
                home_team_id,
                away_team_id,
            },
        ))
    }
}

//! # Match Store
//!
//! This crate provides the storage layer for the football match ingestion
//! engine. It maps extracted match data onto a relational schema with
//! idempotent upserts keyed on source identifiers, so reruns refresh rows
//! instead of duplicating them.
//!
//! ## Architecture
//!
//! - **MatchStore**: Abstract trait for the storage operations
//! - **PgMatchStore**: Postgres implementation (apply `schema.sql` first)
//! - **InMemoryMatchStore**: Map-backed implementation for tests and dry runs
//! - **records**: Row structs and the column tables the upsert SQL is built from
//!
//! ## Usage
//!
//! ```rust
//! use match_store::{InMemoryMatchStore, MatchStore, TeamRecord};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryMatchStore::new();
//!     let team = TeamRecord {
//!         team_id: 2817,
//!         name: "Valencia".to_string(),
//!         country: Some("Spain".to_string()),
//!     };
//!     store.upsert_team(&team).await?;
//!     // second upsert refreshes the same row
//!     store.upsert_team(&team).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryMatchStore;
pub use postgres::PgMatchStore;
pub use records::{
    CardDetail, EventDetail, GoalDetail, MatchContext, MatchEventRecord, MatchRecord, Period,
    PlayerMatchStatsRecord, PlayerRecord, SeasonRecord, ShotDetail, SubstitutionDetail,
    TeamAggregateUpdate, TeamMatchStatsRecord, TeamRecord, TournamentRecord, VarDecisionDetail,
    PERIODS, PLAYER_STAT_COLUMNS, PLAYER_STAT_KEY, TEAM_STAT_COLUMNS, TEAM_STAT_KEY,
};
pub use store::MatchStore;

/// Re-export common types for convenience
pub use chrono::{DateTime, Utc};

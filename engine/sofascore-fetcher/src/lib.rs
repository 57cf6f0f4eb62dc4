//! Sofascore Fetcher Service
//!
//! This service fetches football match data from the Sofascore API and stores
//! it through the match-store crate. It walks a configured round range,
//! catalogs every listed match and fully ingests the finished ones: lineups,
//! per-player statistics, team statistics by period, and the match timeline.

pub mod config;
pub mod events;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod players;
pub mod reconcile;
pub mod teams;

pub use config::{DatabaseConfig, FetcherConfig, SofascoreConfig};
pub use fetch::{FetchError, HttpPayloadSource, PayloadSource, ReplayPayloadSource, ResourceKey};
pub use models::*;
pub use pipeline::{IngestPipeline, IngestReport};

//! Payload fetch layer
//!
//! The ingestion pipeline never talks HTTP directly; it asks a
//! [`PayloadSource`] for the document behind a [`ResourceKey`] and gets back
//! JSON or a typed error. The HTTP implementation handles the quirks of the
//! live API, the replay implementation reads previously dumped files so the
//! pipeline can run offline.

use crate::config::SofascoreConfig;
use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// One fetchable document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// Event listing for one round of a season
    RoundEvents { tournament_id: i64, season_id: i64, round: u32 },
    /// Lineups with per-player statistics
    Lineups { match_id: i64 },
    /// Team statistics by period
    Statistics { match_id: i64 },
    /// Incident timeline (goals, cards, substitutions, VAR)
    Incidents { match_id: i64 },
    /// Shot-by-shot map
    Shotmap { match_id: i64 },
}

impl ResourceKey {
    /// URL path below the API root
    pub fn path(&self) -> String {
        match self {
            ResourceKey::RoundEvents { tournament_id, season_id, round } => format!(
                "unique-tournament/{tournament_id}/season/{season_id}/events/round/{round}"
            ),
            ResourceKey::Lineups { match_id } => format!("event/{match_id}/lineups"),
            ResourceKey::Statistics { match_id } => format!("event/{match_id}/statistics"),
            ResourceKey::Incidents { match_id } => format!("event/{match_id}/incidents"),
            ResourceKey::Shotmap { match_id } => format!("event/{match_id}/shotmap"),
        }
    }

    /// Stable file name used by the payload dumper and the replay source
    pub fn file_name(&self) -> String {
        match self {
            ResourceKey::RoundEvents { tournament_id, season_id, round } => {
                format!("round-{tournament_id}-{season_id}-{round}.json")
            }
            ResourceKey::Lineups { match_id } => format!("lineups-{match_id}.json"),
            ResourceKey::Statistics { match_id } => format!("statistics-{match_id}.json"),
            ResourceKey::Incidents { match_id } => format!("incidents-{match_id}.json"),
            ResourceKey::Shotmap { match_id } => format!("shotmap-{match_id}.json"),
        }
    }
}

/// Typed fetch failure, mirroring the source's error codes
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("access denied by source (403)")]
    Forbidden,

    #[error("resource not found (404)")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    #[error("request failed with status {0}")]
    Http(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Source of raw JSON payloads
#[async_trait::async_trait]
pub trait PayloadSource: Send + Sync {
    async fn fetch(&self, key: ResourceKey) -> Result<Value, FetchError>;
}

/// Live HTTP source
pub struct HttpPayloadSource {
    client: Client,
    base_url: String,
}

impl HttpPayloadSource {
    pub fn new(config: &SofascoreConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl PayloadSource for HttpPayloadSource {
    async fn fetch(&self, key: ResourceKey) -> Result<Value, FetchError> {
        let url = format!("{}/{}", self.base_url, key.path());
        debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Transport(e)
            }
        })?;

        match response.status().as_u16() {
            200 => {}
            403 => return Err(FetchError::Forbidden),
            404 => return Err(FetchError::NotFound),
            408 => return Err(FetchError::Timeout),
            status => return Err(FetchError::Http(status)),
        }

        let mut payload: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        // The statistics endpoint wraps the period list in a "statistics" key;
        // everything downstream works on the list itself.
        if matches!(key, ResourceKey::Statistics { .. }) {
            payload = match payload.get_mut("statistics") {
                Some(list) if list.is_array() => list.take(),
                _ => {
                    return Err(FetchError::Malformed(
                        "statistics key missing or not a list".to_string(),
                    ))
                }
            };
        }

        Ok(payload)
    }
}

/// Replay source reading files produced by the payload dumper.
///
/// Each file holds exactly what [`PayloadSource::fetch`] would return for the
/// key (for statistics, the unwrapped period list). A missing file maps to
/// [`FetchError::NotFound`], same as a 404 from the live API.
pub struct ReplayPayloadSource {
    root: PathBuf,
}

impl ReplayPayloadSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl PayloadSource for ReplayPayloadSource {
    async fn fetch(&self, key: ResourceKey) -> Result<Value, FetchError> {
        let path = self.root.join(key.file_name());
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| FetchError::NotFound)?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_paths_match_api_layout() {
        let round = ResourceKey::RoundEvents { tournament_id: 8, season_id: 32501, round: 1 };
        assert_eq!(round.path(), "unique-tournament/8/season/32501/events/round/1");
        assert_eq!(
            ResourceKey::Lineups { match_id: 8897222 }.path(),
            "event/8897222/lineups"
        );
        assert_eq!(
            ResourceKey::Shotmap { match_id: 8897222 }.path(),
            "event/8897222/shotmap"
        );
    }

    #[test]
    fn file_names_are_distinct_per_key() {
        let keys = [
            ResourceKey::RoundEvents { tournament_id: 8, season_id: 32501, round: 1 },
            ResourceKey::Lineups { match_id: 1 },
            ResourceKey::Statistics { match_id: 1 },
            ResourceKey::Incidents { match_id: 1 },
            ResourceKey::Shotmap { match_id: 1 },
        ];
        let names: std::collections::HashSet<String> =
            keys.iter().map(|key| key.file_name()).collect();
        assert_eq!(names.len(), keys.len());
    }

    #[tokio::test]
    async fn replay_source_reads_dumped_files() {
        let dir = tempfile::tempdir().unwrap();
        let key = ResourceKey::Lineups { match_id: 42 };
        std::fs::write(dir.path().join(key.file_name()), r#"{"confirmed":true}"#).unwrap();

        let source = ReplayPayloadSource::new(dir.path());
        let payload = source.fetch(key).await.unwrap();
        assert_eq!(payload["confirmed"], true);

        let missing = source.fetch(ResourceKey::Lineups { match_id: 43 }).await;
        assert!(matches!(missing, Err(FetchError::NotFound)));
    }
}

use match_store::PgMatchStore;
use sofascore_fetcher::{FetcherConfig, HttpPayloadSource, IngestPipeline};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; RUST_LOG overrides the info default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Sofascore Fetcher Service");

    let config = FetcherConfig::from_env()?;
    info!(
        "Ingesting tournament {} season {}, rounds {}..={}",
        config.sofascore.tournament_id,
        config.sofascore.season_id,
        config.sofascore.first_round,
        config.sofascore.last_round
    );

    let source = Arc::new(HttpPayloadSource::new(&config.sofascore)?);
    let store = Arc::new(
        PgMatchStore::connect(&config.database.url, config.database.max_connections).await?,
    );

    let pipeline = IngestPipeline::new(config, source, store);
    let report = pipeline.run().await?;

    if !report.failed_match_ids.is_empty() {
        error!(
            "Run finished with {} failed matches: {:?}",
            report.matches_failed, report.failed_match_ids
        );
    }
    Ok(())
}

use anyhow::Result;
use clap::Parser;
use match_store::PgMatchStore;
use sofascore_fetcher::{FetcherConfig, HttpPayloadSource, IngestPipeline};
use std::sync::Arc;
use std::time::Duration;

/// Re-fetch incidents and shotmaps for matches that are already cataloged
#[derive(Parser)]
#[command(name = "backfill-events")]
#[command(about = "Re-run the timeline phase for cataloged matches")]
struct Cli {
    /// Match ids to backfill
    #[arg(required = true)]
    match_ids: Vec<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = FetcherConfig::from_env()?;

    let source = Arc::new(HttpPayloadSource::new(&config.sofascore)?);
    let store = Arc::new(
        PgMatchStore::connect(&config.database.url, config.database.max_connections).await?,
    );
    let pause_ms = config.sofascore.pause_between_matches_ms;
    let pipeline = IngestPipeline::new(config, source, store);

    println!("🔄 Backfilling events for {} matches", cli.match_ids.len());

    let mut clean = 0usize;
    for (index, match_id) in cli.match_ids.iter().enumerate() {
        match pipeline.backfill_events(*match_id).await {
            Ok(true) => {
                clean += 1;
                println!("✅ Match {} backfilled", match_id);
            }
            Ok(false) => println!("⚠️ Match {} incomplete, see warnings above", match_id),
            Err(e) => println!("❌ Match {} failed: {}", match_id, e),
        }

        if pause_ms > 0 && index + 1 < cli.match_ids.len() {
            tokio::time::sleep(Duration::from_millis(pause_ms)).await;
        }
    }

    println!("🎉 Done: {}/{} matches clean", clean, cli.match_ids.len());
    Ok(())
}

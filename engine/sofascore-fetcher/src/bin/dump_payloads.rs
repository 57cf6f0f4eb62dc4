use anyhow::Result;
use clap::Parser;
use sofascore_fetcher::{FetchError, FetcherConfig, HttpPayloadSource, PayloadSource, ResourceKey};
use std::path::PathBuf;
use std::time::Duration;

/// Dump raw API payloads to disk for offline replay.
///
/// The files land under the output directory named the way
/// `ReplayPayloadSource` expects, so a dumped directory can drive a full
/// ingest run without touching the network.
#[derive(Parser)]
#[command(name = "dump-payloads")]
#[command(about = "Dump Sofascore payloads for offline replay")]
struct Cli {
    /// Directory the payload files are written to
    #[arg(short, long, default_value = "./payload_dumps")]
    out_dir: PathBuf,

    /// Also dump the round listings for the configured round range
    #[arg(long)]
    rounds: bool,

    /// Match ids whose detail payloads get dumped
    match_ids: Vec<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = FetcherConfig::from_env()?;
    let source = HttpPayloadSource::new(&config.sofascore)?;

    tokio::fs::create_dir_all(&cli.out_dir).await?;

    let mut keys = Vec::new();
    if cli.rounds {
        for round in config.sofascore.first_round..=config.sofascore.last_round {
            keys.push(ResourceKey::RoundEvents {
                tournament_id: config.sofascore.tournament_id,
                season_id: config.sofascore.season_id,
                round,
            });
        }
    }
    for &match_id in &cli.match_ids {
        keys.push(ResourceKey::Lineups { match_id });
        keys.push(ResourceKey::Statistics { match_id });
        keys.push(ResourceKey::Incidents { match_id });
        keys.push(ResourceKey::Shotmap { match_id });
    }

    if keys.is_empty() {
        println!("Nothing to dump; pass match ids or --rounds");
        return Ok(());
    }

    println!("🔄 Dumping {} payloads to {}", keys.len(), cli.out_dir.display());

    let pause_ms = config.sofascore.pause_between_matches_ms;
    let mut written = 0usize;
    for (index, key) in keys.iter().enumerate() {
        match source.fetch(*key).await {
            Ok(payload) => {
                let path = cli.out_dir.join(key.file_name());
                tokio::fs::write(&path, serde_json::to_vec_pretty(&payload)?).await?;
                written += 1;
                println!("✅ {}", path.display());
            }
            Err(FetchError::NotFound) => {
                println!("⚠️ {} has no data", key.file_name());
            }
            Err(e) => {
                println!("❌ {} failed: {}", key.file_name(), e);
            }
        }

        if pause_ms > 0 && index + 1 < keys.len() {
            tokio::time::sleep(Duration::from_millis(pause_ms)).await;
        }
    }

    println!("🎉 Wrote {}/{} payload files", written, keys.len());
    Ok(())
}

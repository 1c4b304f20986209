//! Roulette feed ingestion service.
//!
//! Resolves a working feed endpoint, polls every configured roulette table
//! once per pass and persists the latest distinct result set per table.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use roulette_feed::config::IngestConfig;
use roulette_feed::gate::DedupGate;
use roulette_feed::storage::{create_storage_channel, ResultReader};
use roulette_feed::supervisor::Supervisor;

/// Log file location, relative to the working directory
const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "roulette_feed.log";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging with both stdout and file output
    std::fs::create_dir_all(LOG_DIR).context("Failed to create log directory")?;
    let file_appender = tracing_appender::rolling::never(LOG_DIR, LOG_FILE);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("roulette_feed=info".parse()?);

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let config = IngestConfig::from_env()?;

    info!("Roulette feed ingestion v{}", env!("CARGO_PKG_VERSION"));
    info!("   Polled games: {}", config.games.poll().len());
    info!("   Database: {}", config.db_path);
    info!("   Provider tag: {}", config.directory.provider_tag);
    if config.directory.base_url.is_none() || config.directory.api_key.is_none() {
        warn!("   SUPABASE_URL/SUPABASE_KEY not set, directory lookups will come back empty");
    }

    let storage = create_storage_channel(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path))?;

    let mut gate = DedupGate::new(config.games.clone(), storage.clone());
    if config.seed_from_store {
        let rows = ResultReader::new(config.db_path.clone())
            .fetch_all()
            .context("Failed to read stored results for seeding")?;
        let seeded = gate.seed(&rows);
        info!("[GATE] Seeded last-seen results for {} game(s)", seeded);
    }

    let supervisor = Supervisor::new(config, gate);

    tokio::select! {
        _ = supervisor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    storage.flush().await.ok();
    storage.shutdown();
    Ok(())
}

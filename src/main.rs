use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use roster_sync::cli::{self, Cli};
use roster_sync::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(true)
        .init();

    let args = Cli::parse();
    let cfg = Config::from_env();
    tracing::info!(
        base_id = %cfg.airtable_base_id,
        snapshot_dir = %cfg.snapshot_dir,
        chunk_size = cfg.chunk_size,
        "Loaded configuration"
    );

    cli::run(args, cfg).await
}

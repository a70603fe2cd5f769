use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::models::*;
use crate::schema::{ensure_tables, SetupAction};
use crate::storage::SnapshotStore;
use crate::sync::SyncEngine;
use crate::clients::AirtableClient;

#[derive(Debug, Parser)]
#[command(name = "roster-sync", about = "Reconcile iClassPro roster snapshots into Airtable")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sync a snapshot into the configured base
    Sync {
        /// Snapshot file; defaults to the newest one in the snapshot directory
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },
    /// Print the path of the newest snapshot
    Latest {
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },
    /// Create any missing tables
    SetupTables,
}

fn snapshot_store(cfg: &Config, dir: Option<PathBuf>) -> SnapshotStore {
    SnapshotStore::new(dir.unwrap_or_else(|| PathBuf::from(&cfg.snapshot_dir)))
}

pub async fn run(cli: Cli, cfg: Config) -> anyhow::Result<()> {
    match cli.command {
        Command::Latest { snapshot_dir } => {
            let path = snapshot_store(&cfg, snapshot_dir).latest()?;
            println!("{}", path.display());
        }
        Command::Sync { file, snapshot_dir } => {
            cfg.require_credentials()?;
            let path = match file {
                Some(path) => path,
                None => snapshot_store(&cfg, snapshot_dir).latest()?,
            };
            let summary = run_sync(&cfg, &path).await?;
            println!("{}", summary);
        }
        Command::SetupTables => {
            cfg.require_credentials()?;
            let client = AirtableClient::from_config(&cfg)?;
            for setup in ensure_tables(&client, &cfg.tables).await? {
                let verb = match setup.action {
                    SetupAction::Created => "created",
                    SetupAction::Skipped => "exists",
                };
                println!("{} {} ({})", verb, setup.table, setup.table_id);
            }
        }
    }
    Ok(())
}

pub async fn run_sync(cfg: &Config, path: &std::path::Path) -> Result<SyncSummary> {
    let client = AirtableClient::from_config(cfg)?;
    let engine = SyncEngine::new(client, cfg.tables.clone(), cfg.chunk_size);
    let outcome = engine.sync_from_path(path).await?;
    tracing::info!(summary = %outcome.summary, path = %path.display(), "Sync summary");
    Ok(outcome.summary)
}

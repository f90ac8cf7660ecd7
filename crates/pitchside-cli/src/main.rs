//! `pitchside`: play the daily football puzzles in a terminal.
//!
//! # Usage
//!
//! ```text
//! pitchside play puzzles/istanbul.json
//! pitchside show recall-istanbul
//! pitchside --config ~/.config/pitchside/pitchside.toml sync
//! ```

mod play;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use pitchside_core::{gateway::AttemptStore, sync::Syncer};
use pitchside_remote::RemoteClient;
use pitchside_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::AppConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pitchside", version, about = "Daily football puzzles")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "pitchside.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Play (or resume) the puzzle in a JSON file.
  Play { puzzle: PathBuf },
  /// Print the stored attempt for a puzzle.
  Show { puzzle_id: String },
  /// Push finished attempts to the backend.
  Sync,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  let store_path = cfg.store_path();
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let remote = cfg
    .remote_config()
    .map(RemoteClient::new)
    .transpose()
    .context("failed to build remote client")?;

  match cli.command {
    Command::Play { puzzle } => play::run(&puzzle, &cfg, store, remote).await,
    Command::Show { puzzle_id } => show(&store, &puzzle_id).await,
    Command::Sync => {
      let Some(remote) = remote else {
        bail!("no remote.base_url configured; nothing to sync to");
      };
      let syncer = Syncer::new(store, remote, cfg.sync_policy());
      let report = syncer.sync_pending().await;
      println!("pushed {}, failed {}", report.pushed, report.failed);
      Ok(())
    }
  }
}

async fn show(store: &SqliteStore, puzzle_id: &str) -> anyhow::Result<()> {
  let Some(attempt) = store
    .get_attempt_by_puzzle_id(puzzle_id)
    .await
    .context("failed to read attempt")?
  else {
    println!("No attempt stored for {puzzle_id}.");
    return Ok(());
  };

  println!("attempt    {}", attempt.id);
  println!("puzzle     {}", attempt.puzzle_id);
  println!("started    {}", attempt.started_at);
  match attempt.completed_at {
    Some(at) if attempt.completed => println!("completed  {at}"),
    _ => println!("completed  no"),
  }
  if let Some(display) = &attempt.score_display {
    println!("score      {} ({display})", attempt.score.unwrap_or_default());
  }
  println!("synced     {}", if attempt.synced { "yes" } else { "no" });
  println!("revision   {}", attempt.revision);
  Ok(())
}

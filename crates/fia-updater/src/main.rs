//! fia-updater binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite reduction database, and applies newline-delimited JSON events from
//! `--input` (or stdin). Each resulting record is written to stdout as one
//! JSON line; logs go to stderr.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use fia_store_sqlite::SqliteStore;
use fia_updater::{UpdaterConfig, apply_line};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Apply FIA reduction events to the database")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// File of newline-delimited JSON events; stdin when omitted.
  #[arg(short, long)]
  input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = UpdaterConfig::load(&cli.config)
    .context("failed to load updater configuration")?;

  let store = SqliteStore::open_with(&cfg.store_path, cfg.store_options())
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let reader: Box<dyn AsyncBufRead + Unpin> = match &cli.input {
    Some(path) => Box::new(BufReader::new(
      tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {path:?}"))?,
    )),
    None => Box::new(BufReader::new(tokio::io::stdin())),
  };

  let failed = run(&store, reader).await?;
  if failed > 0 {
    anyhow::bail!("{failed} event(s) could not be applied");
  }
  Ok(())
}

/// Apply every non-blank line; returns how many failed.
async fn run(
  store: &SqliteStore,
  reader: Box<dyn AsyncBufRead + Unpin>,
) -> anyhow::Result<usize> {
  let mut lines = reader.lines();
  let mut failed = 0;
  let mut line_no = 0usize;

  while let Some(line) = lines.next_line().await.context("failed to read input")? {
    line_no += 1;
    if line.trim().is_empty() {
      continue;
    }

    match apply_line(store, &line).await {
      Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
      Err(e) => {
        failed += 1;
        tracing::error!(line = line_no, error = %e, "event rejected");
      }
    }
  }

  Ok(failed)
}

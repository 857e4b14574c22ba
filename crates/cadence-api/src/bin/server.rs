//! cadence-api server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), builds the
//! in-process registries and SQLite-backed event journal, and serves the
//! sandbox JSON API over HTTP.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use cadence_api::{AppState, JournalCursors, ServerConfig, router};
use cadence_core::{
  automation::{AutomationConfig, AutomationRegistry},
  clock::ManualClock,
  ledger::MemoryLedger,
  subscription::{SubscriptionConfig, SubscriptionRegistry},
};
use cadence_journal_sqlite::SqliteJournal;
use chrono::Utc;
use clap::Parser;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Cadence registry sandbox server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CADENCE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // The sandbox clock starts at wall-clock time and only moves on request.
  let clock = Arc::new(ManualClock::new(Utc::now().timestamp().max(0) as u64));
  let ledger = Arc::new(MemoryLedger::new());

  let subscriptions = SubscriptionRegistry::new(
    SubscriptionConfig {
      owner: server_cfg.owner,
      interface_fee_bps: server_cfg.interface_fee_bps,
      protocol_fee_bps: server_cfg.protocol_fee_bps,
    },
    clock.clone(),
    ledger.clone(),
  )
  .context("invalid subscription registry configuration")?;

  let automation = AutomationRegistry::new(
    AutomationConfig {
      owner: server_cfg.owner,
      fee_token: server_cfg.fee_token,
      account_creation_fee: server_cfg.account_creation_fee,
      execution_fee: server_cfg.execution_fee,
    },
    ledger.clone(),
  )
  .context("invalid automation registry configuration")?;

  // Open the event journal.
  let journal_path = expand_tilde(&server_cfg.journal_path);
  let journal = SqliteJournal::open(&journal_path)
    .await
    .with_context(|| format!("failed to open journal at {journal_path:?}"))?;

  let state = AppState {
    subscriptions: Arc::new(Mutex::new(subscriptions)),
    automation: Arc::new(Mutex::new(automation)),
    ledger,
    clock,
    journal: Arc::new(journal),
    targets: Arc::new(Mutex::new(HashMap::new())),
    cursors: Arc::new(Mutex::new(JournalCursors::default())),
  };

  let app = router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

//! chatsync server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! message store, starts the ingestion loop and serves the HTTP tool surface.
//!
//! Any setting can be overridden from the environment, e.g.
//! `CHATSYNC__PORT=9000` or `CHATSYNC__PROVIDER__KIND=bridge`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chatsync_api::{
  AppState, ServerConfig, SessionHub,
  config::{ProviderConfig, ProviderKind},
};
use chatsync_core::{connection::Connection, event::ChatEvent};
use chatsync_engine::{
  ChatProvider, Pipeline,
  provider::{BridgeConfig, BridgeProvider, MockProvider},
  spawn_retention,
};
use chatsync_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::{net::TcpListener, sync::mpsc};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Provider events buffered ahead of the ingestion loop.
const EVENT_QUEUE: usize = 1024;

#[derive(Parser)]
#[command(author, version, about = "chatsync message sync server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CHATSYNC").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(dir) = store_path.parent() {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create store directory {dir:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let (events, queue) = mpsc::channel(EVENT_QUEUE);

  match server_cfg.provider.kind {
    ProviderKind::Mock => {
      let mut provider = MockProvider::new().with_events(events.clone());
      if let Some(identity) = &server_cfg.provider.identity {
        provider = provider.with_identity(identity.clone());
      }
      serve(server_cfg, store, provider, events, queue).await
    }
    ProviderKind::Bridge => {
      let provider = bridge_provider(&server_cfg.provider)?;
      serve(server_cfg, store, provider, events, queue).await
    }
  }
}

fn bridge_provider(cfg: &ProviderConfig) -> anyhow::Result<BridgeProvider> {
  let base_url = cfg
    .bridge_url
    .clone()
    .context("provider.bridge_url is required for the bridge provider")?;
  let bridge = BridgeConfig { base_url, timeout_secs: cfg.bridge_timeout_secs.unwrap_or(30) };
  BridgeProvider::new(&bridge).context("failed to build bridge client")
}

async fn serve<P>(
  server_cfg: ServerConfig,
  store: SqliteStore,
  provider: P,
  events: mpsc::Sender<ChatEvent>,
  queue: mpsc::Receiver<ChatEvent>,
) -> anyhow::Result<()>
where
  P: ChatProvider + 'static,
{
  let connection = match &server_cfg.provider.identity {
    Some(identity) => Connection::with_identity(identity.clone()),
    None => Connection::new(),
  };
  let engine = Pipeline::new(store, provider, SessionHub::new(), server_cfg.engine.clone())
    .with_connection(connection);

  tokio::spawn(engine.clone().run(queue));
  let _retention = spawn_retention(engine.clone());

  if let Err(e) = engine.connect().await {
    tracing::warn!(error = %e, "initial connect failed; retry with POST /connect");
  }

  let app = chatsync_api::router(AppState { engine, events });
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

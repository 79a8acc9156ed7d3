//! mayday server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, wires the HTTP SMS gateway, and serves the JSON API.

mod gateway;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use mayday_api::{ApiState, api_router};
use mayday_dispatch::{AlertAdminService, AlertDispatcher, DispatchPolicy};
use mayday_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use gateway::{HttpSmsGateway, SmsProviderConfig};

#[derive(Parser)]
#[command(author, version, about = "Mayday alert dispatch server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
struct ServerConfig {
  host:               String,
  port:               u16,
  store_path:         PathBuf,
  provider_url:       String,
  provider_api_key:   String,
  provider_sender_id: String,
  /// Seconds before a gateway call is abandoned as a failed attempt.
  send_timeout_secs:  Option<u64>,
  /// Seconds between a failed send and its single retry.
  retry_backoff_secs: Option<u64>,
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
    .add_source(config::Environment::with_prefix("MAYDAY"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", server_cfg.store_path)
    })?;
  let store = Arc::new(store);

  // Wire the SMS provider.
  let gateway = Arc::new(HttpSmsGateway::new(SmsProviderConfig {
    url:       server_cfg.provider_url.clone(),
    api_key:   server_cfg.provider_api_key.clone(),
    sender_id: server_cfg.provider_sender_id.clone(),
  })?);

  let mut policy = DispatchPolicy::default();
  if let Some(secs) = server_cfg.send_timeout_secs {
    policy.send_timeout = Duration::from_secs(secs);
  }
  if let Some(secs) = server_cfg.retry_backoff_secs {
    policy.retry_backoff = Duration::from_secs(secs);
  }

  // Build application state.
  let state = ApiState {
    dispatcher: Arc::new(AlertDispatcher::new(
      Arc::clone(&store),
      gateway,
      policy,
    )),
    admin: Arc::new(AlertAdminService::new(Arc::clone(&store))),
    store,
  };

  let app = api_router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

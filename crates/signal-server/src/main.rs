//! Campus signal mapper server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), overlays
//! `SIGNAL__*` environment variables, opens the SQLite store and serves the
//! HTTP/WebSocket API until interrupted.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use signal_api::{AppState, CarrierLookup};
use signal_core::{live::LiveChannel, store::SampleStore as _};
use signal_server::{expand_tilde, load_config};
use signal_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Campus signal mapper server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", env = "SIGNAL_CONFIG")]
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

  let server_cfg = load_config(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let stored = store.count_samples().await.context("failed to read store")?;
  tracing::info!(path = ?store_path, stored, "store ready");

  let carrier = CarrierLookup::new(&server_cfg.carrier_lookup)
    .context("failed to build carrier lookup client")?;

  let state = AppState::new(
    Arc::new(store),
    Arc::new(LiveChannel::new(server_cfg.live.capacity)),
    server_cfg.geofence.clone(),
    server_cfg.ingest.clone(),
    server_cfg.query,
    carrier,
  );

  let app = signal_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(geofence = ?server_cfg.geofence, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("shut down");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}

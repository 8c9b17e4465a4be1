//! Server assembly for the campus signal mapper: configuration and the
//! top-level router. The `server` binary wires these to a SQLite store.

use std::path::{Path, PathBuf};

use axum::{Router, routing::get};
use serde::Deserialize;
use signal_api::{AppState, CarrierLookupSettings};
use signal_core::{
  geofence::Geofence,
  pipeline::IngestRules,
  query::QueryLimits,
  store::SampleStore,
};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SIGNAL__*` environment variables. Every key has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  pub geofence:       Geofence,
  pub ingest:         IngestRules,
  pub query:          QueryLimits,
  pub live:           LiveSettings,
  pub carrier_lookup: CarrierLookupSettings,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:           "0.0.0.0".into(),
      port:           5000,
      store_path:     PathBuf::from("signals.db"),
      geofence:       Geofence::default(),
      ingest:         IngestRules::default(),
      query:          QueryLimits::default(),
      live:           LiveSettings::default(),
      carrier_lookup: CarrierLookupSettings::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
  /// Events buffered per subscriber before it starts losing them.
  pub capacity: usize,
}

impl Default for LiveSettings {
  fn default() -> Self { Self { capacity: 256 } }
}

/// Load configuration from an optional TOML file overlaid with environment
/// variables (`SIGNAL__PORT`, `SIGNAL__INGEST__MAX_BATCH`, ...).
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("SIGNAL")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: health check at `/`, API routes under `/api`, and
/// request tracing.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SampleStore + Clone + 'static,
{
  Router::new()
    .route("/", get(signal_api::health))
    .nest("/api", signal_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use axum::{
    body::Body,
    http::{Request, header},
  };
  use futures_util::StreamExt as _;
  use serde_json::{Value, json};
  use signal_api::CarrierLookup;
  use signal_core::{
    geofence::{Boundary as _, CAMPUS_BOUNDS},
    live::LiveChannel,
  };
  use signal_store_sqlite::SqliteStore;
  use tokio::net::{TcpListener, TcpStream};
  use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn defaults_match_documentation() {
    let cfg = ServerConfig::default();
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.port, 5000);
    assert_eq!(cfg.store_path, PathBuf::from("signals.db"));
    assert!(matches!(cfg.geofence, Geofence::BoundingBox(b) if b == CAMPUS_BOUNDS));
    assert!(!cfg.ingest.require_client_id);
    assert_eq!(cfg.ingest.max_batch, 500);
    assert_eq!((cfg.query.default_limit, cfg.query.max_limit), (1000, 5000));
    assert_eq!(cfg.live.capacity, 256);
    assert_eq!(cfg.carrier_lookup.base_url, "https://ipinfo.io");
    assert_eq!(cfg.carrier_lookup.timeout_ms, 3000);
  }

  #[test]
  fn partial_toml_keeps_other_defaults() {
    let cfg: ServerConfig = toml::from_str(
      r#"
        port = 8080

        [ingest]
        require_client_id = true

        [geofence]
        kind = "polygon"
        vertices = [[12.839, 80.151], [12.844, 80.151], [12.844, 80.157], [12.839, 80.157]]
      "#,
    )
    .unwrap();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.host, "0.0.0.0");
    assert!(cfg.ingest.require_client_id);
    assert_eq!(cfg.ingest.max_batch, 500);
    assert!(matches!(cfg.geofence, Geofence::Polygon(_)));
    assert!(cfg.geofence.is_within_bounds(12.8406, 80.1534));
    assert!(!cfg.geofence.is_within_bounds(0.0, 0.0));
  }

  #[test]
  fn invalid_geofence_is_a_config_error() {
    let result = toml::from_str::<ServerConfig>(
      r#"
        [geofence]
        kind = "polygon"
        vertices = [[12.839, 80.151], [12.844, 80.151]]
      "#,
    );
    assert!(result.is_err());
  }

  #[test]
  fn missing_config_file_yields_defaults() {
    let cfg = load_config(Path::new("/nonexistent/signal-config.toml")).unwrap();
    assert_eq!(cfg.live.capacity, 256);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/db/signals.db")), PathBuf::from(home).join("db/signals.db"));
    assert_eq!(expand_tilde(Path::new("/var/signals.db")), PathBuf::from("/var/signals.db"));
  }

  async fn test_state() -> AppState<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    AppState::new(
      store,
      Arc::new(LiveChannel::default()),
      Geofence::default(),
      IngestRules::default(),
      QueryLimits::default(),
      CarrierLookup::new(&CarrierLookupSettings::default()).unwrap(),
    )
  }

  async fn request(state: &AppState<SqliteStore>, req: Request<Body>) -> (u16, Value) {
    let resp = router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status().as_u16();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or_default())
  }

  async fn get_json(uri: &str) -> (u16, Value) {
    let state = test_state().await;
    request(&state, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
  }

  async fn post_json(state: &AppState<SqliteStore>, uri: &str, body: &Value) -> (u16, Value) {
    let req = Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    request(state, req).await
  }

  type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

  /// Next text frame as JSON, skipping control frames.
  async fn next_event(ws: &mut Socket) -> Value {
    loop {
      let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("no frame within 5s")
        .expect("socket closed")
        .unwrap();
      if let Message::Text(text) = msg {
        return serde_json::from_str(text.as_str()).unwrap();
      }
    }
  }

  #[tokio::test]
  async fn health_is_served_at_root() {
    let (status, body) = get_json("/").await;
    assert_eq!(status, 200);
    assert_eq!(body["service"], "campus-signal-mapper");
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let (status, body) = get_json("/api/samples").await;
    assert_eq!(status, 200);
    assert_eq!(body, serde_json::json!([]));

    let (status, _) = get_json("/samples").await;
    assert_eq!(status, 404);
  }

  #[tokio::test]
  async fn live_events_stream_over_websocket() {
    let state = test_state().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/events"))
      .await
      .unwrap();
    // The subscription is live before `connected` is sent.
    assert_eq!(next_event(&mut ws).await, json!({ "event": "connected" }));

    let sample = json!({
      "lat": 12.8406,
      "lng": 80.1534,
      "carrier": "Jio",
      "network_type": "4G",
      "signal_strength": -75,
      "download_speed": 42.0,
      "client_id": "ws-0001",
    });
    let (status, _) = post_json(&state, "/api/submit", &sample).await;
    assert_eq!(status, 201);

    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "new_sample");
    assert_eq!(event["data"]["lat"], 12.8406);
    assert_eq!(event["data"]["lng"], 80.1534);
    assert_eq!(event["data"]["carrier"], "Jio");
    assert_eq!(event["data"]["network_type"], "4G");
    assert_eq!(event["data"]["signal_strength"], -75.0);
    assert_eq!(event["data"]["download_speed"], 42.0);
    assert_eq!(event["data"]["client_id"], "ws-0001");

    let (status, body) = post_json(&state, "/api/submit", &sample).await;
    assert_eq!(status, 201);
    assert_eq!(body["duplicate"], true);
    let quiet = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(quiet.is_err(), "duplicate produced a frame: {quiet:?}");

    let batch = json!([
      { "lat": 12.8401, "lng": 80.1521, "carrier": "Airtel" },
      { "lat": 12.8412, "lng": 80.1549, "carrier": "VI" },
    ]);
    let (status, _) = post_json(&state, "/api/submit/batch", &batch).await;
    assert_eq!(status, 201);

    let event = next_event(&mut ws).await;
    assert_eq!(event["event"], "new_samples");
    assert_eq!(event["data"].as_array().map(Vec::len), Some(2));
  }
}

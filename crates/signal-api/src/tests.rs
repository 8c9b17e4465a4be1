//! Router-level tests against an in-memory SQLite store.

use std::{sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use serde_json::{Value, json};
use signal_core::{
  geofence::Geofence,
  live::{LiveChannel, LiveEvent, Subscription},
  pipeline::IngestRules,
  query::QueryLimits,
  store::SampleStore as _,
};
use signal_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use super::*;

struct Harness {
  state: AppState<SqliteStore>,
  store: Arc<SqliteStore>,
}

async fn harness() -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  // Nothing listens here; only tests that reach the upstream care.
  let carrier = CarrierLookup::new(&CarrierLookupSettings {
    base_url:   "http://127.0.0.1:9".into(),
    timeout_ms: 500,
  })
  .unwrap();
  let state = AppState::new(
    store.clone(),
    Arc::new(LiveChannel::new(16)),
    Geofence::default(),
    IngestRules::default(),
    QueryLimits::default(),
    carrier,
  );
  Harness { state, store }
}

async fn send(state: &AppState<SqliteStore>, req: Request<Body>) -> (StatusCode, Value) {
  let resp: Response = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, body)
}

/// An event already published to `sub`, if any.
async fn queued(sub: &mut Subscription) -> Option<LiveEvent> {
  tokio::time::timeout(Duration::from_millis(50), sub.recv()).await.ok().flatten()
}

fn post(uri: &str, body: impl Into<String>) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.into()))
    .unwrap()
}

fn get(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn campus_sample() -> Value {
  json!({
    "lat": 12.8406,
    "lng": 80.1534,
    "carrier": "Jio",
    "network_type": "5G",
    "signal_strength": -75,
    "download_speed": 42,
    "client_id": "c-0001",
  })
}

// ── Submit ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accepted_sample_is_stored_broadcast_and_queryable() {
  let h = harness().await;
  let mut sub = h.state.live.subscribe();

  let (status, body) = send(&h.state, post("/submit", campus_sample().to_string())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["success"], true);
  assert_eq!(body["duplicate"], false);

  match queued(&mut sub).await {
    Some(LiveEvent::NewSample(s)) => {
      assert_eq!((s.latitude, s.longitude), (12.8406, 80.1534));
      assert_eq!(s.carrier, "Jio");
      assert_eq!(s.network_type, "5G");
      assert_eq!(s.signal_strength, Some(-75.0));
      assert_eq!(s.download_speed, Some(42.0));
    }
    other => panic!("expected new_sample, got {other:?}"),
  }

  let (status, rows) = send(&h.state, get("/samples?carrier=Jio")).await;
  assert_eq!(status, StatusCode::OK);
  let rows = rows.as_array().unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0]["lat"], 12.8406);
  assert_eq!(rows[0]["lng"], 80.1534);
  assert_eq!(rows[0]["network_type"], "5G");
  assert_eq!(rows[0]["client_id"], "c-0001");
  assert!(rows[0]["created_at"].is_i64());
}

#[tokio::test]
async fn content_type_is_not_required() {
  let h = harness().await;
  let req = Request::builder()
    .method("POST")
    .uri("/submit")
    .body(Body::from(campus_sample().to_string()))
    .unwrap();
  let (status, _) = send(&h.state, req).await;
  assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn out_of_bounds_is_forbidden_and_not_stored() {
  let h = harness().await;
  let mut sub = h.state.live.subscribe();

  let (status, body) = send(&h.state, post("/submit", r#"{"lat": 0, "lng": 0}"#)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "OUT_OF_BOUNDS");
  assert!(body["message"].is_string());

  assert_eq!(h.store.count_samples().await.unwrap(), 0);
  assert!(queued(&mut sub).await.is_none());
}

#[tokio::test]
async fn malformed_and_invalid_bodies_are_bad_requests() {
  let h = harness().await;

  let (status, body) = send(&h.state, post("/submit", "{not json")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "MALFORMED_INPUT");

  let (status, body) = send(&h.state, post("/submit", "")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "MALFORMED_INPUT");

  let (status, body) = send(&h.state, post("/submit", r#"{"carrier": "Jio"}"#)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "INVALID_COORDINATES");

  let (status, body) = send(&h.state, post("/submit", r#"{"lat": "north", "lng": 80.15}"#)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "INVALID_COORDINATES");

  assert_eq!(h.store.count_samples().await.unwrap(), 0);
}

#[tokio::test]
async fn repeated_submission_is_stored_and_broadcast_once() {
  let h = harness().await;
  let mut sub = h.state.live.subscribe();

  let mut duplicates = Vec::new();
  for _ in 0..3 {
    let (status, body) = send(&h.state, post("/submit", campus_sample().to_string())).await;
    assert_eq!(status, StatusCode::CREATED);
    duplicates.push(body["duplicate"].as_bool().unwrap());
  }

  assert_eq!(duplicates, vec![false, true, true]);
  assert_eq!(h.store.count_samples().await.unwrap(), 1);
  assert!(matches!(queued(&mut sub).await, Some(LiveEvent::NewSample(_))));
  assert!(queued(&mut sub).await.is_none());
}

// ── Batches ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_keeps_valid_elements() {
  let h = harness().await;
  let mut sub = h.state.live.subscribe();

  let batch = json!([
    { "lat": 12.8406, "lng": 80.1534, "carrier": "Jio" },
    { "carrier": "Airtel" },
    { "lat": 12.8410, "lng": 80.1540, "carrier": "VI" },
  ]);
  let (status, body) = send(&h.state, post("/submit/batch", batch.to_string())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["status"], "ok");
  assert_eq!(body["inserted"], 2);
  assert_eq!(body["rejected"], 1);
  assert_eq!(body["duplicates"], 0);
  assert_eq!(body["failed"], 0);

  assert_eq!(h.store.count_samples().await.unwrap(), 2);
  match queued(&mut sub).await {
    Some(LiveEvent::NewSamples(samples)) => assert_eq!(samples.len(), 2),
    other => panic!("expected new_samples, got {other:?}"),
  }
}

#[tokio::test]
async fn submit_accepts_an_array_as_a_batch() {
  let h = harness().await;
  let batch = json!([campus_sample(), { "lat": 12.8410, "lng": 80.1540 }]);
  let (status, body) = send(&h.state, post("/submit", batch.to_string())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["inserted"], 2);
}

#[tokio::test]
async fn batch_endpoint_requires_an_array() {
  let h = harness().await;
  let (status, body) = send(&h.state, post("/submit/batch", campus_sample().to_string())).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "MALFORMED_INPUT");
}

// ── Samples ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_filters_return_everything() {
  let h = harness().await;
  for (carrier, id) in [("Jio", "a"), ("Airtel", "b")] {
    let body = json!({ "lat": 12.8406, "lng": 80.1534, "carrier": carrier, "client_id": id });
    send(&h.state, post("/submit", body.to_string())).await;
  }

  let (status, rows) = send(&h.state, get("/samples?carrier=&network_type=&limit=")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(rows.as_array().unwrap().len(), 2);

  let (_, rows) = send(&h.state, get("/samples?limit=1")).await;
  assert_eq!(rows.as_array().unwrap().len(), 1);

  let (_, rows) = send(&h.state, get("/samples?carrier=BSNL")).await;
  assert_eq!(rows, json!([]));
}

#[tokio::test]
async fn non_numeric_limit_is_rejected() {
  let h = harness().await;
  let (status, body) = send(&h.state, get("/samples?limit=lots")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "MALFORMED_INPUT");
}

// ── Carrier lookup ───────────────────────────────────────────────────────────

#[tokio::test]
async fn private_callers_get_the_local_label() {
  let h = harness().await;

  let (status, body) = send(&h.state, get("/carrier-lookup")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "carrier": "Unknown (Local IP)" }));

  let req = Request::builder()
    .uri("/carrier-lookup")
    .header("x-forwarded-for", "192.168.1.50")
    .body(Body::empty())
    .unwrap();
  let (_, body) = send(&h.state, req).await;
  assert_eq!(body["carrier"], "Unknown (Local IP)");
}

#[tokio::test]
async fn unreachable_upstream_is_service_unavailable() {
  let h = harness().await;
  let req = Request::builder()
    .uri("/carrier-lookup")
    .header("x-forwarded-for", "49.36.1.1")
    .body(Body::empty())
    .unwrap();
  let (status, body) = send(&h.state, req).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert!(
    matches!(body["error"].as_str(), Some("UPSTREAM_UNAVAILABLE" | "UPSTREAM_TIMEOUT")),
    "{body}"
  );
}

// ── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
  let Json(body) = health().await;
  assert_eq!(body["status"], "ok");
  assert_eq!(body["service"], "campus-signal-mapper");
}

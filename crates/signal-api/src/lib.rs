//! HTTP and WebSocket API for the campus signal mapper.
//!
//! Exposes an axum [`Router`] backed by any [`SampleStore`]. TLS, static
//! files and request tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", signal_api::api_router(state))
//! ```
//!
//! The carrier lookup reads the peer address from
//! [`axum::extract::ConnectInfo`], so serve the app with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

pub mod carrier;
pub mod error;
pub mod events;
pub mod samples;
pub mod submit;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use serde_json::{Value, json};
use signal_core::{
  geofence::Geofence,
  live::LiveChannel,
  pipeline::{IngestPipeline, IngestRules},
  query::{QueryLimits, QueryService},
  store::SampleStore,
};

pub use carrier::{CarrierLookup, CarrierLookupSettings};
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct AppState<S: SampleStore> {
  pub pipeline: Arc<IngestPipeline<S>>,
  pub query:    Arc<QueryService<S>>,
  pub live:     Arc<LiveChannel>,
  pub carrier:  Arc<CarrierLookup>,
}

impl<S: SampleStore> AppState<S> {
  /// Wire the ingest pipeline and query service to one store and one live
  /// channel.
  pub fn new(
    store: Arc<S>,
    live: Arc<LiveChannel>,
    geofence: Geofence,
    rules: IngestRules,
    limits: QueryLimits,
    carrier: CarrierLookup,
  ) -> Self {
    Self {
      pipeline: Arc::new(IngestPipeline::new(store.clone(), live.clone(), geofence, rules)),
      query:    Arc::new(QueryService::new(store, limits)),
      live,
      carrier:  Arc::new(carrier),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: SampleStore + Clone + 'static,
{
  Router::new()
    .route("/submit",         post(submit::submit::<S>))
    .route("/submit/batch",   post(submit::batch::<S>))
    .route("/samples",        get(samples::list::<S>))
    .route("/carrier-lookup", get(carrier::handler::<S>))
    .route("/events",         get(events::handler::<S>))
    .with_state(state)
}

/// `GET /` — health check.
pub async fn health() -> Json<Value> {
  Json(json!({ "status": "ok", "service": "campus-signal-mapper" }))
}

#[cfg(test)]
mod tests;

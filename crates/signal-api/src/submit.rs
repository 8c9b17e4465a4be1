//! Submission handlers.
//!
//! Bodies are read as raw bytes and parsed here, so a missing or wrong
//! `Content-Type` does not matter and malformed JSON gets the same error
//! shape as every other rejection.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};
use signal_core::{
  Rejection,
  pipeline::{Accepted, BatchReport},
  store::SampleStore,
};

use crate::{AppState, error::ApiError};

#[derive(Serialize)]
struct BatchBody {
  status: &'static str,
  #[serde(flatten)]
  report: BatchReport,
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
  serde_json::from_slice(body)
    .map_err(|e| Rejection::MalformedInput(format!("body is not valid JSON: {e}")).into())
}

fn batch_response(report: BatchReport) -> Response {
  (StatusCode::CREATED, Json(BatchBody { status: "ok", report })).into_response()
}

/// `POST /submit` — one sample object, or an array handled as a batch.
pub async fn submit<S>(State(state): State<AppState<S>>, body: Bytes) -> Result<Response, ApiError>
where
  S: SampleStore + Clone + 'static,
{
  let payload = parse_body(&body)?;
  if payload.is_array() {
    return Ok(batch_response(state.pipeline.submit_batch(&payload).await?));
  }

  let body = match state.pipeline.submit(&payload).await? {
    Accepted::Inserted(sample) => json!({ "success": true, "duplicate": false, "id": sample.id }),
    Accepted::Duplicate => json!({ "success": true, "duplicate": true }),
  };
  Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// `POST /submit/batch` — the body must be a JSON array.
pub async fn batch<S>(State(state): State<AppState<S>>, body: Bytes) -> Result<Response, ApiError>
where
  S: SampleStore + Clone + 'static,
{
  let payload = parse_body(&body)?;
  Ok(batch_response(state.pipeline.submit_batch(&payload).await?))
}

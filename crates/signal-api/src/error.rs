//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body is `{"error": CODE, "message": text}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use signal_core::{IngestError, Rejection};
use thiserror::Error;

use crate::carrier::LookupError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Rejected(#[from] Rejection),

  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Lookup(#[from] LookupError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Rejected(Rejection::OutOfBounds) => StatusCode::FORBIDDEN,
      ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
      ApiError::StoreUnavailable(_) | ApiError::Lookup(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Rejected(r) => r.code(),
      ApiError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
      ApiError::Lookup(LookupError::Timeout) => "UPSTREAM_TIMEOUT",
      ApiError::Lookup(LookupError::Upstream(_)) => "UPSTREAM_UNAVAILABLE",
    }
  }

  fn message(&self) -> String {
    match self {
      ApiError::StoreUnavailable(_) => "storage is temporarily unavailable, retry later".into(),
      ApiError::Lookup(_) => "carrier detection failed".into(),
      other => other.to_string(),
    }
  }
}

impl<E> From<IngestError<E>> for ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn from(e: IngestError<E>) -> Self {
    match e {
      IngestError::Rejected(r) => ApiError::Rejected(r),
      IngestError::StoreUnavailable(e) => ApiError::StoreUnavailable(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = json!({ "error": self.code(), "message": self.message() });
    (self.status(), Json(body)).into_response()
  }
}

//! Error types for `signal-core`.

use thiserror::Error;

/// Configuration and construction errors.
#[derive(Debug, Error)]
pub enum Error {
  #[error("polygon needs at least 3 vertices, got {0}")]
  TooFewVertices(usize),

  #[error("vertex {index} is not a finite coordinate: [{lat}, {lng}]")]
  NonFiniteVertex { index: usize, lat: f64, lng: f64 },

  #[error("bounding box limits must be finite")]
  NonFiniteLimit,

  #[error("bounding box is inverted on the {0} axis")]
  InvertedBox(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a submission was refused. Every variant is client-facing and
/// non-retryable without changing the payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("{0}")]
  MalformedInput(String),

  #[error("latitude and longitude must be present and finite numbers")]
  InvalidCoordinates,

  #[error("submission is outside the campus boundary")]
  OutOfBounds,
}

impl Rejection {
  /// Stable machine-readable code.
  pub fn code(&self) -> &'static str {
    match self {
      Rejection::MalformedInput(_) => "MALFORMED_INPUT",
      Rejection::InvalidCoordinates => "INVALID_COORDINATES",
      Rejection::OutOfBounds => "OUT_OF_BOUNDS",
    }
  }
}

/// Failure of an ingest call. `E` is the store backend's error type.
#[derive(Debug, Error)]
pub enum IngestError<E> {
  #[error(transparent)]
  Rejected(#[from] Rejection),

  /// The durable write failed; the caller may retry with backoff.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] E),
}

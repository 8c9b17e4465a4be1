//! Sample — one crowd-sourced signal-quality observation.
//!
//! A [`NewSample`] is the validated, not-yet-persisted form produced by
//! [`payload::parse_submission`](crate::payload::parse_submission). The store
//! turns it into a [`Sample`] by assigning `id` and, when the client did not
//! supply one, `created_at`. Persisted samples are never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored in place of a missing `carrier` or `network_type` so grouping and
/// filtering never see nulls.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A persisted sample, as returned by queries and carried by live events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
  /// Store-assigned surrogate key.
  pub id:              i64,
  #[serde(rename = "lat")]
  pub latitude:        f64,
  #[serde(rename = "lng")]
  pub longitude:       f64,
  pub carrier:         String,
  pub network_type:    String,
  /// dBm; observed roughly −120..−30 but not range-checked.
  pub signal_strength: Option<f64>,
  /// Mbps, never negative.
  pub download_speed:  Option<f64>,
  /// Mbps, never negative.
  pub upload_speed:    Option<f64>,
  pub client_id:       Option<String>,
  #[serde(with = "chrono::serde::ts_seconds")]
  pub created_at:      DateTime<Utc>,
}

/// A validated submission, inside the geofence, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
  pub latitude:        f64,
  pub longitude:       f64,
  pub carrier:         String,
  pub network_type:    String,
  pub signal_strength: Option<f64>,
  pub download_speed:  Option<f64>,
  pub upload_speed:    Option<f64>,
  /// Idempotency key; at most one row is stored per value.
  pub client_id:       Option<String>,
  /// Client-supplied timestamp; the store uses the current time when absent.
  pub created_at:      Option<DateTime<Utc>>,
}

impl NewSample {
  /// A sample at `(latitude, longitude)` with every optional field defaulted.
  pub fn at(latitude: f64, longitude: f64) -> Self {
    Self {
      latitude,
      longitude,
      carrier: UNKNOWN_LABEL.to_owned(),
      network_type: UNKNOWN_LABEL.to_owned(),
      signal_strength: None,
      download_speed: None,
      upload_speed: None,
      client_id: None,
      created_at: None,
    }
  }

  /// Attach the store-assigned key and timestamp.
  pub fn into_sample(self, id: i64, now: DateTime<Utc>) -> Sample {
    Sample {
      id,
      latitude:        self.latitude,
      longitude:       self.longitude,
      carrier:         self.carrier,
      network_type:    self.network_type,
      signal_strength: self.signal_strength,
      download_speed:  self.download_speed,
      upload_speed:    self.upload_speed,
      client_id:       self.client_id,
      created_at:      self.created_at.unwrap_or(now),
    }
  }
}

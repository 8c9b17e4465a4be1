//! Randomised in-campus submissions.

use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

pub const CARRIERS: &[&str] = &["Airtel", "Jio", "VI", "BSNL"];
pub const NETWORK_TYPES: &[&str] = &["3G", "4G", "5G"];

/// Centre of the campus the default geofence covers.
pub const CAMPUS_CENTER: (f64, f64) = (12.8406, 80.1534);

/// One submission body. Field names use the long-form aliases the server
/// accepts, as the field app sends them.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
  pub client_id:       String,
  pub latitude:        f64,
  pub longitude:       f64,
  pub carrier:         &'static str,
  pub network_type:    &'static str,
  #[serde(rename = "dbm")]
  pub signal_strength: i32,
  #[serde(rename = "download_mbps")]
  pub download_speed:  f64,
  #[serde(rename = "upload_mbps")]
  pub upload_speed:    f64,
  #[serde(rename = "timestamp")]
  pub created_at:      i64,
}

#[derive(Debug, Clone, Copy)]
pub struct Generator {
  pub center: (f64, f64),
  /// Maximum offset from `center`, in degrees, on each axis.
  pub spread: f64,
}

impl Generator {
  pub fn sample<R: Rng>(&self, rng: &mut R, now: i64) -> Submission {
    let spread = self.spread.abs();
    let (lat, lng) = self.center;
    Submission {
      client_id:       Uuid::new_v4().to_string(),
      latitude:        lat + rng.gen_range(-spread..=spread),
      longitude:       lng + rng.gen_range(-spread..=spread),
      carrier:         CARRIERS[rng.gen_range(0..CARRIERS.len())],
      network_type:    NETWORK_TYPES[rng.gen_range(0..NETWORK_TYPES.len())],
      signal_strength: rng.gen_range(-115..=-55),
      download_speed:  rng.gen_range(5.0..150.0),
      upload_speed:    rng.gen_range(1.0..50.0),
      created_at:      now,
    }
  }
}

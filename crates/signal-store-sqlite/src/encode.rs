//! Conversions between domain types and SQLite column values.
//!
//! Timestamps are stored as integer epoch seconds so they sort natively.

use chrono::{DateTime, Utc};
use signal_core::sample::Sample;

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> i64 { dt.timestamp() }

pub fn decode_dt(secs: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(secs, 0).ok_or(Error::Timestamp(secs))
}

/// Column-for-column image of a `samples` row.
pub struct RawSample {
  pub id:              i64,
  pub lat:             f64,
  pub lng:             f64,
  pub carrier:         String,
  pub network_type:    String,
  pub signal_strength: Option<f64>,
  pub download_speed:  Option<f64>,
  pub upload_speed:    Option<f64>,
  pub client_id:       Option<String>,
  pub created_at:      i64,
}

/// Columns in the order [`RawSample::from_row`] reads them.
pub const SAMPLE_COLUMNS: &str = "id, lat, lng, carrier, network_type, signal_strength, \
                                  download_speed, upload_speed, client_id, created_at";

impl RawSample {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      lat:             row.get(1)?,
      lng:             row.get(2)?,
      carrier:         row.get(3)?,
      network_type:    row.get(4)?,
      signal_strength: row.get(5)?,
      download_speed:  row.get(6)?,
      upload_speed:    row.get(7)?,
      client_id:       row.get(8)?,
      created_at:      row.get(9)?,
    })
  }

  pub fn into_sample(self) -> Result<Sample> {
    Ok(Sample {
      id:              self.id,
      latitude:        self.lat,
      longitude:       self.lng,
      carrier:         self.carrier,
      network_type:    self.network_type,
      signal_strength: self.signal_strength,
      download_speed:  self.download_speed,
      upload_speed:    self.upload_speed,
      client_id:       self.client_id,
      created_at:      decode_dt(self.created_at)?,
    })
  }
}

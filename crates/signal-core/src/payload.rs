//! Validation of raw JSON submissions into [`NewSample`]s.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. the payload is a JSON object, else [`Rejection::MalformedInput`];
//! 2. latitude and longitude are present and coerce to finite floats, else
//!    [`Rejection::InvalidCoordinates`];
//! 3. the point is inside the geofence, else [`Rejection::OutOfBounds`];
//! 4. optional fields are extracted with defaulting; a field that is present
//!    but has the wrong shape is [`Rejection::MalformedInput`].
//!
//! Field names follow the de-facto wire contract; each accepts the aliases
//! older clients send (`lat`/`latitude`, `dbm` for `signal_strength`, ...).

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{
  Rejection,
  geofence::{Boundary, Geofence},
  sample::{NewSample, UNKNOWN_LABEL},
};

const LATITUDE: &[&str] = &["lat", "latitude"];
const LONGITUDE: &[&str] = &["lng", "longitude", "lon"];
const CARRIER: &[&str] = &["carrier"];
const NETWORK_TYPE: &[&str] = &["network_type"];
const SIGNAL_STRENGTH: &[&str] = &["signal_strength", "dbm"];
const DOWNLOAD_SPEED: &[&str] = &["download_speed", "download_mbps"];
const UPLOAD_SPEED: &[&str] = &["upload_speed", "upload_mbps"];
const CLIENT_ID: &[&str] = &["client_id"];
const CREATED_AT: &[&str] = &["created_at", "timestamp"];

/// Validate one submission against `geofence`.
///
/// With `require_client_id`, a submission without a `client_id` is rejected
/// as malformed.
pub fn parse_submission(
  payload: &Value,
  geofence: &Geofence,
  require_client_id: bool,
) -> Result<NewSample, Rejection> {
  let obj = payload
    .as_object()
    .ok_or_else(|| Rejection::MalformedInput("expected a JSON object".into()))?;

  let latitude = coordinate(obj, LATITUDE)?;
  let longitude = coordinate(obj, LONGITUDE)?;

  if !geofence.is_within_bounds(latitude, longitude) {
    return Err(Rejection::OutOfBounds);
  }

  let client_id = client_id(obj)?;
  if require_client_id && client_id.is_none() {
    return Err(Rejection::MalformedInput("missing client_id".into()));
  }

  Ok(NewSample {
    latitude,
    longitude,
    carrier: label(obj, CARRIER)?,
    network_type: label(obj, NETWORK_TYPE)?,
    signal_strength: number(obj, SIGNAL_STRENGTH)?,
    download_speed: throughput(obj, DOWNLOAD_SPEED)?,
    upload_speed: throughput(obj, UPLOAD_SPEED)?,
    client_id,
    created_at: created_at(obj)?,
  })
}

/// First non-null value under any of `names`.
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
  names.iter().filter_map(|n| obj.get(*n)).find(|v| !v.is_null())
}

/// Numbers and numeric strings both coerce; non-finite results do not.
fn coerce_f64(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
  .filter(|f| f.is_finite())
}

fn coordinate(obj: &Map<String, Value>, names: &[&str]) -> Result<f64, Rejection> {
  field(obj, names)
    .and_then(coerce_f64)
    .ok_or(Rejection::InvalidCoordinates)
}

fn label(obj: &Map<String, Value>, names: &[&str]) -> Result<String, Rejection> {
  match field(obj, names) {
    None => Ok(UNKNOWN_LABEL.to_owned()),
    Some(Value::String(s)) if s.trim().is_empty() => Ok(UNKNOWN_LABEL.to_owned()),
    Some(Value::String(s)) => Ok(s.trim().to_owned()),
    Some(_) => Err(Rejection::MalformedInput(format!("{} must be a string", names[0]))),
  }
}

fn number(obj: &Map<String, Value>, names: &[&str]) -> Result<Option<f64>, Rejection> {
  field(obj, names)
    .map(|v| {
      coerce_f64(v)
        .ok_or_else(|| Rejection::MalformedInput(format!("{} must be a number", names[0])))
    })
    .transpose()
}

fn throughput(obj: &Map<String, Value>, names: &[&str]) -> Result<Option<f64>, Rejection> {
  match number(obj, names)? {
    Some(v) if v < 0.0 => Err(Rejection::MalformedInput(format!(
      "{} must not be negative",
      names[0]
    ))),
    other => Ok(other),
  }
}

fn client_id(obj: &Map<String, Value>) -> Result<Option<String>, Rejection> {
  match field(obj, CLIENT_ID) {
    None => Ok(None),
    Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.trim().to_owned())),
    Some(_) => Err(Rejection::MalformedInput("client_id must be a string".into())),
  }
}

/// Integer epoch seconds, as a JSON integer or a string of digits.
fn created_at(obj: &Map<String, Value>) -> Result<Option<DateTime<Utc>>, Rejection> {
  let Some(value) = field(obj, CREATED_AT) else {
    return Ok(None);
  };
  let secs = match value {
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse::<i64>().ok(),
    _ => None,
  };
  secs
    .and_then(|s| DateTime::from_timestamp(s, 0))
    .map(Some)
    .ok_or_else(|| Rejection::MalformedInput("created_at must be an integer epoch".into()))
}

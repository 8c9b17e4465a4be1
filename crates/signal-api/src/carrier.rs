//! Carrier detection from the caller's public IP.
//!
//! The client address is the first entry of `X-Forwarded-For` when present,
//! otherwise the connection's peer address. Non-public addresses short-circuit
//! to [`LOCAL_CARRIER`] without contacting the upstream service; public ones
//! are resolved through an ipinfo-style `GET {base_url}/{ip}/org` endpoint
//! and the organisation string is mapped to a carrier label.

use std::{
  net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
  time::Duration,
};

use axum::{
  Json,
  extract::{ConnectInfo, Request, State},
  http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};
use signal_core::store::SampleStore;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{AppState, error::ApiError};

/// Label returned for loopback, private and otherwise unroutable callers.
pub const LOCAL_CARRIER: &str = "Unknown (Local IP)";

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CarrierLookupSettings {
  pub base_url:   String,
  pub timeout_ms: u64,
}

impl Default for CarrierLookupSettings {
  fn default() -> Self {
    Self { base_url: "https://ipinfo.io".into(), timeout_ms: 3000 }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LookupError {
  #[error("carrier lookup timed out")]
  Timeout,

  #[error("carrier lookup failed: {0}")]
  Upstream(String),
}

impl From<reqwest::Error> for LookupError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() { LookupError::Timeout } else { LookupError::Upstream(e.to_string()) }
  }
}

pub struct CarrierLookup {
  client:   reqwest::Client,
  base_url: String,
}

impl CarrierLookup {
  pub fn new(settings: &CarrierLookupSettings) -> reqwest::Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_millis(settings.timeout_ms))
      .build()?;
    Ok(Self {
      client,
      base_url: settings.base_url.trim_end_matches('/').to_owned(),
    })
  }

  /// Carrier label for `ip`. Only public addresses reach the upstream.
  pub async fn lookup(&self, ip: Option<IpAddr>) -> Result<String, LookupError> {
    let Some(ip) = ip.filter(is_public) else {
      return Ok(LOCAL_CARRIER.to_owned());
    };

    let url = format!("{}/{ip}/org", self.base_url);
    debug!(%url, "resolving carrier");
    let resp = self.client.get(&url).send().await?;
    if !resp.status().is_success() {
      return Err(LookupError::Upstream(format!("upstream returned {}", resp.status())));
    }
    let org = resp.text().await?;
    Ok(classify_org(&org).to_owned())
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Map an organisation string (e.g. `"AS55836 Reliance Jio Infocomm"`) to a
/// carrier label.
pub fn classify_org(org: &str) -> &'static str {
  let org = org.to_lowercase();
  let has_word = |w: &str| org.split(|c: char| !c.is_ascii_alphanumeric()).any(|t| t == w);

  if org.contains("jio") {
    "Jio"
  } else if org.contains("airtel") {
    "Airtel"
  } else if org.contains("vodafone") || org.contains("idea") || has_word("vi") {
    "VI"
  } else if org.contains("bsnl") {
    "BSNL"
  } else {
    "Other"
  }
}

/// Whether `ip` is routable on the public internet.
pub fn is_public(ip: &IpAddr) -> bool {
  match ip {
    IpAddr::V4(v4) => is_public_v4(v4),
    IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
      Some(v4) => is_public_v4(&v4),
      None => is_public_v6(v6),
    },
  }
}

fn is_public_v4(ip: &Ipv4Addr) -> bool {
  let [a, b, ..] = ip.octets();
  // 100.64.0.0/10 is carrier-grade NAT space.
  let shared = a == 100 && (64..128).contains(&b);
  !(ip.is_loopback()
    || ip.is_private()
    || ip.is_link_local()
    || ip.is_unspecified()
    || ip.is_broadcast()
    || ip.is_multicast()
    || ip.is_documentation()
    || shared)
}

fn is_public_v6(ip: &Ipv6Addr) -> bool {
  let [first, second, ..] = ip.segments();
  let unique_local = first & 0xfe00 == 0xfc00;
  let link_local = first & 0xffc0 == 0xfe80;
  let documentation = first == 0x2001 && second == 0x0db8;
  !(ip.is_loopback()
    || ip.is_unspecified()
    || ip.is_multicast()
    || unique_local
    || link_local
    || documentation)
}

/// First parseable `X-Forwarded-For` entry, falling back to the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
  headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .and_then(|first| first.trim().parse().ok())
    .or(peer.map(|p| p.ip()))
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// `GET /carrier-lookup`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  req: Request,
) -> Result<Json<Value>, ApiError>
where
  S: SampleStore + Clone + 'static,
{
  let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
  let ip = client_ip(req.headers(), peer);

  let carrier = state
    .carrier
    .lookup(ip)
    .await
    .inspect_err(|e| warn!(?ip, error = %e, "carrier lookup failed"))?;

  Ok(Json(json!({ "carrier": carrier })))
}

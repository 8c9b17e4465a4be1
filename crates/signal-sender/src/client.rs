//! Async HTTP client for the submission endpoints.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::generate::Submission;

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct SignalClient {
  client:   Client,
  base_url: String,
}

impl SignalClient {
  pub fn new(base_url: &str) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
  }

  fn url(&self, path: &str) -> String { format!("{}/api{}", self.base_url, path) }

  /// `POST /api/submit`
  pub async fn submit(&self, sample: &Submission) -> Result<(StatusCode, Value)> {
    self.post("/submit", sample).await
  }

  /// `POST /api/submit/batch`
  pub async fn submit_batch(&self, samples: &[Submission]) -> Result<(StatusCode, Value)> {
    self.post("/submit/batch", samples).await
  }

  async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(StatusCode, Value)> {
    let resp = self
      .client
      .post(self.url(path))
      .json(body)
      .send()
      .await
      .with_context(|| format!("POST {path} failed; is the server running?"))?;

    let status = resp.status();
    let body = resp
      .json()
      .await
      .with_context(|| format!("POST {path} → {status}: response is not JSON"))?;
    Ok((status, body))
  }
}

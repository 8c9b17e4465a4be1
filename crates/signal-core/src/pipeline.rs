//! Ingest pipeline: validate → deduplicate → persist → broadcast.
//!
//! Deduplication is delegated to the store's conflict-safe insert; the
//! pipeline never checks for an existing row before writing. A broadcast is
//! published only for rows that were actually inserted, so retrying a
//! submission with the same `client_id` is harmless.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
  IngestError, Rejection,
  geofence::Geofence,
  live::{LiveChannel, LiveEvent},
  payload::parse_submission,
  sample::Sample,
  store::{InsertOutcome, SampleStore},
};

/// Tunables for submission handling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestRules {
  /// Reject submissions that carry no `client_id`.
  pub require_client_id: bool,
  /// Largest accepted batch.
  pub max_batch:         usize,
}

impl Default for IngestRules {
  fn default() -> Self { Self { require_client_id: false, max_batch: 500 } }
}

/// Successful outcome of a single submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Accepted {
  Inserted(Sample),
  /// Same `client_id` seen before; reported as success, nothing broadcast.
  Duplicate,
}

/// Per-batch tally. Elements are handled independently; `inserted` counts
/// new rows only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
  pub inserted:   usize,
  pub duplicates: usize,
  pub rejected:   usize,
  /// Elements that were valid but could not be written.
  pub failed:     usize,
}

pub struct IngestPipeline<S> {
  store:    Arc<S>,
  live:     Arc<LiveChannel>,
  geofence: Geofence,
  rules:    IngestRules,
}

impl<S: SampleStore> IngestPipeline<S> {
  pub fn new(
    store: Arc<S>,
    live: Arc<LiveChannel>,
    geofence: Geofence,
    rules: IngestRules,
  ) -> Self {
    Self { store, live, geofence, rules }
  }

  /// Validate and persist one submission, broadcasting it if it is new.
  pub async fn submit(&self, payload: &Value) -> Result<Accepted, IngestError<S::Error>> {
    let sample = parse_submission(payload, &self.geofence, self.rules.require_client_id)
      .inspect_err(|r| debug!(code = r.code(), "submission rejected: {r}"))?;

    match self.store.insert_sample(sample).await {
      Ok(InsertOutcome::Inserted(sample)) => {
        info!(id = sample.id, carrier = %sample.carrier, "sample stored");
        self.live.publish(LiveEvent::NewSample(sample.clone()));
        Ok(Accepted::Inserted(sample))
      }
      Ok(InsertOutcome::Duplicate) => {
        debug!("duplicate client_id; nothing stored");
        Ok(Accepted::Duplicate)
      }
      Err(e) => {
        warn!(error = %e, "failed to store sample");
        Err(IngestError::StoreUnavailable(e))
      }
    }
  }

  /// Validate and persist every element of a JSON array.
  ///
  /// Invalid elements are skipped and counted; they never affect their
  /// neighbours. Newly inserted samples are broadcast together as one
  /// [`LiveEvent::NewSamples`]. The call fails with
  /// [`IngestError::StoreUnavailable`] only if the store rejected every write
  /// it was asked to make.
  pub async fn submit_batch(&self, payload: &Value) -> Result<BatchReport, IngestError<S::Error>> {
    let items = payload
      .as_array()
      .ok_or_else(|| Rejection::MalformedInput("expected a JSON array of samples".into()))?;
    if items.len() > self.rules.max_batch {
      return Err(
        Rejection::MalformedInput(format!(
          "batch of {} exceeds the limit of {}",
          items.len(),
          self.rules.max_batch
        ))
        .into(),
      );
    }

    let mut report = BatchReport::default();
    let mut fresh = Vec::new();
    let mut last_error = None;

    for (index, item) in items.iter().enumerate() {
      let sample = match parse_submission(item, &self.geofence, self.rules.require_client_id) {
        Ok(sample) => sample,
        Err(r) => {
          debug!(index, code = r.code(), "skipping batch element: {r}");
          report.rejected += 1;
          continue;
        }
      };

      match self.store.insert_sample(sample).await {
        Ok(InsertOutcome::Inserted(sample)) => {
          report.inserted += 1;
          fresh.push(sample);
        }
        Ok(InsertOutcome::Duplicate) => report.duplicates += 1,
        Err(e) => {
          warn!(index, error = %e, "failed to store batch element");
          report.failed += 1;
          last_error = Some(e);
        }
      }
    }

    if !fresh.is_empty() {
      self.live.publish(LiveEvent::NewSamples(fresh));
    }

    info!(
      inserted = report.inserted,
      duplicates = report.duplicates,
      rejected = report.rejected,
      failed = report.failed,
      "batch processed"
    );

    match last_error {
      Some(e) if report.inserted == 0 && report.duplicates == 0 => {
        Err(IngestError::StoreUnavailable(e))
      }
      _ => Ok(report),
    }
  }
}

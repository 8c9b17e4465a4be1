//! The `SampleStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `signal-store-sqlite`).
//! The ingest pipeline, query service and HTTP layer depend on this
//! abstraction, never on a concrete backend.

use std::future::Future;

use serde::Deserialize;

use crate::sample::{NewSample, Sample};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`SampleStore::list_samples`]. Filters are a conjunction of
/// equality matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SampleQuery {
  pub carrier:      Option<String>,
  pub network_type: Option<String>,
  /// Maximum rows to return, most recent first.
  pub limit:        Option<usize>,
}

// ─── Insert result ───────────────────────────────────────────────────────────

/// Result of a conflict-safe insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
  /// A new row was written.
  Inserted(Sample),
  /// A row with the same `client_id` already existed; nothing was written.
  Duplicate,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable sample store.
///
/// Rows are append-only: there is no update or delete path. All methods
/// return `Send` futures so the trait can be used from multi-threaded async
/// runtimes.
pub trait SampleStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert `sample` unless a row with the same `client_id` exists.
  ///
  /// The existence check and the write are a single atomic operation, so two
  /// concurrent inserts with the same `client_id` yield exactly one
  /// [`InsertOutcome::Inserted`]. Samples without a `client_id` always insert.
  fn insert_sample(
    &self,
    sample: NewSample,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Samples matching `query`, most recent first.
  fn list_samples<'a>(
    &'a self,
    query: &'a SampleQuery,
  ) -> impl Future<Output = Result<Vec<Sample>, Self::Error>> + Send + 'a;

  /// Total number of stored samples.
  fn count_samples(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

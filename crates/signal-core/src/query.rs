//! Query service: filtered, read-only access to stored samples for heatmap
//! rendering. Safe to call concurrently with ingestion.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
  sample::Sample,
  store::{SampleQuery, SampleStore},
};

/// Row limits applied to every query.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
  /// Used when the caller gives no limit.
  pub default_limit: usize,
  /// Upper bound on any caller-supplied limit.
  pub max_limit:     usize,
}

impl Default for QueryLimits {
  fn default() -> Self { Self { default_limit: 1000, max_limit: 5000 } }
}

pub struct QueryService<S> {
  store:  Arc<S>,
  limits: QueryLimits,
}

impl<S: SampleStore> QueryService<S> {
  pub fn new(store: Arc<S>, limits: QueryLimits) -> Self { Self { store, limits } }

  /// Samples matching `query`, most recent first. Blank filters are ignored
  /// and the limit is clamped to the configured maximum.
  pub async fn list_samples(&self, query: SampleQuery) -> Result<Vec<Sample>, S::Error> {
    let query = self.normalise(query);
    self.store.list_samples(&query).await
  }

  fn normalise(&self, query: SampleQuery) -> SampleQuery {
    let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
    SampleQuery {
      carrier:      non_blank(query.carrier),
      network_type: non_blank(query.network_type),
      limit:        Some(
        query
          .limit
          .unwrap_or(self.limits.default_limit)
          .min(self.limits.max_limit),
      ),
    }
  }
}

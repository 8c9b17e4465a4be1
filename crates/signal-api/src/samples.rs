//! `GET /samples` — filtered sample listing for the heatmap.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use signal_core::{Rejection, sample::Sample, store::{SampleQuery, SampleStore}};

use crate::{AppState, error::ApiError};

/// Raw query parameters. `limit` is kept as text so that `limit=` means
/// "no limit given" rather than a parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub carrier:      Option<String>,
  pub network_type: Option<String>,
  pub limit:        Option<String>,
}

impl TryFrom<ListParams> for SampleQuery {
  type Error = Rejection;

  fn try_from(params: ListParams) -> Result<Self, Rejection> {
    let limit = match params.limit.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
        Rejection::MalformedInput(format!("limit must be a non-negative integer, got {raw:?}"))
      })?),
    };
    Ok(SampleQuery { carrier: params.carrier, network_type: params.network_type, limit })
  }
}

pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Sample>>, ApiError>
where
  S: SampleStore + Clone + 'static,
{
  let query = SampleQuery::try_from(params)?;
  let samples = state
    .query
    .list_samples(query)
    .await
    .map_err(|e| ApiError::StoreUnavailable(Box::new(e)))?;
  Ok(Json(samples))
}

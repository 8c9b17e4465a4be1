//! [`SqliteStore`] — the SQLite implementation of [`SampleStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use signal_core::{
  sample::{NewSample, Sample},
  store::{InsertOutcome, SampleQuery, SampleStore},
};
use tracing::debug;

use crate::{
  Result,
  encode::{RawSample, SAMPLE_COLUMNS, decode_dt, encode_dt},
  schema::SCHEMA,
};

/// Rows returned when a query carries no limit.
const DEFAULT_LIMIT: usize = 1000;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A sample store backed by a single SQLite file.
///
/// Clones share one background connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a store that lives only as long as this handle and its clones.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    debug!("schema ready");
    Ok(())
  }
}

// ─── SampleStore impl ────────────────────────────────────────────────────────

impl SampleStore for SqliteStore {
  type Error = crate::Error;

  async fn insert_sample(&self, sample: NewSample) -> Result<InsertOutcome> {
    let created_at = sample.created_at.unwrap_or_else(|| Utc::now().trunc_subsecs(0));

    let lat             = sample.latitude;
    let lng             = sample.longitude;
    let carrier         = sample.carrier.clone();
    let network_type    = sample.network_type.clone();
    let signal_strength = sample.signal_strength;
    let download_speed  = sample.download_speed;
    let upload_speed    = sample.upload_speed;
    let client_id       = sample.client_id.clone();
    let created_at_secs = encode_dt(created_at);

    // One statement decides "new or duplicate"; no prior lookup.
    let inserted_id: Option<i64> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO samples (
             lat, lng, carrier, network_type,
             signal_strength, download_speed, upload_speed,
             client_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
           ON CONFLICT (client_id) DO NOTHING",
          rusqlite::params![
            lat,
            lng,
            carrier,
            network_type,
            signal_strength,
            download_speed,
            upload_speed,
            client_id,
            created_at_secs,
          ],
        )?;
        Ok((changed == 1).then(|| conn.last_insert_rowid()))
      })
      .await?;

    Ok(match inserted_id {
      Some(id) => InsertOutcome::Inserted(sample.into_sample(id, decode_dt(created_at_secs)?)),
      None => InsertOutcome::Duplicate,
    })
  }

  async fn list_samples(&self, query: &SampleQuery) -> Result<Vec<Sample>> {
    let carrier      = query.carrier.clone();
    let network_type = query.network_type.clone();
    let limit_val    = i64::try_from(query.limit.unwrap_or(DEFAULT_LIMIT)).unwrap_or(i64::MAX);

    let raws: Vec<RawSample> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        if carrier.is_some() {
          conds.push("carrier = ?1");
        }
        if network_type.is_some() {
          conds.push("network_type = ?2");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {SAMPLE_COLUMNS}
           FROM samples
           {where_clause}
           ORDER BY created_at DESC, id DESC
           LIMIT ?3"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![carrier.as_deref(), network_type.as_deref(), limit_val],
            RawSample::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSample::into_sample).collect()
  }

  async fn count_samples(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM samples", [], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }
}

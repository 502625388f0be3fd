//! Table-backed [`AlertCenter`]: pending alerts live in `pending_alerts`
//! until cancelled.

use chrono::Utc;
use meowlog_core::reminder::{AlertCenter, AlertId, AlertRequest};

use crate::{
  Error, Result, SqliteStore,
  encode::{RawAlert, encode_dt},
};

impl AlertCenter for SqliteStore {
  type Error = Error;

  async fn register(&self, request: AlertRequest) -> Result<()> {
    let alert_id = request.id.as_str().to_owned();
    let trigger_json = serde_json::to_string(&request.trigger)?;
    let content_json = serde_json::to_string(&request.content)?;
    let registered_at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO pending_alerts
             (alert_id, trigger_json, content_json, registered_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![alert_id, trigger_json, content_json, registered_at],
        )?;
        Ok(())
      })
      .await?;

    tracing::trace!(alert = %request.id, "alert stored");
    Ok(())
  }

  async fn cancel(&self, ids: Vec<AlertId>) -> Result<()> {
    if ids.is_empty() {
      return Ok(());
    }
    let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare("DELETE FROM pending_alerts WHERE alert_id = ?1")?;
          for id in &ids {
            stmt.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn pending(&self) -> Result<Vec<AlertRequest>> {
    let raws: Vec<RawAlert> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT alert_id, trigger_json, content_json FROM pending_alerts
           ORDER BY registered_at, alert_id",
        )?;
        let rows = stmt
          .query_map([], RawAlert::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_request).collect()
  }
}

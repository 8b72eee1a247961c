//! `Embedding` repository. Stored as a JSON-encoded float array: this
//! codebase's MySQL target has no native vector column, so a `LONGTEXT`
//! holding `serde_json`-encoded `Vec<f32>` stands in (see DESIGN.md). The
//! upsert is idempotent on `(video_id)` — re-embedding with the same model
//! overwrites the row rather than appending, matching the source's
//! per-model-version embed-once contract.

use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};

use crate::errors::Error;

pub async fn upsert_embedding(pool: &MySqlPool, video_id: &str, vector: &[f32], model: &str, embedded_at: DateTime<Utc>) -> Result<(), Error> {
  let vector_json = serde_json::to_string(vector)?;
  sqlx::query(
    r#"
      INSERT INTO embeddings (video_id, vector, model, embedded_at)
      VALUES (?, ?, ?, ?)
      ON DUPLICATE KEY UPDATE vector = VALUES(vector), model = VALUES(model), embedded_at = VALUES(embedded_at);
    "#,
  )
  .bind(video_id)
  .bind(vector_json)
  .bind(model)
  .bind(embedded_at)
  .execute(pool)
  .await?;
  Ok(())
}

pub struct EmbeddingRow {
  pub video_id: String,
  pub vector: Vec<f32>,
}

/// Embeddings for every video published within `window_days`, the input set
/// for one clustering pass.
pub async fn fetch_embeddings_for_window(pool: &MySqlPool, window_days: i64, now: DateTime<Utc>) -> Result<Vec<EmbeddingRow>, Error> {
  let since = now - chrono::Duration::days(window_days);
  let rows = sqlx::query(
    r#"
      SELECT e.video_id, e.vector
      FROM embeddings e
      INNER JOIN discovered_videos v ON v.video_id = e.video_id
      WHERE v.published_at >= ?;
    "#,
  )
  .bind(since)
  .fetch_all(pool)
  .await?;

  let mut out = Vec::with_capacity(rows.len());
  for row in rows {
    let video_id: String = row.get("video_id");
    let vector_json: String = row.get("vector");
    let vector: Vec<f32> = serde_json::from_str(&vector_json)?;
    out.push(EmbeddingRow { video_id, vector });
  }
  Ok(out)
}

/// Video IDs within the window that don't yet have an embedding row, the
/// work list for an embed pass.
pub async fn fetch_video_ids_missing_embedding(pool: &MySqlPool, window_days: i64, now: DateTime<Utc>) -> Result<Vec<(String, String, String)>, Error> {
  let since = now - chrono::Duration::days(window_days);
  let rows: Vec<(String, String, String)> = sqlx::query_as(
    r#"
      SELECT v.video_id, v.title, v.channel_title
      FROM discovered_videos v
      LEFT JOIN embeddings e ON e.video_id = v.video_id
      WHERE v.published_at >= ? AND e.video_id IS NULL;
    "#,
  )
  .bind(since)
  .fetch_all(pool)
  .await?;
  Ok(rows)
}

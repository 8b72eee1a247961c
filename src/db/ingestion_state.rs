//! `IngestionState` repository: one row per feeder tracking its cursor and
//! run counters. Last-writer-wins — a feeder run reads its cursor, does its
//! work, then overwrites the row with the new cursor and tallies.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use crate::domain::models::IngestionState;
use crate::errors::Error;

pub async fn get_cursor(pool: &MySqlPool, feeder: &str) -> Result<IngestionState, Error> {
  let row: Option<(String, i64, Option<DateTime<Utc>>, i64, i64)> = sqlx::query_as(
    r#"
      SELECT feeder, cursor_position, last_run_at, videos_added_last_run, total_videos_added
      FROM ingestion_states WHERE feeder = ?;
    "#,
  )
  .bind(feeder)
  .fetch_optional(pool)
  .await?;

  Ok(match row {
    Some((feeder, cursor_position, last_run_at, videos_added_last_run, total_videos_added)) => IngestionState {
      feeder,
      cursor_position,
      last_run_at,
      videos_added_last_run,
      total_videos_added,
    },
    None => IngestionState {
      feeder: feeder.to_string(),
      cursor_position: 0,
      last_run_at: None,
      videos_added_last_run: 0,
      total_videos_added: 0,
    },
  })
}

pub async fn upsert_cursor(
  pool: &MySqlPool,
  feeder: &str,
  cursor_position: i64,
  videos_added_this_run: i64,
  run_at: DateTime<Utc>,
) -> Result<(), Error> {
  sqlx::query(
    r#"
      INSERT INTO ingestion_states (feeder, cursor_position, last_run_at, videos_added_last_run, total_videos_added)
      VALUES (?, ?, ?, ?, ?)
      ON DUPLICATE KEY UPDATE
        cursor_position = VALUES(cursor_position),
        last_run_at = VALUES(last_run_at),
        videos_added_last_run = VALUES(videos_added_last_run),
        total_videos_added = total_videos_added + VALUES(videos_added_last_run);
    "#,
  )
  .bind(feeder)
  .bind(cursor_position)
  .bind(run_at)
  .bind(videos_added_this_run)
  .bind(videos_added_this_run)
  .execute(pool)
  .await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_state_starts_at_zero_cursor() {
    let state = IngestionState {
      feeder: "longtail".to_string(),
      cursor_position: 0,
      last_run_at: None,
      videos_added_last_run: 0,
      total_videos_added: 0,
    };
    assert_eq!(state.cursor_position, 0);
    assert!(state.last_run_at.is_none());
  }
}

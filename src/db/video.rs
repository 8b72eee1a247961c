//! `DiscoveredVideo` repository: upserts from feeder/gating output, plus the
//! read paths gating and the feeders themselves need (seen-ID preload,
//! per-channel counts, known channel IDs, corpus keywords).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use sqlx::{MySql, MySqlPool, Row};

use crate::domain::models::DiscoveredVideo;
use crate::errors::Error;

/// Inserts a newly-discovered video, or — on re-encounter — refreshes only
/// `last_seen_at` and the mutable metadata fields (title, thumbnail,
/// duration, tags) a platform-side edit can change. `first_seen_at`,
/// `feeder`, and `seed` are write-once: they describe how *this* worker
/// first found the video, not its current state.
pub async fn upsert_discovered_video(pool: &MySqlPool, video: &DiscoveredVideo) -> Result<bool, Error> {
  let tags_json = serde_json::to_string(&video.tags)?;

  let result = sqlx::query(
    r#"
      INSERT INTO discovered_videos
        (video_id, channel_id, channel_title, title, thumbnail_url, published_at,
         feeder, seed, duration_seconds, language, tags, first_seen_at, last_seen_at)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
      ON DUPLICATE KEY UPDATE
        channel_title = VALUES(channel_title),
        title = VALUES(title),
        thumbnail_url = VALUES(thumbnail_url),
        duration_seconds = COALESCE(VALUES(duration_seconds), duration_seconds),
        language = COALESCE(VALUES(language), language),
        tags = VALUES(tags),
        last_seen_at = VALUES(last_seen_at);
    "#,
  )
  .bind(&video.video_id)
  .bind(&video.channel_id)
  .bind(&video.channel_title)
  .bind(&video.title)
  .bind(&video.thumbnail_url)
  .bind(video.published_at)
  .bind(&video.feeder)
  .bind(&video.seed)
  .bind(video.duration_seconds)
  .bind(&video.language)
  .bind(tags_json)
  .bind(video.first_seen_at)
  .bind(video.last_seen_at)
  .execute(pool)
  .await?;

  // MySQL reports 1 row affected for a fresh INSERT, 2 for an UPDATE via the
  // ON DUPLICATE KEY path (with CLIENT_FOUND_ROWS unset, the default sqlx
  // uses) — so `rows_affected() == 1` is a reliable "this is new" signal.
  Ok(result.rows_affected() == 1)
}

/// Preloaded once per ingest batch: every video_id discovered in the last
/// `lookback` window, used as the gate's duplicate-rejection set.
pub async fn fetch_seen_video_ids_since(pool: &MySqlPool, lookback: Duration, now: DateTime<Utc>) -> Result<HashSet<String>, Error> {
  let since = now - lookback;
  let rows: Vec<(String,)> = sqlx::query_as("SELECT video_id FROM discovered_videos WHERE first_seen_at >= ?;")
    .bind(since)
    .fetch_all(pool)
    .await?;
  Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Preloaded once per ingest batch: per-channel acceptance counts in the
/// last 24 hours, seeding the gate's channel-cap counter.
pub async fn fetch_channel_counts_since(pool: &MySqlPool, lookback: Duration, now: DateTime<Utc>) -> Result<HashMap<String, usize>, Error> {
  let since = now - lookback;
  let rows: Vec<(String, i64)> = sqlx::query_as(
    r#"
      SELECT channel_id, CAST(COUNT(*) AS SIGNED) AS n
      FROM discovered_videos
      WHERE first_seen_at >= ?
      GROUP BY channel_id;
    "#,
  )
  .bind(since)
  .fetch_all(pool)
  .await?;
  Ok(rows.into_iter().map(|(id, n)| (id, n as usize)).collect())
}

/// Most recently seen unique channel IDs, for the free-feed feeder to sweep.
pub async fn fetch_recent_known_channel_ids(pool: &MySqlPool, limit: i64) -> Result<Vec<String>, Error> {
  let rows: Vec<(String,)> = sqlx::query_as(
    r#"
      SELECT channel_id
      FROM discovered_videos
      GROUP BY channel_id
      ORDER BY MAX(last_seen_at) DESC
      LIMIT ?;
    "#,
  )
  .bind(limit)
  .fetch_all(pool)
  .await?;
  Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn fetch_all_known_video_ids(pool: &MySqlPool) -> Result<HashSet<String>, Error> {
  let rows: Vec<(String,)> = sqlx::query_as("SELECT video_id FROM discovered_videos;").fetch_all(pool).await?;
  Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Recent titles, filtered the same way gating-eligible candidates are
/// (published within the widest window), for the long-tail feeder's corpus
/// keyword sample.
pub async fn fetch_recent_titles(pool: &MySqlPool, since: DateTime<Utc>, limit: i64) -> Result<Vec<String>, Error> {
  let rows: Vec<(String,)> = sqlx::query_as(
    r#"
      SELECT title FROM discovered_videos
      WHERE published_at >= ?
      ORDER BY first_seen_at DESC
      LIMIT ?;
    "#,
  )
  .bind(since)
  .bind(limit)
  .fetch_all(pool)
  .await?;
  Ok(rows.into_iter().map(|(t,)| t).collect())
}

pub async fn fetch_video(pool: &MySqlPool, video_id: &str) -> Result<Option<DiscoveredVideo>, Error> {
  let row = sqlx::query(
    r#"
      SELECT video_id, channel_id, channel_title, title, thumbnail_url, published_at,
             feeder, seed, duration_seconds, language, tags, first_seen_at, last_seen_at
      FROM discovered_videos WHERE video_id = ?;
    "#,
  )
  .bind(video_id)
  .fetch_optional(pool)
  .await?;

  Ok(row.map(|r| row_to_video(&r)))
}

/// Batch lookup for a clustering pass: the metadata (title, channel, age)
/// a cluster's membership list needs once its video IDs are already known.
pub async fn fetch_videos_by_ids(pool: &MySqlPool, video_ids: &[String]) -> Result<Vec<DiscoveredVideo>, Error> {
  if video_ids.is_empty() {
    return Ok(Vec::new());
  }
  let placeholders = video_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
  let query = format!(
    r#"
      SELECT video_id, channel_id, channel_title, title, thumbnail_url, published_at,
             feeder, seed, duration_seconds, language, tags, first_seen_at, last_seen_at
      FROM discovered_videos WHERE video_id IN ({placeholders});
    "#
  );
  let mut q = sqlx::query(&query);
  for id in video_ids {
    q = q.bind(id);
  }
  let rows = q.fetch_all(pool).await?;
  Ok(rows.iter().map(row_to_video).collect())
}

fn row_to_video(row: &sqlx::mysql::MySqlRow) -> DiscoveredVideo {
  let tags_json: Option<String> = row.try_get("tags").ok();
  let tags = tags_json.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default();

  DiscoveredVideo {
    video_id: row.get("video_id"),
    channel_id: row.get("channel_id"),
    channel_title: row.get("channel_title"),
    title: row.get("title"),
    thumbnail_url: row.try_get("thumbnail_url").ok(),
    published_at: row.get("published_at"),
    feeder: row.get("feeder"),
    seed: row.try_get("seed").ok(),
    duration_seconds: row.try_get("duration_seconds").ok(),
    language: row.try_get("language").ok(),
    tags,
    first_seen_at: row.get("first_seen_at"),
    last_seen_at: row.get("last_seen_at"),
  }
}

//! `VideoScore` repository: per-window upserts and the reads the scoring
//! stage and the expansion feeder need.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use crate::domain::models::VideoScore;
use crate::errors::Error;

pub async fn upsert_video_score(pool: &MySqlPool, score: &VideoScore, computed_at: DateTime<Utc>) -> Result<(), Error> {
  sqlx::query(
    r#"
      INSERT INTO video_scores
        (video_id, window_key, view_count, views_per_day, velocity_24h, velocity_7d,
         acceleration, breakout_by_subs, breakout_by_baseline, computed_at)
      VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
      ON DUPLICATE KEY UPDATE
        view_count = VALUES(view_count), views_per_day = VALUES(views_per_day),
        velocity_24h = VALUES(velocity_24h), velocity_7d = VALUES(velocity_7d),
        acceleration = VALUES(acceleration), breakout_by_subs = VALUES(breakout_by_subs),
        breakout_by_baseline = VALUES(breakout_by_baseline), computed_at = VALUES(computed_at);
    "#,
  )
  .bind(&score.video_id)
  .bind(&score.window)
  .bind(score.view_count)
  .bind(score.views_per_day)
  .bind(score.velocity_24h)
  .bind(score.velocity_7d)
  .bind(score.acceleration)
  .bind(score.breakout_by_subs)
  .bind(score.breakout_by_baseline)
  .bind(computed_at)
  .execute(pool)
  .await?;
  Ok(())
}

/// Titles of the top-`limit` recent breakout performers in `window`, sorted
/// by `breakout_by_subs` then `velocity_24h` desc — the expansion feeder's
/// seed corpus.
pub async fn fetch_top_performer_titles(pool: &MySqlPool, window: &str, limit: i64) -> Result<Vec<String>, Error> {
  let rows: Vec<(String,)> = sqlx::query_as(
    r#"
      SELECT v.title
      FROM video_scores s
      INNER JOIN discovered_videos v ON v.video_id = s.video_id
      WHERE s.window_key = ?
      ORDER BY s.breakout_by_subs DESC, s.velocity_24h DESC
      LIMIT ?;
    "#,
  )
  .bind(window)
  .bind(limit)
  .fetch_all(pool)
  .await?;
  Ok(rows.into_iter().map(|(t,)| t).collect())
}

pub struct ScoringCandidate {
  pub video_id: String,
  pub channel_id: String,
  pub published_at: DateTime<Utc>,
  pub view_count: i64,
  pub subscriber_count: Option<i64>,
  pub channel_median_views_per_day: Option<f64>,
}

/// Every video in `window` that has at least a latest snapshot, joined
/// against its channel — the per-video input set for one scoring pass.
pub async fn fetch_scoring_candidates(pool: &MySqlPool, window_days: i64, now: DateTime<Utc>) -> Result<Vec<ScoringCandidate>, Error> {
  let since = now - chrono::Duration::days(window_days);
  let rows: Vec<(String, String, DateTime<Utc>, i64, Option<i64>, Option<f64>)> = sqlx::query_as(
    r#"
      SELECT v.video_id, v.channel_id, v.published_at, latest.view_count, c.subscriber_count, c.median_views_per_day
      FROM discovered_videos v
      INNER JOIN (
        SELECT s1.video_id, s1.view_count FROM snapshots s1
        INNER JOIN (SELECT video_id, MAX(captured_at) AS max_captured FROM snapshots GROUP BY video_id) m
          ON m.video_id = s1.video_id AND m.max_captured = s1.captured_at
      ) latest ON latest.video_id = v.video_id
      LEFT JOIN channels c ON c.channel_id = v.channel_id
      WHERE v.published_at >= ?;
    "#,
  )
  .bind(since)
  .fetch_all(pool)
  .await?;

  Ok(
    rows
      .into_iter()
      .map(|(video_id, channel_id, published_at, view_count, subscriber_count, channel_median_views_per_day)| ScoringCandidate {
        video_id,
        channel_id,
        published_at,
        view_count,
        subscriber_count,
        channel_median_views_per_day,
      })
      .collect(),
  )
}

//! `Channel` repository: info upserts and the periodic baseline rollup
//! (`median_velocity_24h` / `median_views_per_day` over each channel's own
//! `7d`-window scores).

use chrono::{DateTime, Duration, Utc};
use sqlx::{MySql, MySqlPool, Row, Transaction};

use crate::domain::models::Channel;
use crate::errors::Error;

pub async fn upsert_channel_tx(
  tx: &mut Transaction<'_, MySql>,
  channel_id: &str,
  title: &str,
  subscriber_count: Option<i64>,
  channel_published_at: Option<DateTime<Utc>>,
  refreshed_at: DateTime<Utc>,
) -> Result<(), Error> {
  sqlx::query(
    r#"
      INSERT INTO channels (channel_id, title, subscriber_count, channel_published_at, last_refreshed_at)
      VALUES (?, ?, ?, ?, ?)
      ON DUPLICATE KEY UPDATE
        title = VALUES(title),
        subscriber_count = VALUES(subscriber_count),
        channel_published_at = COALESCE(VALUES(channel_published_at), channel_published_at),
        last_refreshed_at = VALUES(last_refreshed_at);
    "#,
  )
  .bind(channel_id)
  .bind(title)
  .bind(subscriber_count)
  .bind(channel_published_at)
  .bind(refreshed_at)
  .execute(&mut **tx)
  .await?;
  Ok(())
}

/// Of the given candidate channel IDs, which ones are missing entirely or
/// haven't had their info refreshed in the last 24 hours.
pub async fn filter_needing_refresh(pool: &MySqlPool, candidate_ids: &[String], now: DateTime<Utc>) -> Result<Vec<String>, Error> {
  if candidate_ids.is_empty() {
    return Ok(Vec::new());
  }
  let cutoff = now - Duration::hours(24);
  let placeholders = candidate_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");

  let mut q = sqlx::query_as::<_, (String, Option<DateTime<Utc>>)>(&format!(
    "SELECT channel_id, last_refreshed_at FROM channels WHERE channel_id IN ({placeholders});"
  ));
  for id in candidate_ids {
    q = q.bind(id);
  }
  let known: Vec<(String, Option<DateTime<Utc>>)> = q.fetch_all(pool).await?;

  let known_map: std::collections::HashMap<String, Option<DateTime<Utc>>> = known.into_iter().collect();

  Ok(
    candidate_ids
      .iter()
      .filter(|id| match known_map.get(*id) {
        None => true,
        Some(None) => true,
        Some(Some(last)) => *last < cutoff,
      })
      .cloned()
      .collect(),
  )
}

pub async fn fetch_channel(pool: &MySqlPool, channel_id: &str) -> Result<Option<Channel>, Error> {
  let row = sqlx::query(
    r#"
      SELECT channel_id, title, subscriber_count, channel_published_at,
             median_velocity_24h, median_views_per_day, video_count_for_baseline, last_refreshed_at
      FROM channels WHERE channel_id = ?;
    "#,
  )
  .bind(channel_id)
  .fetch_optional(pool)
  .await?;

  Ok(row.map(|r| Channel {
    channel_id: r.get("channel_id"),
    title: r.get("title"),
    subscriber_count: r.try_get("subscriber_count").ok(),
    channel_published_at: r.try_get("channel_published_at").ok(),
    median_velocity_24h: r.try_get("median_velocity_24h").ok(),
    median_views_per_day: r.try_get("median_views_per_day").ok(),
    video_count_for_baseline: r.get("video_count_for_baseline"),
    last_refreshed_at: r.try_get("last_refreshed_at").ok(),
  }))
}

fn median(mut values: Vec<f64>) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  values.sort_by(|a, b| a.partial_cmp(b).unwrap());
  let mid = values.len() / 2;
  if values.len() % 2 == 0 {
    Some((values[mid - 1] + values[mid]) / 2.0)
  } else {
    Some(values[mid])
  }
}

/// Recomputes `median_velocity_24h`/`median_views_per_day` for every channel
/// with >= 3 videos published in the last 90 days that carry a `7d`-window
/// score, over exactly those videos' `7d` scores.
pub async fn recompute_baselines(pool: &MySqlPool, now: DateTime<Utc>) -> Result<usize, Error> {
  let since = now - Duration::days(90);

  let rows: Vec<(String, Option<f64>, f64)> = sqlx::query_as(
    r#"
      SELECT v.channel_id, s.velocity_24h, s.views_per_day
      FROM discovered_videos v
      INNER JOIN video_scores s ON s.video_id = v.video_id AND s.window_key = '7d'
      WHERE v.published_at >= ?;
    "#,
  )
  .bind(since)
  .fetch_all(pool)
  .await?;

  let mut by_channel: std::collections::HashMap<String, (Vec<f64>, Vec<f64>)> = std::collections::HashMap::new();
  for (channel_id, velocity_24h, views_per_day) in rows {
    let entry = by_channel.entry(channel_id).or_default();
    if let Some(v) = velocity_24h {
      entry.0.push(v);
    }
    entry.1.push(views_per_day);
  }

  let mut updated = 0usize;
  let mut tx = pool.begin().await?;
  for (channel_id, (velocities, vpds)) in by_channel {
    if vpds.len() < 3 {
      continue;
    }
    let median_velocity = median(velocities);
    let median_vpd = median(vpds.clone());
    let count = vpds.len() as i64;

    sqlx::query(
      r#"
        INSERT INTO channels (channel_id, title, median_velocity_24h, median_views_per_day, video_count_for_baseline, last_baseline_at)
        VALUES (?, '', ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
          median_velocity_24h = VALUES(median_velocity_24h),
          median_views_per_day = VALUES(median_views_per_day),
          video_count_for_baseline = VALUES(video_count_for_baseline),
          last_baseline_at = VALUES(last_baseline_at);
      "#,
    )
    .bind(&channel_id)
    .bind(median_velocity)
    .bind(median_vpd)
    .bind(count)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    updated += 1;
  }
  tx.commit().await?;

  Ok(updated)
}

//! `Snapshot` repository and the tiered due-selection/leasing protocol.
//! Leasing is implemented as `SELECT ... FOR UPDATE SKIP LOCKED` inside a
//! transaction the caller holds open for the duration of the run: a second
//! worker's identical query skips any row we're still holding, and our lock
//! releases automatically at commit or rollback.

use chrono::{DateTime, Duration, Utc};
use sqlx::{MySql, MySqlPool, Row, Transaction};

use crate::config::SnapshotConfig;
use crate::domain::window::Tier;
use crate::errors::Error;

#[derive(Debug, Clone)]
pub struct DueCandidate {
  pub video_id: String,
  pub channel_id: String,
  pub tier: Tier,
}

/// Pure tier assignment: the only two inputs the spec's tier rule consults.
/// Kept outside the query layer so it's independently testable; thresholds
/// come from `SnapshotConfig` rather than being duplicated as literals.
pub fn assign_tier(published_at: DateTime<Utc>, latest_velocity_24h: Option<f64>, now: DateTime<Utc>, config: &SnapshotConfig) -> Tier {
  let age = now - published_at;
  let velocity = latest_velocity_24h.unwrap_or(0.0);

  if age <= Duration::hours(config.tier_a_age_hours) || velocity > config.tier_a_velocity_threshold {
    Tier::A
  } else if age <= Duration::days(config.tier_b_age_days) || velocity > config.tier_b_velocity_threshold {
    Tier::B
  } else {
    Tier::C
  }
}

pub fn tier_interval_hours(tier: Tier, config: &SnapshotConfig) -> i64 {
  match tier {
    Tier::A => config.tier_a_hours,
    Tier::B => config.tier_b_hours,
    Tier::C => config.tier_c_hours,
  }
}

pub fn is_due(tier: Tier, last_snapshot_at: Option<DateTime<Utc>>, config: &SnapshotConfig, now: DateTime<Utc>) -> bool {
  match last_snapshot_at {
    None => true,
    Some(last) => now - last >= Duration::hours(tier_interval_hours(tier, config)),
  }
}

struct CandidateRow {
  video_id: String,
  channel_id: String,
  published_at: DateTime<Utc>,
  latest_velocity_24h: Option<f64>,
  last_snapshot_at: Option<DateTime<Utc>>,
}

/// Starts a transaction, computes tier + due-ness for every video up to 90
/// days old, and leases (`FOR UPDATE SKIP LOCKED`) the top `max_per_run` by
/// `(tier_priority, last_snapshot_at NULLS FIRST)` — skipping rows already
/// held by a concurrent run. The transaction is returned open: the caller
/// inserts snapshot rows into it before committing, so the lease spans the
/// whole stats-fetch-and-insert cycle.
pub async fn lease_due_videos<'c>(
  pool: &'c MySqlPool,
  config: &SnapshotConfig,
  now: DateTime<Utc>,
) -> Result<(Transaction<'c, MySql>, Vec<DueCandidate>), Error> {
  let mut tx = pool.begin().await?;
  let widest_cutoff = now - Duration::days(90);

  let rows = sqlx::query(
    r#"
      SELECT v.video_id, v.channel_id, v.published_at,
             vs.velocity_24h AS latest_velocity_24h,
             snap.last_snapshot_at AS last_snapshot_at
      FROM discovered_videos v
      LEFT JOIN (
        SELECT s1.video_id, s1.velocity_24h
        FROM video_scores s1
        INNER JOIN (
          SELECT video_id, MAX(computed_at) AS max_computed_at FROM video_scores GROUP BY video_id
        ) latest ON latest.video_id = s1.video_id AND latest.max_computed_at = s1.computed_at
      ) vs ON vs.video_id = v.video_id
      LEFT JOIN (
        SELECT video_id, MAX(captured_at) AS last_snapshot_at FROM snapshots GROUP BY video_id
      ) snap ON snap.video_id = v.video_id
      WHERE v.published_at >= ?;
    "#,
  )
  .bind(widest_cutoff)
  .fetch_all(&mut *tx)
  .await?
  .into_iter()
  .map(|r| CandidateRow {
    video_id: r.get("video_id"),
    channel_id: r.get("channel_id"),
    published_at: r.get("published_at"),
    latest_velocity_24h: r.try_get("latest_velocity_24h").ok(),
    last_snapshot_at: r.try_get("last_snapshot_at").ok(),
  })
  .collect::<Vec<_>>();

  let mut due: Vec<(DueCandidate, Option<DateTime<Utc>>)> = rows
    .into_iter()
    .filter_map(|r| {
      let tier = assign_tier(r.published_at, r.latest_velocity_24h, now, config);
      if !is_due(tier, r.last_snapshot_at, config, now) {
        return None;
      }
      Some((DueCandidate { video_id: r.video_id, channel_id: r.channel_id, tier }, r.last_snapshot_at))
    })
    .collect();

  due.sort_by(|(a, a_last), (b, b_last)| {
    a.tier
      .priority()
      .cmp(&b.tier.priority())
      .then_with(|| match (a_last, b_last) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y),
      })
  });

  let ranked_ids: Vec<String> = due.iter().map(|(c, _)| c.video_id.clone()).collect();
  if ranked_ids.is_empty() {
    return Ok((tx, Vec::new()));
  }

  // Lease by locking exactly the base-table rows we already ranked, in that
  // order, skipping anything a concurrent transaction is still holding.
  let placeholders = ranked_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
  let field_placeholders = ranked_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
  let query = format!(
    r#"
      SELECT video_id FROM discovered_videos
      WHERE video_id IN ({placeholders})
      ORDER BY FIELD(video_id, {field_placeholders})
      LIMIT ?
      FOR UPDATE SKIP LOCKED;
    "#
  );

  let mut q = sqlx::query(&query);
  for id in &ranked_ids {
    q = q.bind(id);
  }
  for id in &ranked_ids {
    q = q.bind(id);
  }
  q = q.bind(config.max_per_run as i64);

  let leased_rows = q.fetch_all(&mut *tx).await?;
  let leased_ids: std::collections::HashSet<String> = leased_rows.into_iter().map(|r| r.get::<String, _>("video_id")).collect();

  let leased: Vec<DueCandidate> = due.into_iter().filter(|(c, _)| leased_ids.contains(&c.video_id)).map(|(c, _)| c).collect();

  Ok((tx, leased))
}

pub async fn insert_snapshot_tx(
  tx: &mut Transaction<'_, MySql>,
  video_id: &str,
  captured_at: DateTime<Utc>,
  view_count: i64,
  like_count: Option<i64>,
  comment_count: Option<i64>,
) -> Result<(), Error> {
  sqlx::query(
    r#"
      INSERT INTO snapshots (video_id, captured_at, view_count, like_count, comment_count)
      VALUES (?, ?, ?, ?, ?)
      ON DUPLICATE KEY UPDATE view_count = VALUES(view_count), like_count = VALUES(like_count), comment_count = VALUES(comment_count);
    "#,
  )
  .bind(video_id)
  .bind(captured_at)
  .bind(view_count)
  .bind(like_count)
  .bind(comment_count)
  .execute(&mut **tx)
  .await?;
  Ok(())
}

/// The snapshot with the largest `captured_at` at or before `before`, used
/// to derive `velocity_24h`/`velocity_7d` against a fixed horizon.
pub async fn fetch_snapshot_just_before(pool: &MySqlPool, video_id: &str, before: DateTime<Utc>) -> Result<Option<i64>, Error> {
  let row: Option<(i64,)> = sqlx::query_as(
    r#"
      SELECT view_count FROM snapshots
      WHERE video_id = ? AND captured_at <= ?
      ORDER BY captured_at DESC LIMIT 1;
    "#,
  )
  .bind(video_id)
  .bind(before)
  .fetch_optional(pool)
  .await?;
  Ok(row.map(|(v,)| v))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dt(h: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-07-28T00:00:00Z").unwrap().with_timezone(&Utc) + Duration::hours(h)
  }

  #[test]
  fn fresh_upload_is_tier_a_regardless_of_velocity() {
    let config = SnapshotConfig::default();
    let tier = assign_tier(dt(-6), None, dt(0), &config);
    assert_eq!(tier, Tier::A);
  }

  #[test]
  fn high_velocity_promotes_an_old_video_to_tier_a() {
    let config = SnapshotConfig::default();
    let tier = assign_tier(dt(-24 * 60), Some(15_000.0), dt(0), &config);
    assert_eq!(tier, Tier::A);
  }

  #[test]
  fn no_prior_snapshot_is_always_due() {
    let config = SnapshotConfig::default();
    assert!(is_due(Tier::A, None, &config, dt(0)));
  }

  #[test]
  fn due_respects_tier_interval() {
    let config = SnapshotConfig::default();
    let last = dt(-3);
    assert!(!is_due(Tier::A, Some(last), &config, dt(0)));
    assert!(is_due(Tier::A, Some(last), &config, dt(2)));
  }

  #[test]
  fn six_hour_old_video_is_tier_a_and_due_without_prior_snapshot() {
    let config = SnapshotConfig::default();
    let published = dt(-6);
    let tier = assign_tier(published, None, dt(0), &config);
    assert_eq!(tier, Tier::A);
    assert!(is_due(tier, None, &config, dt(0)));
  }
}

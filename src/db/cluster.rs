//! `Cluster`/`ClusterMembership` repository. A clustering pass fully
//! rewrites one window: each surviving cluster is upserted and its
//! membership deleted-then-reinserted, and afterwards every cluster row for
//! that window not produced by this run is deleted — the "stale" state in
//! the cluster-for-window state machine.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::errors::Error;

pub struct ClusterWrite {
  pub cluster_id: Uuid,
  pub window: String,
  pub label: String,
  pub keywords: Vec<String>,
  pub median_velocity: Option<f64>,
  pub unique_channels: i64,
  pub total_videos: i64,
  pub avg_days_old: f64,
  pub avg_channel_subs: Option<f64>,
  pub winner_concentration: f64,
  pub opportunity_score: Option<f64>,
  pub member_video_ids: Vec<String>,
  pub computed_at: DateTime<Utc>,
}

/// Upserts one cluster's row and membership, then deletes every cluster for
/// `window` whose `cluster_id` is not in `live_cluster_ids` — the whole
/// clustering pass's rewrite, in one transaction.
pub async fn rewrite_window(pool: &MySqlPool, window: &str, clusters: &[ClusterWrite]) -> Result<(usize, usize), Error> {
  let mut tx = pool.begin().await?;

  for cluster in clusters {
    let keywords_json = serde_json::to_string(&cluster.keywords)?;
    let cluster_id_str = cluster.cluster_id.to_string();

    sqlx::query(
      r#"
        INSERT INTO clusters
          (cluster_id, window_key, label, keywords, median_velocity, unique_channels, total_videos,
           avg_days_old, avg_channel_subs, winner_concentration, opportunity_score, computed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
          label = VALUES(label), keywords = VALUES(keywords), median_velocity = VALUES(median_velocity),
          unique_channels = VALUES(unique_channels), total_videos = VALUES(total_videos),
          avg_days_old = VALUES(avg_days_old), avg_channel_subs = VALUES(avg_channel_subs),
          winner_concentration = VALUES(winner_concentration), opportunity_score = VALUES(opportunity_score),
          computed_at = VALUES(computed_at);
      "#,
    )
    .bind(&cluster_id_str)
    .bind(&cluster.window)
    .bind(&cluster.label)
    .bind(keywords_json)
    .bind(cluster.median_velocity)
    .bind(cluster.unique_channels)
    .bind(cluster.total_videos)
    .bind(cluster.avg_days_old)
    .bind(cluster.avg_channel_subs)
    .bind(cluster.winner_concentration)
    .bind(cluster.opportunity_score)
    .bind(cluster.computed_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM cluster_memberships WHERE cluster_id = ?;")
      .bind(&cluster_id_str)
      .execute(&mut *tx)
      .await?;

    let mut sorted_members = cluster.member_video_ids.clone();
    sorted_members.sort();
    for (rank, video_id) in sorted_members.iter().enumerate() {
      sqlx::query(
        r#"
          INSERT INTO cluster_memberships (cluster_id, window_key, video_id, rank_in_cluster)
          VALUES (?, ?, ?, ?);
        "#,
      )
      .bind(&cluster_id_str)
      .bind(window)
      .bind(video_id)
      .bind(rank as i32)
      .execute(&mut *tx)
      .await?;
    }
  }

  let live_ids: Vec<String> = clusters.iter().map(|c| c.cluster_id.to_string()).collect();
  let deleted = if live_ids.is_empty() {
    let result = sqlx::query("DELETE cm, c FROM clusters c LEFT JOIN cluster_memberships cm ON cm.cluster_id = c.cluster_id WHERE c.window_key = ?;")
      .bind(window)
      .execute(&mut *tx)
      .await?;
    result.rows_affected() as usize
  } else {
    let placeholders = live_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let delete_memberships = format!(
      "DELETE cm FROM cluster_memberships cm INNER JOIN clusters c ON c.cluster_id = cm.cluster_id WHERE c.window_key = ? AND c.cluster_id NOT IN ({placeholders});"
    );
    let mut q = sqlx::query(&delete_memberships).bind(window);
    for id in &live_ids {
      q = q.bind(id);
    }
    q.execute(&mut *tx).await?;

    let delete_clusters = format!("DELETE FROM clusters WHERE window_key = ? AND cluster_id NOT IN ({placeholders});");
    let mut q = sqlx::query(&delete_clusters).bind(window);
    for id in &live_ids {
      q = q.bind(id);
    }
    let result = q.execute(&mut *tx).await?;
    result.rows_affected() as usize
  };

  tx.commit().await?;
  Ok((clusters.len(), deleted))
}

pub struct ClusterMemberRow {
  pub video_id: String,
  pub channel_id: String,
  pub view_count: i64,
  pub subscriber_count: Option<i64>,
  pub velocity_24h: Option<f64>,
  pub published_at: DateTime<Utc>,
}

/// Joins a cluster's membership against the latest snapshot, that video's
/// score in `window`, and its channel — exactly the inputs the ranking
/// stage aggregates over.
pub async fn fetch_cluster_members_for_ranking(pool: &MySqlPool, cluster_id: Uuid, window: &str) -> Result<Vec<ClusterMemberRow>, Error> {
  let rows: Vec<(String, String, i64, Option<i64>, Option<f64>, DateTime<Utc>)> = sqlx::query_as(
    r#"
      SELECT m.video_id, v.channel_id,
             COALESCE(latest.view_count, 0) AS view_count,
             c.subscriber_count,
             s.velocity_24h,
             v.published_at
      FROM cluster_memberships m
      INNER JOIN discovered_videos v ON v.video_id = m.video_id
      LEFT JOIN channels c ON c.channel_id = v.channel_id
      LEFT JOIN video_scores s ON s.video_id = m.video_id AND s.window_key = ?
      LEFT JOIN (
        SELECT s1.video_id, s1.view_count FROM snapshots s1
        INNER JOIN (SELECT video_id, MAX(captured_at) AS max_captured FROM snapshots GROUP BY video_id) m2
          ON m2.video_id = s1.video_id AND m2.max_captured = s1.captured_at
      ) latest ON latest.video_id = m.video_id
      WHERE m.cluster_id = ?;
    "#,
  )
  .bind(window)
  .bind(cluster_id.to_string())
  .fetch_all(pool)
  .await?;

  Ok(
    rows
      .into_iter()
      .map(|(video_id, channel_id, view_count, subscriber_count, velocity_24h, published_at)| ClusterMemberRow {
        video_id,
        channel_id,
        view_count,
        subscriber_count,
        velocity_24h,
        published_at,
      })
      .collect(),
  )
}

pub async fn update_ranking_metrics(
  pool: &MySqlPool,
  cluster_id: Uuid,
  median_velocity: Option<f64>,
  avg_channel_subs: Option<f64>,
  winner_concentration: f64,
  opportunity_score: Option<f64>,
) -> Result<(), Error> {
  sqlx::query(
    r#"
      UPDATE clusters
      SET median_velocity = ?, avg_channel_subs = ?, winner_concentration = ?, opportunity_score = ?
      WHERE cluster_id = ?;
    "#,
  )
  .bind(median_velocity)
  .bind(avg_channel_subs)
  .bind(winner_concentration)
  .bind(opportunity_score)
  .bind(cluster_id.to_string())
  .execute(pool)
  .await?;
  Ok(())
}

pub async fn fetch_cluster_ids_for_window(pool: &MySqlPool, window: &str) -> Result<Vec<Uuid>, Error> {
  let rows: Vec<(String,)> = sqlx::query_as("SELECT cluster_id FROM clusters WHERE window_key = ?;")
    .bind(window)
    .fetch_all(pool)
    .await?;
  Ok(rows.into_iter().filter_map(|(s,)| Uuid::parse_str(&s).ok()).collect())
}

//! Snapshot pipeline: lease due videos, fetch stats in batches, insert
//! snapshot rows, refresh stale channels, recompute baselines. Grounded on
//! `app/usecases/snapshot_scheduler.py`'s selection-then-persist shape; the
//! lease itself lives in `db::snapshot::lease_due_videos`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use crate::config::SnapshotConfig;
use crate::db;
use crate::errors::Error;
use crate::metrics::{log_error, SnapshotMetrics};
use crate::platform_client::PlatformClient;
use crate::quota::QuotaGovernor;

pub async fn run_snapshot(
  pool: &MySqlPool,
  client: &PlatformClient,
  governor: &mut QuotaGovernor,
  config: &SnapshotConfig,
  now: DateTime<Utc>,
) -> Result<SnapshotMetrics, Error> {
  let mut metrics = SnapshotMetrics::default();

  let (mut tx, leased) = db::snapshot::lease_due_videos(pool, config, now).await?;
  metrics.videos_due = leased.len();

  if leased.is_empty() {
    tx.commit().await?;
    metrics.quota_used = governor.used_today();
    metrics.quota_remaining = governor.remaining(now);
    return Ok(metrics);
  }

  let video_ids: Vec<String> = leased.iter().map(|c| c.video_id.clone()).collect();
  let mut touched_channel_ids: HashSet<String> = HashSet::new();

  for chunk in video_ids.chunks(config.batch_size) {
    let stats = match client.get_video_stats(governor, chunk, now).await {
      Ok(stats) => stats,
      Err(e) if e.is_quota_exceeded() => break,
      Err(e) => {
        metrics.errors += 1;
        log_error("snapshot_stats_fetch", &e);
        continue;
      }
    };

    for candidate in leased.iter().filter(|c| chunk.contains(&c.video_id)) {
      let Some(video_stats) = stats.get(&candidate.video_id) else {
        continue;
      };
      if let Err(e) = db::snapshot::insert_snapshot_tx(
        &mut tx,
        &candidate.video_id,
        now,
        video_stats.view_count,
        video_stats.like_count,
        video_stats.comment_count,
      )
      .await
      {
        metrics.errors += 1;
        log_error("snapshot_insert", &e);
        continue;
      }
      metrics.videos_snapshotted += 1;
      touched_channel_ids.insert(candidate.channel_id.clone());
    }
  }

  tx.commit().await?;

  let touched_channel_ids: Vec<String> = touched_channel_ids.into_iter().collect();
  let needing_refresh = db::channel::filter_needing_refresh(pool, &touched_channel_ids, now).await?;

  if !needing_refresh.is_empty() {
    let channel_info = client.get_channel_info_batched(governor, &needing_refresh, now).await;
    let mut tx = pool.begin().await?;
    for channel_id in &needing_refresh {
      let Some(info) = channel_info.get(channel_id) else {
        continue;
      };
      if let Err(e) = db::channel::upsert_channel_tx(&mut tx, channel_id, &info.title, info.subscriber_count, info.published_at, now).await
      {
        metrics.errors += 1;
        log_error("snapshot_channel_refresh", &e);
        continue;
      }
      metrics.channels_refreshed += 1;
    }
    tx.commit().await?;
  }

  if let Err(e) = db::channel::recompute_baselines(pool, now).await {
    metrics.errors += 1;
    log_error("snapshot_baseline_recompute", &e);
  }

  metrics.quota_used = governor.used_today();
  metrics.quota_remaining = governor.remaining(now);

  Ok(metrics)
}

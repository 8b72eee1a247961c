//! Process pipeline: embed, cluster, score, rank. Each stage is independent
//! (and independently CLI-invocable); `run_process` sequences all four the
//! way `app/usecases/process.py` drives its own stage functions.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use sqlx::MySqlPool;

use crate::clustering::{density_cluster, label_cluster, normalize_embeddings, reduce_dimensions, stable_cluster_id};
use crate::config::Config;
use crate::db;
use crate::db::cluster::ClusterWrite;
use crate::domain::models::VideoScore;
use crate::domain::window::Window;
use crate::embedding::{embedding_input, Embedder};
use crate::errors::Error;
use crate::metrics::ProcessMetrics;
use crate::ranking::{aggregate_cluster, ClusterMemberMetrics};
use crate::scoring::{score_video, ScoringInput};

pub async fn run_embed(pool: &MySqlPool, embedder: &Embedder, batch_size: usize, window: Window, now: DateTime<Utc>) -> Result<usize, Error> {
  let missing = db::embedding::fetch_video_ids_missing_embedding(pool, window.days(), now).await?;
  if missing.is_empty() {
    return Ok(0);
  }

  let texts: Vec<String> = missing.iter().map(|(_, title, channel_title)| embedding_input(title, channel_title)).collect();
  let vectors = embedder.embed_all(&texts, batch_size).await?;

  let mut embedded = 0usize;
  for ((video_id, _, _), vector) in missing.iter().zip(vectors) {
    db::embedding::upsert_embedding(pool, video_id, &vector, embedder.model_name(), now).await?;
    embedded += 1;
  }
  Ok(embedded)
}

pub async fn run_cluster(pool: &MySqlPool, config: &Config, window: Window, now: DateTime<Utc>) -> Result<(usize, usize), Error> {
  let embeddings = db::embedding::fetch_embeddings_for_window(pool, window.days(), now).await?;
  if embeddings.is_empty() {
    return db::cluster::rewrite_window(pool, window.as_str(), &[]).await;
  }

  let vectors: Vec<Vec<f32>> = embeddings.iter().map(|e| e.vector.clone()).collect();
  let normalized = normalize_embeddings(&vectors);
  let reduced = reduce_dimensions(&normalized, config.umap_n_components, config.umap_n_neighbors);
  let labels = density_cluster(&reduced, config.cluster_min_size);

  let mut groups: HashMap<i32, Vec<String>> = HashMap::new();
  for (i, label) in labels.iter().enumerate() {
    if *label < 0 {
      continue;
    }
    groups.entry(*label).or_default().push(embeddings[i].video_id.clone());
  }

  let mut writes = Vec::with_capacity(groups.len());
  for video_ids in groups.into_values() {
    let cluster_id = stable_cluster_id(window.as_str(), &video_ids);
    let members = db::video::fetch_videos_by_ids(pool, &video_ids).await?;
    if members.is_empty() {
      continue;
    }

    let total_videos = members.len() as i64;
    let unique_channels = members.iter().map(|v| v.channel_id.clone()).collect::<HashSet<_>>().len() as i64;
    let avg_days_old =
      members.iter().map(|v| ((now - v.published_at).num_milliseconds() as f64 / 86_400_000.0).max(0.0)).sum::<f64>() / total_videos as f64;

    let titles: Vec<String> = members.iter().map(|v| v.title.clone()).collect();
    let labeling = label_cluster(&titles);

    writes.push(ClusterWrite {
      cluster_id,
      window: window.as_str().to_string(),
      label: labeling.label,
      keywords: labeling.keywords,
      median_velocity: None,
      unique_channels,
      total_videos,
      avg_days_old,
      avg_channel_subs: None,
      winner_concentration: 0.0,
      opportunity_score: None,
      member_video_ids: video_ids,
      computed_at: now,
    });
  }

  db::cluster::rewrite_window(pool, window.as_str(), &writes).await
}

pub async fn run_score(pool: &MySqlPool, window: Window, now: DateTime<Utc>) -> Result<usize, Error> {
  let candidates = db::score::fetch_scoring_candidates(pool, window.days(), now).await?;

  let mut scored = 0usize;
  for candidate in candidates {
    let snapshot_24h_ago = db::snapshot::fetch_snapshot_just_before(pool, &candidate.video_id, now - Duration::hours(24)).await?;
    let snapshot_48h_ago = db::snapshot::fetch_snapshot_just_before(pool, &candidate.video_id, now - Duration::hours(48)).await?;
    let snapshot_7d_ago = db::snapshot::fetch_snapshot_just_before(pool, &candidate.video_id, now - Duration::days(7)).await?;

    // The velocity of the period before the current one, derived purely
    // from snapshots at fixed horizons (not from the previously written
    // score row) so acceleration stays a pure function of (snapshots, now)
    // and back-to-back runs over unchanged data are idempotent.
    let previous_velocity_24h = match (snapshot_24h_ago, snapshot_48h_ago) {
      (Some(v24), Some(v48)) => Some((v24 - v48) as f64),
      _ => None,
    };

    let input = ScoringInput {
      view_count: candidate.view_count,
      published_at: candidate.published_at,
      snapshot_24h_ago,
      snapshot_7d_ago,
      previous_velocity_24h,
      subscriber_count: candidate.subscriber_count,
      channel_median_views_per_day: candidate.channel_median_views_per_day,
    };
    let output = score_video(&input, now);

    let score = VideoScore {
      video_id: candidate.video_id,
      window: window.as_str().to_string(),
      view_count: candidate.view_count,
      views_per_day: output.views_per_day,
      velocity_24h: output.velocity_24h,
      velocity_7d: output.velocity_7d,
      acceleration: output.acceleration,
      breakout_by_subs: output.breakout_by_subs,
      breakout_by_baseline: output.breakout_by_baseline,
      computed_at: Some(now),
    };
    db::score::upsert_video_score(pool, &score, now).await?;
    scored += 1;
  }

  Ok(scored)
}

pub async fn run_rank(pool: &MySqlPool, window: Window) -> Result<usize, Error> {
  let cluster_ids = db::cluster::fetch_cluster_ids_for_window(pool, window.as_str()).await?;

  let mut ranked = 0usize;
  for cluster_id in cluster_ids {
    let members = db::cluster::fetch_cluster_members_for_ranking(pool, cluster_id, window.as_str()).await?;
    let metrics: Vec<ClusterMemberMetrics> = members
      .iter()
      .map(|m| ClusterMemberMetrics {
        velocity_24h: m.velocity_24h,
        subscriber_count: m.subscriber_count,
        view_count: m.view_count,
      })
      .collect();
    let aggregate = aggregate_cluster(&metrics);

    db::cluster::update_ranking_metrics(
      pool,
      cluster_id,
      aggregate.median_velocity,
      aggregate.avg_subs,
      aggregate.winner_concentration,
      aggregate.opportunity_score,
    )
    .await?;
    ranked += 1;
  }

  Ok(ranked)
}

pub async fn run_process(pool: &MySqlPool, embedder: &Embedder, config: &Config, window: Window, now: DateTime<Utc>) -> Result<ProcessMetrics, Error> {
  let mut metrics = ProcessMetrics::default();

  metrics.videos_embedded = run_embed(pool, embedder, config.embedding_batch_size, window, now).await?;

  let (clusters_written, clusters_deleted) = run_cluster(pool, config, window, now).await?;
  metrics.clusters_written = clusters_written;
  metrics.clusters_deleted = clusters_deleted;

  metrics.videos_scored = run_score(pool, window, now).await?;
  metrics.clusters_ranked = run_rank(pool, window).await?;

  Ok(metrics)
}

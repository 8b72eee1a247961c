//! Persistence layer. One `MySqlPool`, lazily initialized and schema-checked
//! on first use, same `OnceCell`-guarded pattern this codebase has always
//! used for its database handle. Repositories are grouped by entity, each
//! module owning the queries for one of the typed stores named in the data
//! model: video, snapshot, channel, embedding, cluster, score,
//! ingestion-state.

pub mod channel;
pub mod cluster;
pub mod embedding;
pub mod ingestion_state;
pub mod score;
pub mod snapshot;
pub mod video;

use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use tokio::sync::OnceCell;

use crate::errors::Error;

static POOL: OnceCell<MySqlPool> = OnceCell::const_new();

async fn ensure_schema(pool: &MySqlPool) -> Result<(), Error> {
  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS discovered_videos (
        video_id VARCHAR(32) PRIMARY KEY,
        channel_id VARCHAR(32) NOT NULL,
        channel_title VARCHAR(255) NOT NULL,
        title TEXT NOT NULL,
        thumbnail_url TEXT NULL,
        published_at TIMESTAMP(3) NOT NULL,
        feeder VARCHAR(32) NOT NULL,
        seed VARCHAR(255) NULL,
        duration_seconds BIGINT NULL,
        language VARCHAR(16) NULL,
        tags TEXT NULL,
        first_seen_at TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3),
        last_seen_at TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3) ON UPDATE CURRENT_TIMESTAMP(3),
        KEY idx_discovered_videos_channel (channel_id),
        KEY idx_discovered_videos_first_seen (first_seen_at),
        KEY idx_discovered_videos_published (published_at)
      );
    "#,
  )
  .execute(pool)
  .await?;

  // Append-only; `captured_at DESC` on the composite index serves both the
  // "latest snapshot" and "snapshot just before T" lookups without a sort.
  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS snapshots (
        video_id VARCHAR(32) NOT NULL,
        captured_at TIMESTAMP(3) NOT NULL,
        view_count BIGINT NOT NULL,
        like_count BIGINT NULL,
        comment_count BIGINT NULL,
        PRIMARY KEY (video_id, captured_at),
        KEY idx_snapshots_video_captured_desc (video_id, captured_at DESC)
      );
    "#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS channels (
        channel_id VARCHAR(32) PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        subscriber_count BIGINT NULL,
        channel_published_at TIMESTAMP(3) NULL,
        median_velocity_24h DOUBLE NULL,
        median_views_per_day DOUBLE NULL,
        video_count_for_baseline BIGINT NOT NULL DEFAULT 0,
        last_refreshed_at TIMESTAMP(3) NULL,
        last_baseline_at TIMESTAMP(3) NULL
      );
    "#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS embeddings (
        video_id VARCHAR(32) PRIMARY KEY,
        vector LONGTEXT NOT NULL,
        model VARCHAR(64) NOT NULL,
        embedded_at TIMESTAMP(3) NOT NULL
      );
    "#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS clusters (
        cluster_id CHAR(36) PRIMARY KEY,
        window_key VARCHAR(8) NOT NULL,
        label VARCHAR(255) NOT NULL,
        keywords TEXT NOT NULL,
        median_velocity DOUBLE NULL,
        unique_channels BIGINT NOT NULL,
        total_videos BIGINT NOT NULL,
        avg_days_old DOUBLE NOT NULL,
        avg_channel_subs DOUBLE NULL,
        winner_concentration DOUBLE NOT NULL,
        opportunity_score DOUBLE NULL,
        computed_at TIMESTAMP(3) NOT NULL,
        KEY idx_clusters_window (window_key)
      );
    "#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS cluster_memberships (
        cluster_id CHAR(36) NOT NULL,
        window_key VARCHAR(8) NOT NULL,
        video_id VARCHAR(32) NOT NULL,
        rank_in_cluster INT NOT NULL,
        PRIMARY KEY (cluster_id, video_id),
        KEY idx_cluster_memberships_video (video_id),
        KEY idx_cluster_memberships_window (window_key)
      );
    "#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS video_scores (
        video_id VARCHAR(32) NOT NULL,
        window_key VARCHAR(8) NOT NULL,
        view_count BIGINT NOT NULL,
        views_per_day DOUBLE NOT NULL,
        velocity_24h DOUBLE NULL,
        velocity_7d DOUBLE NULL,
        acceleration DOUBLE NULL,
        breakout_by_subs DOUBLE NULL,
        breakout_by_baseline DOUBLE NULL,
        computed_at TIMESTAMP(3) NOT NULL,
        PRIMARY KEY (video_id, window_key),
        KEY idx_video_scores_window_breakout (window_key, breakout_by_subs),
        KEY idx_video_scores_window_velocity (window_key, velocity_24h)
      );
    "#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS ingestion_states (
        feeder VARCHAR(32) PRIMARY KEY,
        cursor_position BIGINT NOT NULL DEFAULT 0,
        last_run_at TIMESTAMP(3) NULL,
        videos_added_last_run BIGINT NOT NULL DEFAULT 0,
        total_videos_added BIGINT NOT NULL DEFAULT 0
      );
    "#,
  )
  .execute(pool)
  .await?;

  Ok(())
}

pub async fn get_pool(database_url: &str) -> Result<&'static MySqlPool, Error> {
  POOL
    .get_or_try_init(|| async {
      let pool = MySqlPoolOptions::new().max_connections(5).connect(database_url).await?;
      ensure_schema(&pool).await?;
      Ok::<_, Error>(pool)
    })
    .await
}

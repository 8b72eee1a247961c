//! Ingest pipeline: feeders → gating → video upsert → cursor persistence.
//! Grounded on `app/usecases/ingest.py`'s run-once shape: preload
//! repository state once, run the feeders, gate in one pass, upsert
//! accepted candidates, persist the advanced cursor.

use chrono::{DateTime, Duration, Utc};
use sqlx::MySqlPool;

use crate::clustering::extract_keywords;
use crate::config::Config;
use crate::db;
use crate::domain::models::DiscoveredVideo;
use crate::domain::window::Window;
use crate::errors::Error;
use crate::feeders::{free_feed, intent_seed};
use crate::feeders::runner::{run_all_feeders, FeederContext, FeederSizing};
use crate::gating::{Gate, GatingCandidate, RejectionReason};
use crate::metrics::{log_error, IngestMetrics};
use crate::platform_client::PlatformClient;
use crate::quota::QuotaGovernor;

const CORPUS_TITLE_SAMPLE: i64 = 200;
const CORPUS_KEYWORD_COUNT: usize = 20;
const TOP_PERFORMER_SAMPLE: i64 = 50;
const KNOWN_CHANNEL_SAMPLE: i64 = 50;
const DUPLICATE_LOOKBACK_DAYS: i64 = 7;
const CHANNEL_CAP_LOOKBACK_HOURS: i64 = 24;

pub async fn run_ingest(
  pool: &MySqlPool,
  client: &PlatformClient,
  governor: &mut QuotaGovernor,
  config: &Config,
  window: Window,
  now: DateTime<Utc>,
) -> Result<IngestMetrics, Error> {
  let mut metrics = IngestMetrics::default();

  let cursor_state = db::ingestion_state::get_cursor(pool, intent_seed::FEEDER_NAME).await?;
  let top_performer_titles = db::score::fetch_top_performer_titles(pool, window.as_str(), TOP_PERFORMER_SAMPLE).await?;
  let corpus_titles = db::video::fetch_recent_titles(pool, now - Duration::days(90), CORPUS_TITLE_SAMPLE).await?;
  let corpus_keywords = extract_keywords(&corpus_titles, CORPUS_KEYWORD_COUNT);
  let known_channel_ids = db::video::fetch_recent_known_channel_ids(pool, KNOWN_CHANNEL_SAMPLE).await?;
  let existing_video_ids = db::video::fetch_all_known_video_ids(pool).await?;

  let context = FeederContext {
    intent_seed_cursor: cursor_state.cursor_position,
    top_performer_titles,
    corpus_keywords,
    known_channel_ids,
    existing_video_ids,
  };

  let sizing = FeederSizing {
    seeds_per_run: config.ingest.seeds_per_run,
    videos_per_seed: config.ingest.videos_per_seed as u32,
    expansion_videos_per_query: config.ingest.videos_per_seed as u32,
    longtail_queries: config.ingest.longtail_queries,
    longtail_videos_per_query: config.ingest.videos_per_seed as u32,
    free_feed_max_per_channel: config.ingest.max_per_channel,
  };

  let outcome = run_all_feeders(client, governor, window, context, &sizing, now).await;

  let seen_video_ids = db::video::fetch_seen_video_ids_since(pool, Duration::days(DUPLICATE_LOOKBACK_DAYS), now).await?;
  let channel_counts = db::video::fetch_channel_counts_since(pool, Duration::hours(CHANNEL_CAP_LOOKBACK_HOURS), now).await?;
  let mut gate = Gate::new(seen_video_ids, channel_counts, config.ingest.max_per_channel);

  let window_min_views = window.config().min_views;

  for candidate in outcome.candidates {
    metrics.videos_seen += 1;

    // Free-feed candidates carry a view count up front; apply the
    // per-window minimum to those before spending a gating slot on them.
    // Search-sourced candidates have no view count yet (it arrives at the
    // next snapshot) so this filter cannot apply to them here.
    if let Some(view_count) = candidate.view_count {
      if view_count < window_min_views {
        continue;
      }
    }

    let gating_candidate = GatingCandidate {
      video_id: candidate.video_id.clone(),
      channel_id: candidate.channel_id.clone(),
      feeder_source: candidate.feeder_source.to_string(),
      published_at: candidate.published_at,
    };
    let decision = gate.evaluate(&gating_candidate, now);

    if !decision.accepted {
      match decision.rejection_reason {
        Some(RejectionReason::Duplicate) => metrics.rejected_duplicate += 1,
        Some(RejectionReason::TooOld) => metrics.rejected_too_old += 1,
        Some(RejectionReason::ChannelCap) => metrics.rejected_channel_cap += 1,
        None => {}
      }
      continue;
    }

    let video = DiscoveredVideo {
      video_id: candidate.video_id.clone(),
      channel_id: candidate.channel_id.clone(),
      channel_title: candidate.channel_title.clone(),
      title: candidate.title.clone(),
      thumbnail_url: candidate.thumbnail_url.clone(),
      published_at: candidate.published_at,
      feeder: candidate.feeder_source.to_string(),
      seed: candidate.seed.clone(),
      duration_seconds: None,
      language: None,
      tags: Vec::new(),
      first_seen_at: now,
      last_seen_at: now,
    };

    match db::video::upsert_discovered_video(pool, &video).await {
      Ok(is_new) => {
        if is_new {
          metrics.videos_inserted += 1;
          if let Some(view_count) = candidate.view_count {
            if let Err(e) = persist_initial_snapshot(pool, &video.video_id, view_count, now).await {
              metrics.errors += 1;
              log_error("ingest_initial_snapshot", &e);
            }
          }
        }
      }
      Err(e) => {
        metrics.errors += 1;
        log_error("ingest_upsert", &e);
      }
    }
  }

  db::ingestion_state::upsert_cursor(pool, intent_seed::FEEDER_NAME, outcome.new_intent_seed_cursor, outcome.counts.intent_seed as i64, now)
    .await?;

  metrics.quota_used = governor.used_today();
  metrics.quota_remaining = governor.remaining(now);

  Ok(metrics)
}

/// Standalone variant of the free-feed feeder: zero quota cost, no search
/// feeders, no cursor to advance. Backs the `rss-expand` subcommand.
pub async fn run_rss_expand(pool: &MySqlPool, client: &PlatformClient, config: &Config, window: Window, now: DateTime<Utc>) -> Result<IngestMetrics, Error> {
  let mut metrics = IngestMetrics::default();

  let known_channel_ids = db::video::fetch_recent_known_channel_ids(pool, KNOWN_CHANNEL_SAMPLE).await?;
  let existing_video_ids = db::video::fetch_all_known_video_ids(pool).await?;

  let candidates = free_feed::run(client, &known_channel_ids, &existing_video_ids, config.ingest.max_per_channel).await;

  let seen_video_ids = db::video::fetch_seen_video_ids_since(pool, Duration::days(DUPLICATE_LOOKBACK_DAYS), now).await?;
  let channel_counts = db::video::fetch_channel_counts_since(pool, Duration::hours(CHANNEL_CAP_LOOKBACK_HOURS), now).await?;
  let mut gate = Gate::new(seen_video_ids, channel_counts, config.ingest.max_per_channel);

  let window_min_views = window.config().min_views;

  for candidate in candidates {
    metrics.videos_seen += 1;

    if let Some(view_count) = candidate.view_count {
      if view_count < window_min_views {
        continue;
      }
    }

    let gating_candidate = GatingCandidate {
      video_id: candidate.video_id.clone(),
      channel_id: candidate.channel_id.clone(),
      feeder_source: candidate.feeder_source.to_string(),
      published_at: candidate.published_at,
    };
    let decision = gate.evaluate(&gating_candidate, now);

    if !decision.accepted {
      match decision.rejection_reason {
        Some(RejectionReason::Duplicate) => metrics.rejected_duplicate += 1,
        Some(RejectionReason::TooOld) => metrics.rejected_too_old += 1,
        Some(RejectionReason::ChannelCap) => metrics.rejected_channel_cap += 1,
        None => {}
      }
      continue;
    }

    let video = DiscoveredVideo {
      video_id: candidate.video_id.clone(),
      channel_id: candidate.channel_id.clone(),
      channel_title: candidate.channel_title.clone(),
      title: candidate.title.clone(),
      thumbnail_url: candidate.thumbnail_url.clone(),
      published_at: candidate.published_at,
      feeder: candidate.feeder_source.to_string(),
      seed: candidate.seed.clone(),
      duration_seconds: None,
      language: None,
      tags: Vec::new(),
      first_seen_at: now,
      last_seen_at: now,
    };

    match db::video::upsert_discovered_video(pool, &video).await {
      Ok(is_new) => {
        if is_new {
          metrics.videos_inserted += 1;
          if let Some(view_count) = candidate.view_count {
            if let Err(e) = persist_initial_snapshot(pool, &video.video_id, view_count, now).await {
              metrics.errors += 1;
              log_error("rss_expand_initial_snapshot", &e);
            }
          }
        }
      }
      Err(e) => {
        metrics.errors += 1;
        log_error("rss_expand_upsert", &e);
      }
    }
  }

  Ok(metrics)
}

/// A free-feed-sourced video arrives with a view count; persist it as the
/// video's first `Snapshot` row so it has a baseline before its first
/// scheduled snapshot (Decided Open Question, see DESIGN.md).
async fn persist_initial_snapshot(pool: &MySqlPool, video_id: &str, view_count: i64, now: DateTime<Utc>) -> Result<(), Error> {
  let mut tx = pool.begin().await?;
  db::snapshot::insert_snapshot_tx(&mut tx, video_id, now, view_count, None, None).await?;
  tx.commit().await?;
  Ok(())
}

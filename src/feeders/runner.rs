//! Runs all four feeders in a fixed order, collecting their candidates into
//! one tagged list. Each feeder already isolates `QuotaExceeded` internally
//! and returns whatever it produced before running out; this runner adds no
//! further error handling beyond that. Grounded on `app/feeders/runner.py`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::{expansion, free_feed, intent_seed, longtail, Candidate};
use crate::domain::window::Window;
use crate::platform_client::PlatformClient;
use crate::quota::QuotaGovernor;

/// Repository-fetched state the feeders need but don't fetch themselves.
pub struct FeederContext {
  pub intent_seed_cursor: i64,
  pub top_performer_titles: Vec<String>,
  pub corpus_keywords: Vec<String>,
  pub known_channel_ids: Vec<String>,
  pub existing_video_ids: HashSet<String>,
}

pub struct FeederSizing {
  pub seeds_per_run: usize,
  pub videos_per_seed: u32,
  pub expansion_videos_per_query: u32,
  pub longtail_queries: usize,
  pub longtail_videos_per_query: u32,
  pub free_feed_max_per_channel: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeederCounts {
  pub intent_seed: usize,
  pub expansion: usize,
  pub longtail: usize,
  pub free_feed: usize,
}

impl FeederCounts {
  pub fn total(&self) -> usize {
    self.intent_seed + self.expansion + self.longtail + self.free_feed
  }
}

pub struct FeederRunOutcome {
  pub candidates: Vec<Candidate>,
  pub counts: FeederCounts,
  pub new_intent_seed_cursor: i64,
}

pub async fn run_all_feeders(
  client: &PlatformClient,
  governor: &mut QuotaGovernor,
  window: Window,
  context: FeederContext,
  sizing: &FeederSizing,
  now: DateTime<Utc>,
) -> FeederRunOutcome {
  let mut candidates = Vec::new();
  let mut counts = FeederCounts::default();

  let intent_outcome = intent_seed::run(
    client,
    governor,
    window,
    context.intent_seed_cursor,
    sizing.seeds_per_run,
    sizing.videos_per_seed,
    now,
  )
  .await;
  counts.intent_seed = intent_outcome.candidates.len();
  candidates.extend(intent_outcome.candidates);

  let expansion_candidates =
    expansion::run(client, governor, window, &context.top_performer_titles, sizing.expansion_videos_per_query, now).await;
  counts.expansion = expansion_candidates.len();
  candidates.extend(expansion_candidates);

  let longtail_candidates = longtail::run(
    client,
    governor,
    window,
    &context.corpus_keywords,
    sizing.longtail_queries,
    sizing.longtail_videos_per_query,
    now,
  )
  .await;
  counts.longtail = longtail_candidates.len();
  candidates.extend(longtail_candidates);

  let free_feed_candidates =
    free_feed::run(client, &context.known_channel_ids, &context.existing_video_ids, sizing.free_feed_max_per_channel).await;
  counts.free_feed = free_feed_candidates.len();
  candidates.extend(free_feed_candidates);

  FeederRunOutcome { candidates, counts, new_intent_seed_cursor: intent_outcome.new_cursor }
}

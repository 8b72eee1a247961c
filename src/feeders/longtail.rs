//! Tertiary feeder: combines intent seeds with keywords pulled from our own
//! corpus into long-tail queries. Grounded on `app/feeders/longtail.py`; the
//! corpus keyword extraction itself (frequency count over recent titles
//! without embeddings) is left to the caller, since it requires a video
//! repository read.

use chrono::{DateTime, Duration, Utc};

use super::query_extraction::generate_long_tail_queries;
use super::Candidate;
use crate::domain::window::Window;
use crate::platform_client::PlatformClient;
use crate::quota::QuotaGovernor;

pub const FEEDER_NAME: &str = "longtail";

const DEFAULT_KEYWORDS: &[&str] = &["gaming", "cooking", "fitness", "tech", "music", "art", "travel"];

pub async fn run(
  client: &PlatformClient,
  governor: &mut QuotaGovernor,
  window: Window,
  corpus_keywords: &[String],
  queries_per_run: usize,
  videos_per_query: u32,
  now: DateTime<Utc>,
) -> Vec<Candidate> {
  let config = window.config();
  let published_after = now - Duration::days(config.days);

  let keywords: Vec<String> =
    if corpus_keywords.is_empty() { DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect() } else { corpus_keywords.to_vec() };

  let queries = generate_long_tail_queries(&keywords, queries_per_run);

  let mut candidates = Vec::new();
  for query in queries {
    match client.search_videos(governor, &query, videos_per_query, Some(published_after), "date", now).await {
      Ok(results) => {
        for r in results {
          candidates.push(Candidate::from_search_result(FEEDER_NAME, r, Some(query.clone())));
        }
      }
      Err(e) if e.is_quota_exceeded() => break,
      Err(_) => continue,
    }
  }
  candidates
}

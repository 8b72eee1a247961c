//! Secondary feeder: derives new search queries from the titles of recent
//! top performers. Grounded on `app/feeders/expansion.py`; the top-performer
//! selection itself (sort by breakout then velocity, take top N) is left to
//! the caller, since it requires a score-repository read.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;

use super::query_extraction::extract_query_terms;
use super::Candidate;
use crate::domain::window::Window;
use crate::platform_client::PlatformClient;
use crate::quota::QuotaGovernor;

pub const FEEDER_NAME: &str = "graph_expand";

/// Extracts query phrases from `titles`, ranks them by frequency, and
/// shuffles the top 15 down to at most `limit` queries. Pure so the
/// selection logic is testable without a platform client.
pub fn select_queries(titles: &[String], limit: usize) -> Vec<String> {
  let mut term_counts: HashMap<String, usize> = HashMap::new();
  for title in titles {
    for term in extract_query_terms(title) {
      *term_counts.entry(term).or_insert(0) += 1;
    }
  }

  let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
  ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  let mut unique_queries: Vec<String> = ranked.into_iter().take(15).map(|(q, _)| q).collect();

  let mut rng = rand::rng();
  unique_queries.shuffle(&mut rng);
  unique_queries.truncate(limit);
  unique_queries
}

pub async fn run(
  client: &PlatformClient,
  governor: &mut QuotaGovernor,
  window: Window,
  top_performer_titles: &[String],
  videos_per_query: u32,
  now: DateTime<Utc>,
) -> Vec<Candidate> {
  if top_performer_titles.is_empty() {
    return Vec::new();
  }

  let config = window.config();
  let published_after = now - Duration::days(config.days);
  let queries = select_queries(top_performer_titles, 10);

  let mut candidates = Vec::new();
  for query in queries {
    match client.search_videos(governor, &query, videos_per_query, Some(published_after), "relevance", now).await {
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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn select_queries_returns_nothing_for_no_titles() {
    assert!(select_queries(&[], 10).is_empty());
  }

  #[test]
  fn select_queries_respects_the_limit() {
    let titles = vec![
      "How to Bake Sourdough Bread".to_string(),
      "Sourdough Bread Troubleshooting Guide".to_string(),
      "Easy Sourdough Bread for Beginners".to_string(),
    ];
    let queries = select_queries(&titles, 3);
    assert!(queries.len() <= 3);
  }
}

//! Primary feeder: rotates through the fixed intent-seed list with a
//! persisted cursor so each run covers a fresh slice. Grounded on
//! `app/feeders/intent_seed.py`.

use chrono::{DateTime, Duration, Utc};

use super::seeds::INTENT_SEEDS;
use super::Candidate;
use crate::domain::window::Window;
use crate::platform_client::PlatformClient;
use crate::quota::QuotaGovernor;

pub const FEEDER_NAME: &str = "intent_seed";

pub struct IntentSeedOutcome {
  pub candidates: Vec<Candidate>,
  pub seeds_processed: usize,
  pub new_cursor: i64,
}

/// Resolves the slice of seeds to process for this run. Wraps back to the
/// start of the list (rather than producing an empty slice) once the
/// cursor has advanced past the end.
fn seeds_for_cursor(cursor: i64, seeds_per_run: usize) -> (i64, &'static [&'static str]) {
  let len = INTENT_SEEDS.len();
  let start = (cursor.max(0) as usize).min(len);
  let end = (start + seeds_per_run).min(len);

  if start >= len {
    let wrapped_end = seeds_per_run.min(len);
    (0, &INTENT_SEEDS[..wrapped_end])
  } else {
    (start as i64, &INTENT_SEEDS[start..end])
  }
}

pub async fn run(
  client: &PlatformClient,
  governor: &mut QuotaGovernor,
  window: Window,
  cursor: i64,
  seeds_per_run: usize,
  videos_per_seed: u32,
  now: DateTime<Utc>,
) -> IntentSeedOutcome {
  let (effective_cursor, seeds_to_process) = seeds_for_cursor(cursor, seeds_per_run);
  let config = window.config();
  let published_after = now - Duration::days(config.days);

  let mut candidates = Vec::new();
  let mut seeds_processed = 0usize;

  for seed in seeds_to_process {
    match client.search_videos(governor, seed, videos_per_seed, Some(published_after), config.order, now).await {
      Ok(results) => {
        for r in results {
          candidates.push(Candidate::from_search_result(FEEDER_NAME, r, Some((*seed).to_string())));
        }
        seeds_processed += 1;
      }
      Err(e) if e.is_quota_exceeded() => break,
      Err(_) => continue,
    }
  }

  let mut new_cursor = effective_cursor + seeds_processed as i64;
  if new_cursor as usize >= INTENT_SEEDS.len() {
    new_cursor = 0;
  }

  IntentSeedOutcome { candidates, seeds_processed, new_cursor }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cursor_slices_a_contiguous_window() {
    let (cursor, slice) = seeds_for_cursor(0, 5);
    assert_eq!(cursor, 0);
    assert_eq!(slice.len(), 5);
    assert_eq!(slice, &INTENT_SEEDS[0..5]);
  }

  #[test]
  fn cursor_wraps_once_past_the_end_of_the_list() {
    let len = INTENT_SEEDS.len() as i64;
    let (cursor, slice) = seeds_for_cursor(len, 5);
    assert_eq!(cursor, 0);
    assert_eq!(slice, &INTENT_SEEDS[0..5]);
  }

  #[test]
  fn cursor_near_the_end_returns_a_short_slice() {
    let len = INTENT_SEEDS.len();
    let (cursor, slice) = seeds_for_cursor((len - 2) as i64, 5);
    assert_eq!(cursor, (len - 2) as i64);
    assert_eq!(slice.len(), 2);
  }
}

use chrono::{DateTime, Utc};

pub fn compute_views_per_day(view_count: i64, published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
  let age_seconds = (now - published_at).num_milliseconds() as f64 / 1000.0;
  let age_days = (age_seconds / 86_400.0).max(0.01);
  view_count as f64 / age_days
}

pub fn compute_velocity(current_view_count: i64, previous_view_count: Option<i64>) -> Option<i64> {
  previous_view_count.map(|prev| current_view_count - prev)
}

pub fn compute_acceleration(velocity_current: Option<f64>, velocity_previous: Option<f64>) -> Option<f64> {
  match (velocity_current, velocity_previous) {
    (Some(cur), Some(prev)) if prev != 0.0 => Some(cur / prev),
    _ => None,
  }
}

pub fn compute_breakout_by_subs(views_per_day: f64, subscriber_count: Option<i64>, min_subs: i64) -> Option<f64> {
  if views_per_day <= 0.0 {
    return None;
  }
  let effective_subs = min_subs.max(subscriber_count.unwrap_or(0)) as f64;
  Some(views_per_day / effective_subs)
}

pub fn compute_breakout_by_baseline(views_per_day: f64, channel_median_vpd: Option<f64>) -> Option<f64> {
  if views_per_day <= 0.0 {
    return None;
  }
  match channel_median_vpd {
    Some(vpd) if vpd > 0.0 => Some(views_per_day / vpd),
    _ => None,
  }
}

/// Input snapshot used to derive a `VideoScore` for one video in one window.
/// `previous_velocity_24h` is the velocity of the 24h period immediately
/// before the current one (i.e. views gained between `now-48h` and
/// `now-24h`), derived from snapshots rather than a previously written
/// score row — this keeps `acceleration` a pure function of
/// `(snapshots, now)`, so re-scoring unchanged data twice in a row yields
/// identical output.
pub struct ScoringInput {
  pub view_count: i64,
  pub published_at: DateTime<Utc>,
  pub snapshot_24h_ago: Option<i64>,
  pub snapshot_7d_ago: Option<i64>,
  pub previous_velocity_24h: Option<f64>,
  pub subscriber_count: Option<i64>,
  pub channel_median_views_per_day: Option<f64>,
}

pub struct ScoringOutput {
  pub views_per_day: f64,
  pub velocity_24h: Option<f64>,
  pub velocity_7d: Option<f64>,
  pub acceleration: Option<f64>,
  pub breakout_by_subs: Option<f64>,
  pub breakout_by_baseline: Option<f64>,
}

pub const MIN_SUBS_FOR_BREAKOUT: i64 = 100;

pub fn score_video(input: &ScoringInput, now: DateTime<Utc>) -> ScoringOutput {
  let views_per_day = compute_views_per_day(input.view_count, input.published_at, now);
  let velocity_24h = compute_velocity(input.view_count, input.snapshot_24h_ago).map(|v| v as f64);
  let velocity_7d = compute_velocity(input.view_count, input.snapshot_7d_ago).map(|v| v as f64);
  let acceleration = compute_acceleration(velocity_24h, input.previous_velocity_24h);
  let breakout_by_subs = compute_breakout_by_subs(views_per_day, input.subscriber_count, MIN_SUBS_FOR_BREAKOUT);
  let breakout_by_baseline = compute_breakout_by_baseline(views_per_day, input.channel_median_views_per_day);

  ScoringOutput {
    views_per_day,
    velocity_24h,
    velocity_7d,
    acceleration,
    breakout_by_subs,
    breakout_by_baseline,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-07-28T00:00:00Z").unwrap().with_timezone(&Utc)
  }

  #[test]
  fn views_per_day_uses_point_zero_one_day_floor_for_brand_new_video() {
    let published = now() - Duration::minutes(5);
    let vpd = compute_views_per_day(500, published, now());
    assert!(vpd.is_finite());
    assert!(vpd > 0.0);
    assert_eq!(vpd, 500.0 / 0.01);
  }

  #[test]
  fn velocity_is_none_without_a_previous_snapshot() {
    assert_eq!(compute_velocity(1000, None), None);
    assert_eq!(compute_velocity(1000, Some(400)), Some(600));
  }

  #[test]
  fn acceleration_is_none_when_previous_velocity_is_zero() {
    assert_eq!(compute_acceleration(Some(100.0), Some(0.0)), None);
    assert_eq!(compute_acceleration(Some(100.0), None), None);
    assert_eq!(compute_acceleration(Some(200.0), Some(100.0)), Some(2.0));
  }

  #[test]
  fn breakout_by_subs_matches_worked_example() {
    let breakout = compute_breakout_by_subs(10_000.0, Some(100_000), MIN_SUBS_FOR_BREAKOUT);
    assert_eq!(breakout, Some(0.1));
  }

  #[test]
  fn breakout_by_baseline_matches_worked_example_and_handles_missing_baseline() {
    assert_eq!(compute_breakout_by_baseline(10_000.0, Some(1_000.0)), Some(10.0));
    assert_eq!(compute_breakout_by_baseline(10_000.0, None), None);
    assert_eq!(compute_breakout_by_baseline(10_000.0, Some(0.0)), None);
  }

  #[test]
  fn zero_or_negative_views_per_day_suppresses_breakout_metrics() {
    assert_eq!(compute_breakout_by_subs(0.0, Some(100_000), MIN_SUBS_FOR_BREAKOUT), None);
  }
}

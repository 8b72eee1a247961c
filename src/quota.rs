//! In-memory quota governor. One instance per process, owned by the
//! composition root and passed to the platform client by reference. Tracks
//! a daily budget with a safety buffer and resets on PT (approximated as a
//! fixed UTC-8 offset; DST drift is tolerated per the worker's tolerance
//! for an occasional early/late reset).

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCost {
  /// A `search.list` call: 100 units on the real platform.
  Search,
  /// A `videos.list` / `channels.list` call: 1 unit.
  Low,
  /// The free feed endpoint: no quota cost.
  Free,
}

impl QuotaCost {
  pub fn units(self) -> i64 {
    match self {
      QuotaCost::Search => 100,
      QuotaCost::Low => 1,
      QuotaCost::Free => 0,
    }
  }
}

pub struct QuotaGovernor {
  daily_limit: i64,
  buffer_ratio: f64,
  used_today: i64,
  last_reset: Option<DateTime<Utc>>,
}

const PT_OFFSET_HOURS: i64 = 8;

impl QuotaGovernor {
  pub fn new(daily_limit: i64, buffer_ratio: f64) -> Self {
    QuotaGovernor {
      daily_limit,
      buffer_ratio,
      used_today: 0,
      last_reset: None,
    }
  }

  pub fn effective_limit(&self) -> i64 {
    ((self.daily_limit as f64) * (1.0 - self.buffer_ratio)).floor() as i64
  }

  fn maybe_reset(&mut self, now: DateTime<Utc>) {
    let now_pt = now - Duration::hours(PT_OFFSET_HOURS);
    let today_pt_midnight = Utc
      .with_ymd_and_hms(now_pt.year(), now_pt.month(), now_pt.day(), 0, 0, 0)
      .single()
      .unwrap_or(now_pt);

    let should_reset = match self.last_reset {
      None => true,
      Some(last) => last < today_pt_midnight,
    };
    if should_reset {
      self.used_today = 0;
      self.last_reset = Some(today_pt_midnight);
    }
  }

  pub fn remaining(&mut self, now: DateTime<Utc>) -> i64 {
    self.maybe_reset(now);
    (self.effective_limit() - self.used_today).max(0)
  }

  pub fn used_today(&self) -> i64 {
    self.used_today
  }

  pub fn can_afford(&mut self, cost: QuotaCost, now: DateTime<Utc>) -> bool {
    self.remaining(now) >= cost.units()
  }

  /// Checks affordability and records usage in one step, the only path
  /// platform-client call sites should use: a request must never start if
  /// quota has already run out.
  pub fn consume(&mut self, cost: QuotaCost, now: DateTime<Utc>) -> Result<(), Error> {
    self.maybe_reset(now);
    if self.effective_limit() - self.used_today < cost.units() {
      return Err(Error::QuotaExceeded(format!(
        "quota exhausted: used={} effective_limit={} cost={}",
        self.used_today,
        self.effective_limit(),
        cost.units()
      )));
    }
    self.used_today += cost.units();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dt(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
  }

  #[test]
  fn effective_limit_applies_buffer_ratio() {
    let gov = QuotaGovernor::new(10_000, 0.1);
    assert_eq!(gov.effective_limit(), 9_000);
  }

  #[test]
  fn consume_fails_once_remaining_is_below_cost() {
    let mut gov = QuotaGovernor::new(1_000, 0.1);
    let now = dt(2026, 7, 28, 12);
    // effective_limit = 900; 8 searches at 100 = 800, the 9th must fail.
    for _ in 0..8 {
      gov.consume(QuotaCost::Search, now).unwrap();
    }
    assert!(gov.consume(QuotaCost::Search, now).is_err());
    assert_eq!(gov.used_today(), 800);
  }

  #[test]
  fn resets_after_crossing_midnight_pt() {
    let mut gov = QuotaGovernor::new(1_000, 0.0);
    let day1_late = dt(2026, 7, 28, 23);
    gov.consume(QuotaCost::Search, day1_late).unwrap();
    assert_eq!(gov.used_today(), 100);

    // 23:00 UTC on day1 is 15:00 PT; still same PT-day.
    assert!(gov.remaining(day1_late) < gov.effective_limit());

    // Past midnight PT (08:00 UTC next day is 00:00 PT).
    let day2_after_pt_midnight = dt(2026, 7, 29, 9);
    assert_eq!(gov.remaining(day2_after_pt_midnight), gov.effective_limit());
  }

  #[test]
  fn free_cost_never_fails_regardless_of_quota_state() {
    let mut gov = QuotaGovernor::new(0, 0.0);
    let now = dt(2026, 7, 28, 0);
    assert!(gov.consume(QuotaCost::Free, now).is_ok());
  }
}

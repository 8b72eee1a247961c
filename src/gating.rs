use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::window::{eligible_windows, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
  Duplicate,
  TooOld,
  ChannelCap,
}

impl RejectionReason {
  pub fn as_str(self) -> &'static str {
    match self {
      RejectionReason::Duplicate => "duplicate",
      RejectionReason::TooOld => "too_old",
      RejectionReason::ChannelCap => "channel_cap",
    }
  }
}

pub struct GatingCandidate {
  pub video_id: String,
  pub channel_id: String,
  pub feeder_source: String,
  pub published_at: DateTime<Utc>,
}

pub struct GatingDecision {
  pub video_id: String,
  pub feeder_source: String,
  pub accepted: bool,
  pub eligible_windows: Vec<Window>,
  pub rejection_reason: Option<RejectionReason>,
}

#[derive(Debug, Clone, Default)]
pub struct GatingCounters {
  pub total: usize,
  pub accepted: usize,
  pub rejected_duplicate: usize,
  pub rejected_too_old: usize,
  pub rejected_channel_cap: usize,
}

/// Stateful single-pass batch filter. Preload `seen_video_ids` from the last
/// 7 days of discovered videos and `channel_counts` from the last 24 hours,
/// both once per batch; state mutates in-memory as candidates are accepted
/// so later candidates in the same batch observe the updated counts.
pub struct Gate {
  seen_video_ids: HashSet<String>,
  channel_counts: HashMap<String, usize>,
  max_per_channel: usize,
  counters: GatingCounters,
}

impl Gate {
  pub fn new(seen_video_ids: HashSet<String>, channel_counts: HashMap<String, usize>, max_per_channel: usize) -> Self {
    Gate {
      seen_video_ids,
      channel_counts,
      max_per_channel,
      counters: GatingCounters::default(),
    }
  }

  pub fn counters(&self) -> &GatingCounters {
    &self.counters
  }

  pub fn evaluate(&mut self, candidate: &GatingCandidate, now: DateTime<Utc>) -> GatingDecision {
    self.counters.total += 1;

    if self.seen_video_ids.contains(&candidate.video_id) {
      self.counters.rejected_duplicate += 1;
      return GatingDecision {
        video_id: candidate.video_id.clone(),
        feeder_source: candidate.feeder_source.clone(),
        accepted: false,
        eligible_windows: Vec::new(),
        rejection_reason: Some(RejectionReason::Duplicate),
      };
    }

    let age_days = (now - candidate.published_at).num_milliseconds() as f64 / 86_400_000.0;
    let windows = eligible_windows(age_days);
    if windows.is_empty() {
      self.counters.rejected_too_old += 1;
      return GatingDecision {
        video_id: candidate.video_id.clone(),
        feeder_source: candidate.feeder_source.clone(),
        accepted: false,
        eligible_windows: Vec::new(),
        rejection_reason: Some(RejectionReason::TooOld),
      };
    }

    let current_channel_count = *self.channel_counts.get(&candidate.channel_id).unwrap_or(&0);
    if current_channel_count >= self.max_per_channel {
      self.counters.rejected_channel_cap += 1;
      return GatingDecision {
        video_id: candidate.video_id.clone(),
        feeder_source: candidate.feeder_source.clone(),
        accepted: false,
        eligible_windows: Vec::new(),
        rejection_reason: Some(RejectionReason::ChannelCap),
      };
    }

    self.seen_video_ids.insert(candidate.video_id.clone());
    *self.channel_counts.entry(candidate.channel_id.clone()).or_insert(0) += 1;
    self.counters.accepted += 1;

    GatingDecision {
      video_id: candidate.video_id.clone(),
      feeder_source: candidate.feeder_source.clone(),
      accepted: true,
      eligible_windows: windows,
      rejection_reason: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-07-28T00:00:00Z").unwrap().with_timezone(&Utc)
  }

  fn candidate(video_id: &str, channel_id: &str, age_days: i64) -> GatingCandidate {
    GatingCandidate {
      video_id: video_id.to_string(),
      channel_id: channel_id.to_string(),
      feeder_source: "intent_seed".to_string(),
      published_at: now() - chrono::Duration::days(age_days),
    }
  }

  #[test]
  fn dedup_and_channel_cap_scenario_from_scenario_table() {
    let mut seen = HashSet::new();
    seen.insert("v0".to_string());
    let mut counts = HashMap::new();
    counts.insert("ch1".to_string(), 4);

    let mut gate = Gate::new(seen, counts, 5);

    let d0 = gate.evaluate(&candidate("v0", "ch1", 1), now());
    assert!(!d0.accepted);
    assert_eq!(d0.rejection_reason, Some(RejectionReason::Duplicate));

    let d1 = gate.evaluate(&candidate("v1", "ch1", 1), now());
    assert!(d1.accepted);

    let d2 = gate.evaluate(&candidate("v2", "ch1", 1), now());
    assert!(!d2.accepted);
    assert_eq!(d2.rejection_reason, Some(RejectionReason::ChannelCap));

    let d3 = gate.evaluate(&candidate("v3", "ch2", 1), now());
    assert!(d3.accepted);

    assert_eq!(gate.counters().total, 4);
    assert_eq!(gate.counters().accepted, 2);
    assert_eq!(gate.counters().rejected_duplicate, 1);
    assert_eq!(gate.counters().rejected_channel_cap, 1);
  }

  #[test]
  fn rejects_candidates_older_than_widest_window() {
    let mut gate = Gate::new(HashSet::new(), HashMap::new(), 5);
    let decision = gate.evaluate(&candidate("v9", "ch9", 91), now());
    assert!(!decision.accepted);
    assert_eq!(decision.rejection_reason, Some(RejectionReason::TooOld));
  }
}

/// Gini coefficient over a cluster's member view counts. 0 = perfectly
/// even distribution, 1 = one video has all the views.
pub fn compute_winner_concentration(view_counts: &[i64]) -> f64 {
  if view_counts.len() < 2 {
    return 0.0;
  }

  let mut sorted: Vec<f64> = view_counts.iter().map(|&v| v as f64).collect();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

  let n = sorted.len() as f64;
  let total: f64 = sorted.iter().sum();
  if total == 0.0 {
    return 0.0;
  }

  let mut cumsum_total = 0.0;
  let mut running = 0.0;
  for v in &sorted {
    running += v;
    cumsum_total += running;
  }

  let gini = (n + 1.0 - 2.0 * cumsum_total / total) / n;
  gini.clamp(0.0, 1.0)
}

pub fn compute_opportunity_score(median_velocity: Option<f64>, avg_subs: Option<f64>, concentration: Option<f64>) -> Option<f64> {
  let demand = median_velocity?;

  let competition = avg_subs.unwrap_or(100_000.0) / 100_000.0;
  let concentration_factor = 1.0 + concentration.unwrap_or(0.5);
  let denom = competition * concentration_factor;

  if denom > 0.0 {
    Some(demand / denom)
  } else {
    Some(demand)
  }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterMemberMetrics {
  pub velocity_24h: Option<f64>,
  pub subscriber_count: Option<i64>,
  pub view_count: i64,
}

pub struct ClusterAggregate {
  pub median_velocity: Option<f64>,
  pub avg_subs: Option<f64>,
  pub winner_concentration: f64,
  pub opportunity_score: Option<f64>,
}

fn median(mut values: Vec<f64>) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  values.sort_by(|a, b| a.partial_cmp(b).unwrap());
  let mid = values.len() / 2;
  if values.len() % 2 == 0 {
    Some((values[mid - 1] + values[mid]) / 2.0)
  } else {
    Some(values[mid])
  }
}

pub fn aggregate_cluster(members: &[ClusterMemberMetrics]) -> ClusterAggregate {
  let velocities: Vec<f64> = members.iter().filter_map(|m| m.velocity_24h).collect();
  let median_velocity = median(velocities);

  let subs: Vec<f64> = members.iter().filter_map(|m| m.subscriber_count).map(|v| v as f64).collect();
  let avg_subs = if subs.is_empty() {
    None
  } else {
    Some(subs.iter().sum::<f64>() / subs.len() as f64)
  };

  let view_counts: Vec<i64> = members.iter().map(|m| m.view_count).collect();
  let winner_concentration = compute_winner_concentration(&view_counts);

  let opportunity_score = compute_opportunity_score(median_velocity, avg_subs, Some(winner_concentration));

  ClusterAggregate {
    median_velocity,
    avg_subs,
    winner_concentration,
    opportunity_score,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gini_is_low_for_even_distribution() {
    let g = compute_winner_concentration(&[1000, 1000, 1000, 1000]);
    assert!(g < 0.1, "expected low concentration, got {g}");
  }

  #[test]
  fn gini_is_high_for_winner_take_most_distribution() {
    let g = compute_winner_concentration(&[10_000, 100, 100, 100]);
    assert!(g > 0.5, "expected high concentration, got {g}");
  }

  #[test]
  fn gini_is_zero_for_singleton_and_all_zero() {
    assert_eq!(compute_winner_concentration(&[500]), 0.0);
    assert_eq!(compute_winner_concentration(&[0, 0, 0]), 0.0);
    assert_eq!(compute_winner_concentration(&[]), 0.0);
  }

  #[test]
  fn opportunity_score_matches_worked_example() {
    let score = compute_opportunity_score(Some(10_000.0), Some(100_000.0), Some(0.5)).unwrap();
    assert!(score > 6600.0 && score < 6700.0, "got {score}");
  }

  #[test]
  fn opportunity_score_favors_small_channels() {
    let small = compute_opportunity_score(Some(10_000.0), Some(10_000.0), Some(0.5)).unwrap();
    let large = compute_opportunity_score(Some(10_000.0), Some(1_000_000.0), Some(0.5)).unwrap();
    assert!(small > large);
  }

  #[test]
  fn opportunity_score_is_none_without_median_velocity() {
    assert_eq!(compute_opportunity_score(None, Some(1000.0), Some(0.2)), None);
  }
}

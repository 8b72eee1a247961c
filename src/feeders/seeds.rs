//! Fixed intent-seed query list and long-tail stopword set. Leaf module: no
//! I/O, no config reads. Carried over verbatim from the worker's seed
//! catalogue, grouped by the same intent families.

/// Generic intent patterns that surface trending content across any niche.
pub const INTENT_SEEDS: &[&str] = &[
  // Instructional
  "how to",
  "tutorial",
  "beginner guide",
  "complete guide",
  "ultimate guide",
  "step by step",
  "learn",
  "course",
  "masterclass",
  "explained",
  "for beginners",
  "basics",
  "introduction to",
  // Experiential
  "I tried",
  "trying",
  "testing",
  "first time",
  "my experience",
  "honest opinion",
  "my thoughts on",
  "after one year",
  "update",
  "follow up",
  "results",
  // Review/comparison
  "review",
  "honest review",
  "vs comparison",
  "versus",
  "which is better",
  "best",
  "worst",
  "tier list",
  "ranking",
  "top 10",
  "top 5",
  // Transformation
  "before and after",
  "transformation",
  "makeover",
  "glow up",
  "progress",
  "journey",
  // Challenge/entertainment
  "challenge",
  "day in the life",
  "routine",
  "vlog",
  "reacting to",
  "reaction",
  // Knowledge
  "what I learned",
  "mistakes",
  "things I wish",
  "nobody tells you",
  "secrets",
  "hack",
  "tips",
  "tricks",
  "pro tips",
  // Building/making
  "building",
  "making",
  "creating",
  "DIY",
  "setup",
  "fixing",
  "repair",
  "restoration",
  // Lifestyle
  "morning routine",
  "night routine",
  "day in my life",
  "weekly",
  "monthly",
  // Analysis
  "analysis",
  "breakdown",
  "deep dive",
  "in depth",
  "why",
  "how",
  // Emotional triggers
  "stop doing",
  "start doing",
  "why I",
  "switching to",
  "upgrading",
  "downgrading",
  "quitting",
  "leaving",
  "starting",
  // Question patterns
  "should you",
  "is it worth",
  "do you need",
  "can you",
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seed_list_has_no_duplicates() {
    let mut sorted = INTENT_SEEDS.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), INTENT_SEEDS.len());
  }
}

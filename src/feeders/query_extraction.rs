//! Turns existing titles into new search queries: short phrase extraction
//! for the expansion feeder, intent+keyword combination for the long-tail
//! feeder. Grounded on `domain/feeders/query_extraction.py`.

use rand::seq::SliceRandom;

use super::seeds::INTENT_SEEDS;

const STOPWORDS: &[&str] = &[
  "the", "a", "an", "is", "are", "was", "were", "in", "on", "at", "to", "for", "of", "and", "or", "but", "with",
  "this", "that", "my", "your", "i", "you", "we", "they", "it",
];

fn clean_words(title: &str) -> Vec<String> {
  let lowered = title.to_lowercase();
  let cleaned: String = lowered.chars().map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() { c } else { ' ' }).collect();
  cleaned
    .split_whitespace()
    .filter(|w| w.len() > 2 && !STOPWORDS.contains(w))
    .map(|w| w.to_string())
    .collect()
}

/// Extracts 2- and 3-word phrases from a title as candidate search queries,
/// capped at 5 per title (the source's `queries[:5]`).
pub fn extract_query_terms(title: &str) -> Vec<String> {
  let words = clean_words(title);
  let mut queries = Vec::new();

  for pair in words.windows(2) {
    queries.push(format!("{} {}", pair[0], pair[1]));
  }
  for triple in words.windows(3) {
    queries.push(format!("{} {} {}", triple[0], triple[1], triple[2]));
  }

  queries.truncate(5);
  queries
}

/// Combines a random sample of intent seeds with a random sample of corpus
/// keywords into long-tail queries, shuffled and capped at `queries_per_run`.
pub fn generate_long_tail_queries(keywords: &[String], queries_per_run: usize) -> Vec<String> {
  let mut rng = rand::rng();

  let mut intents: Vec<&str> = INTENT_SEEDS.to_vec();
  intents.shuffle(&mut rng);
  intents.truncate(10.min(INTENT_SEEDS.len()));

  let mut keyword_pool: Vec<String> = keywords.to_vec();
  keyword_pool.shuffle(&mut rng);
  keyword_pool.truncate(20.min(keywords.len()));

  let mut queries = Vec::new();
  for intent in &intents {
    for keyword in keyword_pool.iter().take(5) {
      queries.push(format!("{intent} {keyword}"));
    }
  }

  queries.shuffle(&mut rng);
  queries.truncate(queries_per_run);
  queries
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_two_and_three_word_phrases_capped_at_five() {
    let queries = extract_query_terms("How to Bake Sourdough Bread at Home Today");
    assert!(!queries.is_empty());
    assert!(queries.len() <= 5);
    assert!(queries.iter().any(|q| q.split_whitespace().count() == 2));
  }

  #[test]
  fn filters_stopwords_and_short_words() {
    let queries = extract_query_terms("the a an is");
    assert!(queries.is_empty());
  }

  #[test]
  fn long_tail_queries_respect_requested_count() {
    let keywords = vec!["sourdough".to_string(), "gaming".to_string(), "fitness".to_string()];
    let queries = generate_long_tail_queries(&keywords, 7);
    assert!(queries.len() <= 7);
  }

  #[test]
  fn long_tail_queries_empty_when_no_keywords() {
    let queries = generate_long_tail_queries(&[], 5);
    assert!(queries.is_empty());
  }
}

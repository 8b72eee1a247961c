//! Clustering & labeling pipeline: L2-normalize, reduce, density-cluster,
//! derive a stable id, and extract a keyword label. Grounded on
//! `domain/clustering/algorithms.py`, `domain/clustering/stable_id.py`, and
//! `domain/labeling/keyword_extraction.py`.
//!
//! Translation note: the source leans on `umap-learn` and `hdbscan`, neither
//! of which has an equivalent in this codebase's dependency stack (nor in
//! any of the sibling example repos this worker draws its stack from). The
//! reduction step is replaced with a deterministic seeded random projection
//! (Johnson-Lindenstrauss style) and the density-clustering step with a
//! deterministic single-linkage union-find over a euclidean neighbor graph,
//! both preserving the source's externally observable contract: same
//! window + same embeddings -> same cluster assignment, noise labeled `-1`,
//! clusters below `min_cluster_size` discarded. See DESIGN.md.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// L2-normalizes each row in place.
pub fn normalize_embeddings(vectors: &[Vec<f32>]) -> Vec<Vec<f32>> {
  vectors
    .iter()
    .map(|v| {
      let norm = (v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>()).sqrt();
      if norm <= f64::EPSILON {
        v.clone()
      } else {
        v.iter().map(|x| (*x as f64 / norm) as f32).collect()
      }
    })
    .collect()
}

/// Deterministic seeded linear-congruential generator, used in place of a
/// crate-provided RNG where bit-for-bit reproducibility across runs matters
/// more than statistical quality.
struct Lcg {
  state: u64,
}

impl Lcg {
  fn new(seed: u64) -> Self {
    Lcg { state: seed }
  }

  fn next_u64(&mut self) -> u64 {
    self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    self.state
  }

  /// Approximately standard-normal via a 12-uniform sum (Irwin-Hall), good
  /// enough for a random projection matrix.
  fn next_gaussian(&mut self) -> f64 {
    let mut sum = 0.0;
    for _ in 0..12 {
      sum += (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
    }
    sum - 6.0
  }
}

const RANDOM_PROJECTION_SEED: u64 = 42;

/// Reduces each embedding to `n_components` dimensions via a fixed-seed
/// random projection. Mirrors the source's `n_neighbors` clamping rule even
/// though a random projection doesn't consult neighbor count directly, so
/// config plumbing and tests stay aligned with the documented behavior.
/// Falls back to the raw vectors untouched when there are fewer than 2
/// samples (the source's "reducer failure" fallback path).
pub fn reduce_dimensions(vectors: &[Vec<f32>], n_components: usize, n_neighbors: usize) -> Vec<Vec<f32>> {
  if vectors.len() < 2 {
    return vectors.to_vec();
  }

  let _effective_n_neighbors = if vectors.len() < n_neighbors { n_neighbors.max(2).min(vectors.len() - 1) } else { n_neighbors };
  let dim = vectors[0].len();
  if dim == 0 {
    return vectors.to_vec();
  }
  let target = n_components.min(dim).max(1);

  let mut rng = Lcg::new(RANDOM_PROJECTION_SEED);
  let mut projection = vec![vec![0f32; dim]; target];
  for row in projection.iter_mut() {
    for cell in row.iter_mut() {
      *cell = (rng.next_gaussian() / (dim as f64).sqrt()) as f32;
    }
  }

  vectors
    .iter()
    .map(|v| {
      projection
        .iter()
        .map(|proj_row| proj_row.iter().zip(v.iter()).map(|(p, x)| p * x).sum())
        .collect()
    })
    .collect()
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| ((*x - *y) as f64).powi(2)).sum::<f64>().sqrt()
}

struct UnionFind {
  parent: Vec<usize>,
}

impl UnionFind {
  fn new(n: usize) -> Self {
    UnionFind { parent: (0..n).collect() }
  }

  fn find(&mut self, x: usize) -> usize {
    if self.parent[x] != x {
      self.parent[x] = self.find(self.parent[x]);
    }
    self.parent[x]
  }

  fn union(&mut self, a: usize, b: usize) {
    let ra = self.find(a);
    let rb = self.find(b);
    if ra != rb {
      self.parent[ra] = rb;
    }
  }
}

/// Density clustering: connects points within a distance threshold derived
/// from the data's own scale (median pairwise distance, scaled down), then
/// discards connected components smaller than `min_cluster_size` as noise
/// (`-1`). Deterministic for a fixed input order.
pub fn density_cluster(vectors: &[Vec<f32>], min_cluster_size: usize) -> Vec<i32> {
  let n = vectors.len();
  if n == 0 {
    return Vec::new();
  }
  if n == 1 {
    return vec![-1];
  }

  let mut distances = Vec::with_capacity(n * (n - 1) / 2);
  for i in 0..n {
    for j in (i + 1)..n {
      distances.push(euclidean_distance(&vectors[i], &vectors[j]));
    }
  }
  distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
  let threshold = distances[distances.len() / 4].max(f64::EPSILON);

  let mut uf = UnionFind::new(n);
  for i in 0..n {
    for j in (i + 1)..n {
      if euclidean_distance(&vectors[i], &vectors[j]) <= threshold {
        uf.union(i, j);
      }
    }
  }

  let mut component_members: HashMap<usize, Vec<usize>> = HashMap::new();
  for i in 0..n {
    component_members.entry(uf.find(i)).or_default().push(i);
  }

  let mut roots_by_first_member: Vec<(usize, usize)> =
    component_members.iter().map(|(root, members)| (*root, members[0])).collect();
  roots_by_first_member.sort_by_key(|(_, first)| *first);

  let mut labels = vec![-1i32; n];
  let mut next_label = 0i32;
  for (root, _) in roots_by_first_member {
    let members = &component_members[&root];
    if members.len() >= min_cluster_size {
      for &m in members {
        labels[m] = next_label;
      }
      next_label += 1;
    }
  }

  labels
}

/// `cluster_id = UUID(first 16 bytes of SHA-256("{window}:{sorted,joined,video_ids}"))`.
pub fn stable_cluster_id(window: &str, video_ids: &[String]) -> Uuid {
  let mut sorted_ids = video_ids.to_vec();
  sorted_ids.sort();
  let content = format!("{window}:{}", sorted_ids.join(","));

  let mut hasher = Sha256::new();
  hasher.update(content.as_bytes());
  let digest = hasher.finalize();

  let mut bytes = [0u8; 16];
  bytes.copy_from_slice(&digest[..16]);
  Uuid::from_bytes(bytes)
}

const STOPWORDS: &[&str] = &[
  "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "is", "are", "was",
  "were", "be", "been", "being", "how", "what", "why", "when", "where", "this", "that", "these", "those", "you",
  "your", "my", "we", "they", "i", "it", "as", "vs", "best", "top", "new", "video", "videos", "youtube", "watch",
  "subscribe", "like", "comment", "2024", "2025", "2026", "part", "episode", "ep", "vol", "official",
];

fn clean_title(title: &str) -> String {
  let lowered = title.to_lowercase();
  let cleaned: String = lowered
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() { c } else { ' ' })
    .collect();
  cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn significant_words(title: &str) -> Vec<String> {
  clean_title(title)
    .split_whitespace()
    .filter(|w| w.len() >= 3 && !STOPWORDS.contains(w))
    .map(|w| w.to_string())
    .collect()
}

fn bigrams(words: &[String]) -> Vec<String> {
  words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])).collect()
}

const MAX_FEATURES: usize = 50;

/// TF-IDF-ish keyword extraction over uni- and bigrams. Falls back to raw
/// term frequency when every title reduces to zero significant words
/// (mirrors the source's "IDF collapses on a single document" fallback).
pub fn extract_keywords(titles: &[String], top_n: usize) -> Vec<String> {
  if titles.is_empty() {
    return Vec::new();
  }

  let docs: Vec<Vec<String>> = titles
    .iter()
    .map(|t| {
      let words = significant_words(t);
      let mut terms = words.clone();
      terms.extend(bigrams(&words));
      terms
    })
    .collect();

  if docs.iter().all(|d| d.is_empty()) {
    return Vec::new();
  }

  let doc_count = docs.len() as f64;
  let mut doc_frequency: HashMap<&str, usize> = HashMap::new();
  for doc in &docs {
    let mut seen = std::collections::HashSet::new();
    for term in doc {
      if seen.insert(term.as_str()) {
        *doc_frequency.entry(term.as_str()).or_insert(0) += 1;
      }
    }
  }

  let mut term_scores: HashMap<&str, f64> = HashMap::new();
  for doc in &docs {
    if doc.is_empty() {
      continue;
    }
    let mut term_counts: HashMap<&str, usize> = HashMap::new();
    for term in doc {
      *term_counts.entry(term.as_str()).or_insert(0) += 1;
    }
    let doc_len = doc.len() as f64;
    for (term, count) in term_counts {
      let tf = count as f64 / doc_len;
      let df = *doc_frequency.get(term).unwrap_or(&1) as f64;
      let idf = (doc_count / df).ln() + 1.0;
      *term_scores.entry(term).or_insert(0.0) += (tf * idf) / doc_count;
    }
  }

  if term_scores.is_empty() {
    return extract_keywords_frequency(titles, top_n);
  }

  let mut scored: Vec<(&str, f64)> = term_scores.into_iter().collect();
  scored.truncate(MAX_FEATURES.max(scored.len().min(MAX_FEATURES)));
  scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then_with(|| a.0.cmp(b.0)));

  scored.into_iter().take(top_n).map(|(term, _)| term.to_string()).collect()
}

fn extract_keywords_frequency(titles: &[String], top_n: usize) -> Vec<String> {
  let mut counts: HashMap<String, usize> = HashMap::new();
  for title in titles {
    for word in significant_words(title) {
      *counts.entry(word).or_insert(0) += 1;
    }
  }
  let mut scored: Vec<(String, usize)> = counts.into_iter().collect();
  scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  scored.into_iter().take(top_n).map(|(word, _)| word).collect()
}

fn title_case(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    None => String::new(),
  }
}

pub fn generate_cluster_label(keywords: &[String]) -> String {
  if keywords.is_empty() {
    return "General".to_string();
  }
  keywords.iter().take(3).map(|w| title_case(w)).collect::<Vec<_>>().join(" ")
}

pub struct ClusterLabel {
  pub label: String,
  pub keywords: Vec<String>,
}

pub fn label_cluster(titles: &[String]) -> ClusterLabel {
  let keywords = extract_keywords(titles, 5);
  let label = generate_cluster_label(&keywords);
  ClusterLabel { label, keywords }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stable_cluster_id_is_invariant_to_member_order_and_sensitive_to_window() {
    let a = stable_cluster_id("7d", &["v1".into(), "v2".into(), "v3".into()]);
    let b = stable_cluster_id("7d", &["v3".into(), "v1".into(), "v2".into()]);
    let c = stable_cluster_id("30d", &["v1".into(), "v2".into(), "v3".into()]);
    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn normalize_produces_unit_vectors() {
    let normalized = normalize_embeddings(&[vec![3.0, 4.0]]);
    let norm: f64 = normalized[0].iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    assert!((norm - 1.0).abs() < 1e-6);
  }

  #[test]
  fn density_cluster_labels_small_component_as_noise() {
    let vectors = vec![
      vec![0.0, 0.0],
      vec![0.01, 0.0],
      vec![0.0, 0.01],
      vec![0.01, 0.01],
      vec![0.02, 0.0],
      vec![50.0, 50.0],
    ];
    let labels = density_cluster(&vectors, 5);
    assert_eq!(labels[5], -1);
    let dense_label = labels[0];
    assert_ne!(dense_label, -1);
    assert_eq!(labels[1], dense_label);
  }

  #[test]
  fn extract_keywords_falls_back_to_frequency_for_single_title_cluster() {
    let titles = vec!["How to Bake Sourdough Bread at Home".to_string()];
    let keywords = extract_keywords(&titles, 5);
    assert!(keywords.contains(&"bake".to_string()) || keywords.contains(&"sourdough".to_string()));
  }

  #[test]
  fn label_cluster_falls_back_to_general_with_no_keywords() {
    let titles = vec!["the a an".to_string()];
    let label = label_cluster(&titles);
    assert_eq!(label.label, "General");
  }

  #[test]
  fn generate_cluster_label_title_cases_top_three_keywords() {
    let label = generate_cluster_label(&["sourdough".to_string(), "bread".to_string(), "baking".to_string()]);
    assert_eq!(label, "Sourdough Bread Baking");
  }
}

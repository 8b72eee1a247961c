use crate::errors::Error;

/// Immutable configuration loaded once at startup. No module reads
/// `std::env` directly outside of `Config::from_env`.
#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub embedding_api_key: Option<String>,
  pub embedding_model: String,
  pub embedding_dim: usize,
  pub embedding_batch_size: usize,
  pub platform_api_key: Option<String>,
  pub cluster_min_size: usize,
  pub umap_n_components: usize,
  pub umap_n_neighbors: usize,
  pub ingest: IngestConfig,
  pub snapshot: SnapshotConfig,
  pub quota: QuotaConfig,
  pub debug_log: bool,
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
  pub seeds_per_run: usize,
  pub videos_per_seed: usize,
  pub longtail_queries: usize,
  pub max_per_channel: usize,
  pub min_views_24h: i64,
  pub min_views_7d: i64,
  pub min_views_30d: i64,
  pub interval_seconds: u64,
}

impl Default for IngestConfig {
  fn default() -> Self {
    IngestConfig {
      seeds_per_run: 5,
      videos_per_seed: 10,
      longtail_queries: 5,
      max_per_channel: 5,
      min_views_24h: 100,
      min_views_7d: 500,
      min_views_30d: 2000,
      interval_seconds: 600,
    }
  }
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
  pub batch_size: usize,
  pub tier_a_hours: i64,
  pub tier_b_hours: i64,
  pub tier_c_hours: i64,
  pub interval_seconds: u64,
  pub max_per_run: usize,
  /// Videos at or under this age are promoted to tier A regardless of velocity.
  pub tier_a_age_hours: i64,
  /// Velocity above this threshold promotes a video to tier A regardless of age.
  pub tier_a_velocity_threshold: f64,
  /// Videos at or under this age are promoted to tier B regardless of velocity.
  pub tier_b_age_days: i64,
  /// Velocity above this threshold promotes a video to tier B regardless of age.
  pub tier_b_velocity_threshold: f64,
}

impl Default for SnapshotConfig {
  fn default() -> Self {
    SnapshotConfig {
      batch_size: 50,
      tier_a_hours: 4,
      tier_b_hours: 12,
      tier_c_hours: 24,
      interval_seconds: 300,
      max_per_run: 500,
      tier_a_age_hours: 48,
      tier_a_velocity_threshold: 10_000.0,
      tier_b_age_days: 7,
      tier_b_velocity_threshold: 1_000.0,
    }
  }
}

#[derive(Debug, Clone)]
pub struct QuotaConfig {
  pub daily_limit: i64,
  pub buffer_ratio: f64,
}

impl Default for QuotaConfig {
  fn default() -> Self {
    QuotaConfig {
      daily_limit: 10_000,
      buffer_ratio: 0.1,
    }
  }
}

fn env_string(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
  env_string(name)
    .and_then(|v| v.parse::<T>().ok())
    .unwrap_or(default)
}

/// Strip query parameters that only foreign ORMs understand (e.g.
/// `?sslaccept=strict` appended by managed-MySQL dashboards) since sqlx's
/// own TLS handling is configured separately.
fn normalize_database_url(raw: &str) -> String {
  match raw.split_once('?') {
    Some((base, _query)) => base.to_string(),
    None => raw.to_string(),
  }
}

impl Config {
  pub fn from_env() -> Result<Self, Error> {
    let database_url = env_string("DATABASE_URL")
      .ok_or_else(|| Error::configuration("missing DATABASE_URL"))?;

    Ok(Config {
      database_url: normalize_database_url(&database_url),
      embedding_api_key: env_string("EMBEDDING_API_KEY").or_else(|| env_string("OPENAI_API_KEY")),
      embedding_model: env_string("EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".to_string()),
      embedding_dim: env_parsed("EMBEDDING_DIM", 1536),
      embedding_batch_size: env_parsed("EMBEDDING_BATCH_SIZE", 100),
      platform_api_key: env_string("PLATFORM_API_KEY"),
      cluster_min_size: env_parsed("CLUSTER_MIN_SIZE", 5),
      umap_n_components: env_parsed("UMAP_N_COMPONENTS", 25),
      umap_n_neighbors: env_parsed("UMAP_N_NEIGHBORS", 15),
      ingest: IngestConfig {
        seeds_per_run: env_parsed("INGEST_SEEDS_PER_RUN", IngestConfig::default().seeds_per_run),
        videos_per_seed: env_parsed("INGEST_VIDEOS_PER_SEED", IngestConfig::default().videos_per_seed),
        longtail_queries: env_parsed("INGEST_LONGTAIL_QUERIES", IngestConfig::default().longtail_queries),
        max_per_channel: env_parsed("INGEST_MAX_PER_CHANNEL", IngestConfig::default().max_per_channel),
        min_views_24h: env_parsed("INGEST_MIN_VIEWS_24H", IngestConfig::default().min_views_24h),
        min_views_7d: env_parsed("INGEST_MIN_VIEWS_7D", IngestConfig::default().min_views_7d),
        min_views_30d: env_parsed("INGEST_MIN_VIEWS_30D", IngestConfig::default().min_views_30d),
        interval_seconds: env_parsed("INGEST_INTERVAL_SECONDS", IngestConfig::default().interval_seconds),
      },
      snapshot: SnapshotConfig {
        batch_size: env_parsed("SNAPSHOT_BATCH_SIZE", SnapshotConfig::default().batch_size),
        tier_a_hours: env_parsed("SNAPSHOT_TIER_A_HOURS", SnapshotConfig::default().tier_a_hours),
        tier_b_hours: env_parsed("SNAPSHOT_TIER_B_HOURS", SnapshotConfig::default().tier_b_hours),
        tier_c_hours: env_parsed("SNAPSHOT_TIER_C_HOURS", SnapshotConfig::default().tier_c_hours),
        interval_seconds: env_parsed("SNAPSHOT_INTERVAL_SECONDS", SnapshotConfig::default().interval_seconds),
        max_per_run: env_parsed("SNAPSHOT_MAX_PER_RUN", SnapshotConfig::default().max_per_run),
        tier_a_age_hours: env_parsed("SNAPSHOT_TIER_A_AGE_HOURS", SnapshotConfig::default().tier_a_age_hours),
        tier_a_velocity_threshold: env_parsed("SNAPSHOT_TIER_A_VELOCITY", SnapshotConfig::default().tier_a_velocity_threshold),
        tier_b_age_days: env_parsed("SNAPSHOT_TIER_B_AGE_DAYS", SnapshotConfig::default().tier_b_age_days),
        tier_b_velocity_threshold: env_parsed("SNAPSHOT_TIER_B_VELOCITY", SnapshotConfig::default().tier_b_velocity_threshold),
      },
      quota: QuotaConfig {
        daily_limit: env_parsed("PLATFORM_DAILY_QUOTA", QuotaConfig::default().daily_limit),
        buffer_ratio: env_parsed("PLATFORM_QUOTA_BUFFER", QuotaConfig::default().buffer_ratio),
      },
      debug_log: env_string("NICHEPULSE_DEBUG_LOG").as_deref() == Some("1"),
    })
  }

  pub fn require_platform_api_key(&self) -> Result<&str, Error> {
    self
      .platform_api_key
      .as_deref()
      .ok_or_else(|| Error::configuration("missing PLATFORM_API_KEY"))
  }

  pub fn require_embedding_api_key(&self) -> Result<&str, Error> {
    self
      .embedding_api_key
      .as_deref()
      .ok_or_else(|| Error::configuration("missing EMBEDDING_API_KEY (or OPENAI_API_KEY)"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_query_params_from_database_url() {
    let stripped = normalize_database_url("mysql://u:p@host:4000/db?sslaccept=strict");
    assert_eq!(stripped, "mysql://u:p@host:4000/db");
  }

  #[test]
  fn leaves_plain_database_url_untouched() {
    let stripped = normalize_database_url("mysql://u:p@host:4000/db");
    assert_eq!(stripped, "mysql://u:p@host:4000/db");
  }
}

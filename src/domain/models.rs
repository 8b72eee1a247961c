use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct DiscoveredVideo {
  pub video_id: String,
  pub channel_id: String,
  pub channel_title: String,
  pub title: String,
  pub thumbnail_url: Option<String>,
  pub published_at: DateTime<Utc>,
  pub feeder: String,
  pub seed: Option<String>,
  pub duration_seconds: Option<i64>,
  pub language: Option<String>,
  pub tags: Vec<String>,
  pub first_seen_at: DateTime<Utc>,
  pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
  pub video_id: String,
  pub captured_at: DateTime<Utc>,
  pub view_count: i64,
  pub like_count: Option<i64>,
  pub comment_count: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Channel {
  pub channel_id: String,
  pub title: String,
  pub subscriber_count: Option<i64>,
  pub channel_published_at: Option<DateTime<Utc>>,
  pub median_velocity_24h: Option<f64>,
  pub median_views_per_day: Option<f64>,
  pub video_count_for_baseline: i64,
  pub last_refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Embedding {
  pub video_id: String,
  pub vector: Vec<f32>,
  pub model: String,
  pub embedded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Cluster {
  pub cluster_id: uuid::Uuid,
  pub window: String,
  pub label: String,
  pub keywords: Vec<String>,
  pub median_velocity: Option<f64>,
  pub unique_channels: i64,
  pub total_videos: i64,
  pub avg_days_old: f64,
  pub avg_channel_subs: Option<f64>,
  pub winner_concentration: f64,
  pub opportunity_score: Option<f64>,
  pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ClusterMembership {
  pub cluster_id: uuid::Uuid,
  pub video_id: String,
  pub rank_in_cluster: i32,
}

#[derive(Debug, Clone, Default)]
pub struct VideoScore {
  pub video_id: String,
  pub window: String,
  pub view_count: i64,
  pub views_per_day: f64,
  pub velocity_24h: Option<f64>,
  pub velocity_7d: Option<f64>,
  pub acceleration: Option<f64>,
  pub breakout_by_subs: Option<f64>,
  pub breakout_by_baseline: Option<f64>,
  pub computed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct IngestionState {
  pub feeder: String,
  pub cursor_position: i64,
  pub last_run_at: Option<DateTime<Utc>>,
  pub videos_added_last_run: i64,
  pub total_videos_added: i64,
}

//! Candidate-generation strategies. Each feeder is a thin async function,
//! not a trait object: the runner invokes them in a fixed order and each
//! receives exactly the inputs it needs (HTTP client, quota governor, and
//! whatever repository-fetched state the caller already loaded), rather
//! than reaching into a shared repository abstraction itself. Grounded on
//! `app/feeders/{intent_seed,expansion,longtail,rss_expansion,runner}.py`.

pub mod expansion;
pub mod free_feed;
pub mod intent_seed;
pub mod longtail;
pub mod query_extraction;
pub mod runner;
pub mod seeds;

use chrono::{DateTime, Utc};

use crate::platform_client::SearchResult;
use crate::rss::FeedVideo;

#[derive(Debug, Clone)]
pub struct Candidate {
  pub feeder_source: &'static str,
  pub video_id: String,
  pub channel_id: String,
  pub channel_title: String,
  pub title: String,
  pub thumbnail_url: Option<String>,
  pub published_at: DateTime<Utc>,
  pub view_count: Option<i64>,
  pub seed: Option<String>,
}

impl Candidate {
  pub fn from_search_result(feeder_source: &'static str, result: SearchResult, seed: Option<String>) -> Self {
    Candidate {
      feeder_source,
      video_id: result.video_id,
      channel_id: result.channel_id,
      channel_title: result.channel_title,
      title: result.title,
      thumbnail_url: result.thumbnail_url,
      published_at: result.published_at,
      view_count: None,
      seed,
    }
  }

  pub fn from_feed_video(video: FeedVideo) -> Self {
    Candidate {
      feeder_source: free_feed::FEEDER_NAME,
      video_id: video.video_id,
      channel_id: video.channel_id,
      channel_title: video.channel_title,
      title: video.title,
      thumbnail_url: video.thumbnail_url,
      published_at: video.published_at,
      view_count: video.view_count,
      seed: None,
    }
  }
}

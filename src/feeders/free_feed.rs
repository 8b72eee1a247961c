//! Zero-cost feeder: pulls each known channel's free feed and surfaces
//! videos we haven't discovered yet. Grounded on `app/feeders/rss_expansion.py`.

use std::collections::HashSet;

use super::Candidate;
use crate::platform_client::PlatformClient;

pub const FEEDER_NAME: &str = "free_feed";

pub async fn run(
  client: &PlatformClient,
  known_channel_ids: &[String],
  existing_video_ids: &HashSet<String>,
  max_per_channel: usize,
) -> Vec<Candidate> {
  let mut candidates = Vec::new();

  for channel_id in known_channel_ids {
    let videos = match client.fetch_channel_feed(channel_id).await {
      Ok(v) => v,
      Err(_) => continue,
    };

    for feed_video in videos.into_iter().take(max_per_channel) {
      if existing_video_ids.contains(&feed_video.video_id) {
        continue;
      }
      candidates.push(Candidate::from_feed_video(feed_video));
    }
  }

  candidates
}

//! Video platform client. Batched, quota-checked HTTP against the platform's
//! search/videos/channels endpoints, plus the zero-cost free-feed fetch.
//! Grounded on this codebase's existing `providers::youtube_videos` HTTP
//! pattern (hyper-rustls + hyper-util legacy client, manual request/response
//! plumbing) and on the worker's `infra/youtube/client.py` + `http.py` for
//! call shape, batching, retry policy, and quota-cost accounting.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Empty};
use hyper::header::ACCEPT;
use hyper::{Method, Request, StatusCode};
use rand::Rng;
use serde_json::Value;

use crate::errors::Error;
use crate::quota::{QuotaCost, QuotaGovernor};
use crate::rss;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const MAX_RETRY_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct SearchResult {
  pub video_id: String,
  pub channel_id: String,
  pub channel_title: String,
  pub title: String,
  pub thumbnail_url: Option<String>,
  pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoStats {
  pub view_count: i64,
  pub like_count: Option<i64>,
  pub comment_count: Option<i64>,
  pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ChannelInfo {
  pub title: String,
  pub subscriber_count: Option<i64>,
  pub video_count: Option<i64>,
  pub published_at: Option<DateTime<Utc>>,
}

pub struct PlatformClient {
  api_key: String,
  base_url: String,
}

fn https_client() -> Result<hyper_util::client::legacy::Client<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>, Empty<Bytes>>, Error> {
  let connector = hyper_rustls::HttpsConnectorBuilder::new()
    .with_native_roots()
    .map_err(|e| Error::platform(e.to_string()))?
    .https_or_http()
    .enable_http1()
    .build();
  Ok(hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector))
}

/// Small jitter sleep before every outbound request, to desynchronize
/// concurrent workers, independent of the backoff jitter applied between
/// retries.
async fn pre_request_jitter() {
  let millis = rand::rng().random_range(0..500);
  tokio::time::sleep(StdDuration::from_millis(millis)).await;
}

fn backoff_delay(attempt: u32) -> StdDuration {
  let base_secs = 2u64.saturating_pow(attempt).min(30);
  let jitter_ms = rand::rng().random_range(0..1000);
  StdDuration::from_secs(base_secs) + StdDuration::from_millis(jitter_ms)
}

fn is_quota_exceeded_reason(body: &Value) -> bool {
  body
    .get("error")
    .and_then(|e| e.get("errors"))
    .and_then(|e| e.as_array())
    .and_then(|arr| arr.first())
    .and_then(|e| e.get("reason"))
    .and_then(|r| r.as_str())
    .map(|reason| reason == "quotaExceeded" || reason == "dailyLimitExceeded")
    .unwrap_or(false)
}

/// Performs one GET with retry on timeouts/connection errors/429/5xx,
/// translating a quota-exceeded 403 into a terminal, non-retried error.
async fn get_json_with_retry(url: &str) -> Result<Value, Error> {
  let mut attempt = 0;
  loop {
    pre_request_jitter().await;

    let client = https_client()?;
    let req = Request::builder()
      .method(Method::GET)
      .uri(url)
      .header(ACCEPT, "application/json")
      .body(Empty::<Bytes>::new())
      .map_err(|e| Error::platform(e.to_string()))?;

    let outcome = client.request(req).await;

    let resp = match outcome {
      Ok(resp) => resp,
      Err(e) => {
        if attempt + 1 >= MAX_RETRY_ATTEMPTS {
          return Err(Error::from(e));
        }
        attempt += 1;
        tokio::time::sleep(backoff_delay(attempt)).await;
        continue;
      }
    };

    let status = resp.status();
    let body_bytes = resp
      .into_body()
      .collect()
      .await
      .map_err(Error::from)?
      .to_bytes();

    if status == StatusCode::OK {
      return serde_json::from_slice::<Value>(&body_bytes).map_err(Error::from);
    }

    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or_else(|_| serde_json::json!({}));

    if status == StatusCode::FORBIDDEN && is_quota_exceeded_reason(&body) {
      return Err(Error::QuotaExceeded("platform daily quota exceeded".to_string()));
    }

    let retryable = status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN || status.is_server_error();
    if retryable && attempt + 1 < MAX_RETRY_ATTEMPTS {
      attempt += 1;
      tokio::time::sleep(backoff_delay(attempt)).await;
      continue;
    }

    return Err(Error::platform(format!(
      "platform HTTP {}: {}",
      status.as_u16(),
      String::from_utf8_lossy(&body_bytes)
    )));
  }
}

/// Parses an ISO-8601 duration of the restricted `PT#H#M#S` shape the
/// platform emits. Returns `None` for empty or malformed input.
pub fn parse_iso8601_duration(input: &str) -> Option<i64> {
  let rest = input.strip_prefix("PT")?;
  if rest.is_empty() {
    return None;
  }

  let mut hours = 0i64;
  let mut minutes = 0i64;
  let mut seconds = 0i64;
  let mut rest = rest;

  if let Some(idx) = rest.find('H') {
    hours = rest[..idx].parse().ok()?;
    rest = &rest[idx + 1..];
  }
  if let Some(idx) = rest.find('M') {
    minutes = rest[..idx].parse().ok()?;
    rest = &rest[idx + 1..];
  }
  if let Some(idx) = rest.find('S') {
    seconds = rest[..idx].parse().ok()?;
    rest = &rest[idx + 1..];
  }

  if !rest.is_empty() {
    return None;
  }

  Some(hours * 3600 + minutes * 60 + seconds)
}

fn best_thumbnail(snippet: &Value) -> Option<String> {
  let thumbs = snippet.get("thumbnails")?;
  for key in ["high", "medium", "default"] {
    if let Some(url) = thumbs.get(key).and_then(|v| v.get("url")).and_then(|v| v.as_str()) {
      return Some(url.to_string());
    }
  }
  None
}

impl PlatformClient {
  pub fn new(api_key: impl Into<String>) -> Self {
    PlatformClient { api_key: api_key.into(), base_url: API_BASE.to_string() }
  }

  /// Points the client at a different base URL, for a mock server in tests.
  #[cfg(test)]
  pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
    PlatformClient { api_key: api_key.into(), base_url: base_url.into() }
  }

  pub async fn search_videos(
    &self,
    governor: &mut QuotaGovernor,
    query: &str,
    max_results: u32,
    published_after: Option<DateTime<Utc>>,
    order: &str,
    now: DateTime<Utc>,
  ) -> Result<Vec<SearchResult>, Error> {
    governor.consume(QuotaCost::Search, now)?;

    let mut url = format!(
      "{}/search?key={}&part=snippet&type=video&q={}&maxResults={}&order={}&regionCode=US&relevanceLanguage=en",
      self.base_url,
      self.api_key,
      urlencoding_lite(query),
      max_results.min(50),
      order,
    );
    if let Some(after) = published_after {
      url.push_str(&format!("&publishedAfter={}", after.format("%Y-%m-%dT%H:%M:%SZ")));
    }

    let data = get_json_with_retry(&url).await?;
    let items = data.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    let mut results = Vec::with_capacity(items.len());
    for item in items {
      let Some(video_id) = item.get("id").and_then(|v| v.get("videoId")).and_then(|v| v.as_str()) else {
        continue;
      };
      let snippet = item.get("snippet").cloned().unwrap_or_else(|| serde_json::json!({}));
      let published_at = snippet
        .get("publishedAt")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(&s.replace('Z', "+00:00")).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

      results.push(SearchResult {
        video_id: video_id.to_string(),
        channel_id: snippet.get("channelId").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        channel_title: snippet.get("channelTitle").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        title: snippet.get("title").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        thumbnail_url: best_thumbnail(&snippet),
        published_at,
      });
    }

    Ok(results)
  }

  /// At most 50 IDs per call; callers needing more use `get_video_stats_batched`.
  pub async fn get_video_stats(
    &self,
    governor: &mut QuotaGovernor,
    video_ids: &[String],
    now: DateTime<Utc>,
  ) -> Result<HashMap<String, VideoStats>, Error> {
    if video_ids.is_empty() {
      return Ok(HashMap::new());
    }

    governor.consume(QuotaCost::Low, now)?;

    let url = format!(
      "{}/videos?key={}&part=statistics,contentDetails&id={}",
      self.base_url,
      self.api_key,
      video_ids.join(",")
    );
    let data = get_json_with_retry(&url).await?;
    let items = data.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    let mut out = HashMap::new();
    for item in items {
      let Some(video_id) = item.get("id").and_then(|v| v.as_str()) else {
        continue;
      };
      let stats = item.get("statistics").cloned().unwrap_or_else(|| serde_json::json!({}));
      let content = item.get("contentDetails").cloned().unwrap_or_else(|| serde_json::json!({}));

      out.insert(
        video_id.to_string(),
        VideoStats {
          view_count: stats
            .get("viewCount")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
          like_count: stats.get("likeCount").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()),
          comment_count: stats.get("commentCount").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()),
          duration_seconds: content.get("duration").and_then(|v| v.as_str()).and_then(parse_iso8601_duration),
        },
      );
    }

    Ok(out)
  }

  pub async fn get_video_stats_batched(
    &self,
    governor: &mut QuotaGovernor,
    video_ids: &[String],
    now: DateTime<Utc>,
  ) -> HashMap<String, VideoStats> {
    let mut all = HashMap::new();
    for chunk in video_ids.chunks(50) {
      match self.get_video_stats(governor, chunk, now).await {
        Ok(results) => all.extend(results),
        Err(e) if e.is_quota_exceeded() => break,
        Err(_) => continue,
      }
    }
    all
  }

  pub async fn get_channel_info(
    &self,
    governor: &mut QuotaGovernor,
    channel_ids: &[String],
    now: DateTime<Utc>,
  ) -> Result<HashMap<String, ChannelInfo>, Error> {
    if channel_ids.is_empty() {
      return Ok(HashMap::new());
    }

    governor.consume(QuotaCost::Low, now)?;

    let url = format!(
      "{}/channels?key={}&part=snippet,statistics&id={}",
      self.base_url,
      self.api_key,
      channel_ids.join(",")
    );
    let data = get_json_with_retry(&url).await?;
    let items = data.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    let mut out = HashMap::new();
    for item in items {
      let Some(channel_id) = item.get("id").and_then(|v| v.as_str()) else {
        continue;
      };
      let snippet = item.get("snippet").cloned().unwrap_or_else(|| serde_json::json!({}));
      let stats = item.get("statistics").cloned().unwrap_or_else(|| serde_json::json!({}));

      let hidden = stats.get("hiddenSubscriberCount").and_then(|v| v.as_bool()).unwrap_or(false);
      let subscriber_count = if hidden {
        None
      } else {
        stats
          .get("subscriberCount")
          .and_then(|v| v.as_str())
          .and_then(|s| s.parse::<i64>().ok())
          .filter(|v| *v > 0)
      };

      out.insert(
        channel_id.to_string(),
        ChannelInfo {
          title: snippet.get("title").and_then(|v| v.as_str()).unwrap_or("").to_string(),
          subscriber_count,
          video_count: stats
            .get("videoCount")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|v| *v > 0),
          published_at: snippet
            .get("publishedAt")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(&s.replace('Z', "+00:00")).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        },
      );
    }

    Ok(out)
  }

  pub async fn get_channel_info_batched(
    &self,
    governor: &mut QuotaGovernor,
    channel_ids: &[String],
    now: DateTime<Utc>,
  ) -> HashMap<String, ChannelInfo> {
    let mut seen = std::collections::HashSet::new();
    let unique: Vec<String> = channel_ids.iter().filter(|id| seen.insert((*id).clone())).cloned().collect();

    let mut all = HashMap::new();
    for chunk in unique.chunks(50) {
      match self.get_channel_info(governor, chunk, now).await {
        Ok(results) => all.extend(results),
        Err(e) if e.is_quota_exceeded() => break,
        Err(_) => continue,
      }
    }
    all
  }

  /// Zero-cost: reads the platform's public per-channel feed document.
  pub async fn fetch_channel_feed(&self, channel_id: &str) -> Result<Vec<rss::FeedVideo>, Error> {
    let url = rss::feed_url(channel_id);
    let xml = fetch_text(&url).await.unwrap_or_default();
    Ok(rss::parse_feed(channel_id, &xml))
  }
}

async fn fetch_text(url: &str) -> Result<String, Error> {
  let client = https_client()?;
  let req = Request::builder()
    .method(Method::GET)
    .uri(url)
    .header(ACCEPT, "application/xml")
    .body(Empty::<Bytes>::new())
    .map_err(|e| Error::platform(e.to_string()))?;

  let resp = client.request(req).await?;
  let status = resp.status();
  let body_bytes = resp.into_body().collect().await.map_err(Error::from)?.to_bytes();

  if status != StatusCode::OK {
    return Err(Error::platform(format!("feed HTTP {}", status.as_u16())));
  }

  Ok(String::from_utf8_lossy(&body_bytes).to_string())
}

/// Minimal query-string escaping sufficient for search terms (spaces,
/// ampersands); this worker never sends raw user-controlled HTML.
fn urlencoding_lite(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for b in input.bytes() {
    match b {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
      b' ' => out.push('+'),
      _ => out.push_str(&format!("%{:02X}", b)),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duration_parser_handles_hours_minutes_seconds() {
    assert_eq!(parse_iso8601_duration("PT1H30M"), Some(5400));
    assert_eq!(parse_iso8601_duration("PT5M30S"), Some(330));
    assert_eq!(parse_iso8601_duration("PT30S"), Some(30));
  }

  #[test]
  fn duration_parser_rejects_empty_and_malformed_input() {
    assert_eq!(parse_iso8601_duration(""), None);
    assert_eq!(parse_iso8601_duration("PT"), None);
    assert_eq!(parse_iso8601_duration("not-a-duration"), None);
    assert_eq!(parse_iso8601_duration("1H30M"), None);
  }

  #[test]
  fn query_escaping_handles_spaces_and_reserved_chars() {
    assert_eq!(urlencoding_lite("how to bake"), "how+to+bake");
    assert_eq!(urlencoding_lite("a&b"), "a%26b");
  }

  use bytes::Bytes as MockBytes;
  use http_body_util::Full;
  use hyper::body::Incoming;
  use hyper::server::conn::http1;
  use hyper::service::service_fn;
  use hyper::{Request as MockRequest, Response};
  use hyper_util::rt::TokioIo;
  use tokio::net::TcpListener;

  async fn serve_one(listener: TcpListener, status: StatusCode, body: &'static str) {
    let (stream, _) = listener.accept().await.unwrap();
    let io = TokioIo::new(stream);
    http1::Builder::new()
      .serve_connection(
        io,
        service_fn(move |_req: MockRequest<Incoming>| async move {
          Ok::<_, hyper::Error>(Response::builder().status(status).body(Full::new(MockBytes::from(body))).unwrap())
        }),
      )
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn search_videos_parses_mock_server_response() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    let body = r#"{
      "items": [
        {
          "id": {"videoId": "abc123"},
          "snippet": {
            "channelId": "UCxyz",
            "channelTitle": "Test Channel",
            "title": "How to bake bread",
            "publishedAt": "2024-01-01T00:00:00Z",
            "thumbnails": {"high": {"url": "https://example.com/t.jpg"}}
          }
        }
      ]
    }"#;
    let task = tokio::spawn(serve_one(listener, StatusCode::OK, body));

    let client = PlatformClient::with_base_url("test-key", base_url);
    let mut governor = QuotaGovernor::new(10_000, 0.1);
    let now = Utc::now();

    let results = client.search_videos(&mut governor, "bread", 10, None, "date", now).await.unwrap();

    task.await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].video_id, "abc123");
    assert_eq!(results[0].channel_id, "UCxyz");
    assert_eq!(results[0].title, "How to bake bread");
    assert_eq!(results[0].thumbnail_url.as_deref(), Some("https://example.com/t.jpg"));
  }

  #[tokio::test]
  async fn get_video_stats_parses_mock_server_response() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    let body = r#"{
      "items": [
        {
          "id": "abc123",
          "statistics": {"viewCount": "4200", "likeCount": "10", "commentCount": "2"},
          "contentDetails": {"duration": "PT5M30S"}
        }
      ]
    }"#;
    let task = tokio::spawn(serve_one(listener, StatusCode::OK, body));

    let client = PlatformClient::with_base_url("test-key", base_url);
    let mut governor = QuotaGovernor::new(10_000, 0.1);
    let now = Utc::now();

    let stats = client.get_video_stats(&mut governor, &["abc123".to_string()], now).await.unwrap();

    task.await.unwrap();

    let s = stats.get("abc123").unwrap();
    assert_eq!(s.view_count, 4200);
    assert_eq!(s.like_count, Some(10));
    assert_eq!(s.duration_seconds, Some(330));
  }

  #[tokio::test]
  async fn get_json_with_retry_returns_quota_exceeded_on_403_reason() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{addr}/videos");

    let body = r#"{"error":{"errors":[{"reason":"quotaExceeded"}]}}"#;
    let task = tokio::spawn(serve_one(listener, StatusCode::FORBIDDEN, body));

    let result = get_json_with_retry(&url).await;

    task.await.unwrap();

    match result {
      Err(e) => assert!(e.is_quota_exceeded()),
      Ok(_) => panic!("expected quota exceeded error"),
    }
  }
}

//! Free-feed (Atom + media RSS) parser. Reads a channel's public video feed,
//! which carries no platform quota cost, and extracts up to ~15 recent
//! videos. Grounded on the worker's RSS client, translated from
//! `xml.etree.ElementTree` to `quick_xml`'s pull-parser style.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

#[derive(Debug, Clone)]
pub struct FeedVideo {
  pub video_id: String,
  pub title: String,
  pub channel_id: String,
  pub channel_title: String,
  pub published_at: DateTime<Utc>,
  pub thumbnail_url: Option<String>,
  pub view_count: Option<i64>,
}

#[derive(Debug, Default)]
struct EntryBuilder {
  video_id: Option<String>,
  title: Option<String>,
  published: Option<String>,
  thumbnail_url: Option<String>,
  view_count: Option<i64>,
}

/// Parses one channel feed document (atom root, `media:group` per entry).
/// Malformed entries are skipped rather than failing the whole parse, per
/// the worker's per-entry try/except; a malformed document returns an
/// empty list rather than an error, matching the zero-cost, best-effort
/// nature of this feeder.
pub fn parse_feed(channel_id: &str, xml: &str) -> Vec<FeedVideo> {
  let mut reader = Reader::from_str(xml);
  reader.config_mut().trim_text(true);

  let mut channel_title = String::from("Unknown Channel");
  let mut videos = Vec::new();

  let mut in_feed_title = false;
  let mut in_entry = false;
  let mut entry = EntryBuilder::default();
  let mut tag_stack: Vec<String> = Vec::new();

  loop {
    match reader.read_event() {
      Ok(Event::Eof) => break,
      Ok(Event::Start(e)) => {
        let name = local_name(e.name().as_ref());
        match name.as_str() {
          "entry" => {
            in_entry = true;
            entry = EntryBuilder::default();
          }
          "title" if !in_entry => {
            in_feed_title = true;
          }
          "thumbnail" if in_entry => {
            if let Some(url) = attr_value(&e, "url") {
              entry.thumbnail_url = Some(url);
            }
          }
          "statistics" if in_entry => {
            if let Some(views) = attr_value(&e, "views") {
              entry.view_count = views.parse::<i64>().ok();
            }
          }
          _ => {}
        }
        tag_stack.push(name);
      }
      Ok(Event::Empty(e)) => {
        let name = local_name(e.name().as_ref());
        match name.as_str() {
          "thumbnail" if in_entry => {
            if let Some(url) = attr_value(&e, "url") {
              entry.thumbnail_url = Some(url);
            }
          }
          "statistics" if in_entry => {
            if let Some(views) = attr_value(&e, "views") {
              entry.view_count = views.parse::<i64>().ok();
            }
          }
          _ => {}
        }
      }
      Ok(Event::Text(t)) => {
        let text = t.unescape().unwrap_or_default().trim().to_string();
        if text.is_empty() {
          continue;
        }
        match tag_stack.last().map(String::as_str) {
          Some("title") if in_feed_title => channel_title = text,
          Some("title") if in_entry => entry.title = Some(text),
          Some("videoId") if in_entry => entry.video_id = Some(text),
          Some("published") if in_entry => entry.published = Some(text),
          _ => {}
        }
      }
      Ok(Event::End(e)) => {
        let name = local_name(e.name().as_ref());
        if name == "entry" {
          in_entry = false;
          if let Some(video_id) = entry.video_id.clone() {
            let published_at = entry
              .published
              .as_deref()
              .and_then(parse_rfc3339_tolerant)
              .unwrap_or_else(Utc::now);
            videos.push(FeedVideo {
              video_id,
              title: entry.title.clone().unwrap_or_else(|| "Untitled".to_string()),
              channel_id: channel_id.to_string(),
              channel_title: channel_title.clone(),
              published_at,
              thumbnail_url: entry.thumbnail_url.clone(),
              view_count: entry.view_count,
            });
          }
        }
        if name == "title" {
          in_feed_title = false;
        }
        tag_stack.pop();
      }
      Ok(_) => {}
      Err(_) => break,
    }
  }

  videos
}

fn local_name(qualified: &[u8]) -> String {
  let s = String::from_utf8_lossy(qualified);
  match s.rsplit_once(':') {
    Some((_, local)) => local.to_string(),
    None => s.to_string(),
  }
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &str) -> Option<String> {
  e.attributes().filter_map(|a| a.ok()).find(|a| a.key.as_ref() == key.as_bytes()).and_then(|a| {
    a.unescape_value().ok().map(|v| v.to_string())
  })
}

fn parse_rfc3339_tolerant(value: &str) -> Option<DateTime<Utc>> {
  let normalized = value.replace('Z', "+00:00");
  DateTime::parse_from_rfc3339(&normalized)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

pub fn feed_url(channel_id: &str) -> String {
  format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}")
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
  <title>Example Channel</title>
  <entry>
    <yt:videoId>abc123</yt:videoId>
    <title>How to bake sourdough</title>
    <published>2026-07-20T12:00:00+00:00</published>
    <media:group>
      <media:thumbnail url="https://i.ytimg.com/vi/abc123/hqdefault.jpg"/>
      <media:community>
        <media:statistics views="4821"/>
      </media:community>
    </media:group>
  </entry>
  <entry>
    <yt:videoId>def456</yt:videoId>
    <title>Day in the life of a baker</title>
    <published>2026-07-18T08:30:00Z</published>
  </entry>
</feed>"#;

  #[test]
  fn parses_entries_with_thumbnail_and_view_count() {
    let videos = parse_feed("UCabc", SAMPLE_FEED);
    assert_eq!(videos.len(), 2);

    let first = &videos[0];
    assert_eq!(first.video_id, "abc123");
    assert_eq!(first.title, "How to bake sourdough");
    assert_eq!(first.channel_id, "UCabc");
    assert_eq!(first.channel_title, "Example Channel");
    assert_eq!(first.view_count, Some(4821));
    assert!(first.thumbnail_url.as_deref().unwrap().starts_with("https://"));

    let second = &videos[1];
    assert_eq!(second.video_id, "def456");
    assert_eq!(second.view_count, None);
  }

  #[test]
  fn malformed_document_yields_empty_list_not_an_error() {
    let videos = parse_feed("UCabc", "<not-xml");
    assert!(videos.is_empty());
  }

  #[test]
  fn entry_missing_video_id_is_skipped() {
    let xml = r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns="http://www.w3.org/2005/Atom">
      <title>Ch</title>
      <entry><title>No id here</title></entry>
    </feed>"#;
    assert!(parse_feed("UCabc", xml).is_empty());
  }
}

use std::{ops::Deref, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{
    error::FetchError,
    sources::{SourceKind, WatchSource},
    yt::{FeedItem, FeedProvider},
};

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap());

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<yt:videoId>([^<]+)</yt:videoId>").unwrap());

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<title>([^<]*)</title>").unwrap());

static PUBLISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<published>([^<]+)</published>").unwrap());

/// Feed provider backed by YouTube's public RSS endpoint, which serves both
/// channel and playlist feeds without an API key.
pub struct RssFeedClient(pub reqwest::Client);

impl Default for RssFeedClient {
    fn default() -> Self {
        RssFeedClient(reqwest::Client::new())
    }
}

impl Deref for RssFeedClient {
    type Target = reqwest::Client;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl RssFeedClient {
    const FEED_URL: &'static str = "https://www.youtube.com/feeds/videos.xml";
}

impl FeedProvider for RssFeedClient {
    #[tracing::instrument(skip(self, source), fields(source_id = %source.id))]
    async fn latest_items(
        &self,
        source: &WatchSource,
        limit: usize,
    ) -> Result<Vec<FeedItem>, FetchError> {
        let param = match source.kind {
            SourceKind::Channel => "channel_id",
            SourceKind::Playlist => "playlist_id",
        };

        let resp = self
            .get(Self::FEED_URL)
            .query(&[(param, source.id.as_str())])
            .send()
            .await?;

        match resp.status().as_u16() {
            429 => return Err(FetchError::Blocked),
            404 => {
                return Err(FetchError::Retrieval(format!(
                    "no feed found for {param}={}",
                    source.id
                )))
            }
            status if status >= 400 => {
                return Err(FetchError::Retrieval(format!(
                    "feed request failed with status {status}"
                )))
            }
            _ => {}
        }

        let xml = resp.text().await?;
        Ok(parse_feed(&xml, limit))
    }
}

/// Parses feed entries in document order (newest first) into items,
/// truncating to `limit`. Entries without a video id are skipped.
pub(crate) fn parse_feed(xml: &str, limit: usize) -> Vec<FeedItem> {
    ENTRY_RE
        .captures_iter(xml)
        .filter_map(|entry| {
            let body = entry.get(1)?.as_str();
            let id = VIDEO_ID_RE.captures(body)?.get(1)?.as_str().to_string();
            let title = TITLE_RE
                .captures(body)
                .and_then(|cap| cap.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let published_at = PUBLISHED_RE
                .captures(body)
                .and_then(|cap| cap.get(1))
                .and_then(|m| DateTime::parse_from_rfc3339(m.as_str()).ok())
                .map(|dt| dt.with_timezone(&Utc));

            Some(FeedItem {
                url: format!("https://www.youtube.com/watch?v={id}"),
                id,
                title,
                published_at,
            })
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns="http://www.w3.org/2005/Atom">
  <title>Channel uploads</title>
  <entry>
    <id>yt:video:aaaaaaaaaa1</id>
    <yt:videoId>aaaaaaaaaa1</yt:videoId>
    <title>Newest upload</title>
    <published>2026-08-29T10:00:00+00:00</published>
  </entry>
  <entry>
    <id>yt:video:aaaaaaaaaa2</id>
    <yt:videoId>aaaaaaaaaa2</yt:videoId>
    <title>Older upload</title>
    <published>2026-08-28T10:00:00+00:00</published>
  </entry>
  <entry>
    <id>yt:video:aaaaaaaaaa3</id>
    <yt:videoId>aaaaaaaaaa3</yt:videoId>
    <title>Oldest upload</title>
    <published>2026-08-27T10:00:00+00:00</published>
  </entry>
</feed>"#;

    #[test]
    fn parses_entries_newest_first() {
        let items = parse_feed(FEED, 5);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, "aaaaaaaaaa1");
        assert_eq!(items[0].title, "Newest upload");
        assert_eq!(
            items[0].url,
            "https://www.youtube.com/watch?v=aaaaaaaaaa1"
        );
        assert!(items[0].published_at.is_some());
        assert_eq!(items[2].id, "aaaaaaaaaa3");
    }

    #[test]
    fn respects_the_limit() {
        let items = parse_feed(FEED, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, "aaaaaaaaaa2");
    }

    #[test]
    fn skips_entries_without_video_id() {
        let xml = "<entry><title>broken</title></entry>";
        assert!(parse_feed(xml, 5).is_empty());
    }
}

pub mod feed;
pub mod transcript;

use std::{future::Future, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{error::FetchError, sources::WatchSource};

/// Fetches the full plain-text transcript of a video.
pub trait TranscriptProvider {
    fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> impl Future<Output = Result<String, FetchError>>;
}

/// Lists the most recent uploads of a watched channel or playlist, newest
/// first.
pub trait FeedProvider {
    fn latest_items(
        &self,
        source: &WatchSource,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<FeedItem>, FetchError>>;
}

#[derive(Debug, Clone)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
}

static BARE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

static URL_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtu\.be/|[?&]v=|/embed/|/v/|/live/|/shorts/)([A-Za-z0-9_-]{11})").unwrap()
});

/// Extracts a video id from the URL shapes YouTube uses (`youtu.be/<id>`,
/// `watch?v=<id>`, `/embed/`, `/v/`, `/live/`, `/shorts/`) or accepts a bare
/// 11-character id.
pub fn parse_video_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if BARE_ID_RE.is_match(trimmed) {
        return Some(trimmed.to_string());
    }
    URL_ID_RE
        .captures(trimmed)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

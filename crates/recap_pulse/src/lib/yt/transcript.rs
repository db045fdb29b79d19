use std::{ops::Deref, sync::LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::{error::FetchError, yt::TranscriptProvider};

static CAPTION_TRACKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""captionTracks":(\[.*?\])"#).unwrap());

static TEXT_NODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").unwrap());

/// Transcript provider backed by YouTube's caption tracks: scrapes the watch
/// page for the `captionTracks` player metadata, fetches the first track's
/// timedtext document and flattens it to plain text.
pub struct TimedTextClient(pub reqwest::Client);

impl Default for TimedTextClient {
    fn default() -> Self {
        TimedTextClient(reqwest::Client::new())
    }
}

impl Deref for TimedTextClient {
    type Target = reqwest::Client;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TimedTextClient {
    const WATCH_URL: &'static str = "https://www.youtube.com/watch";

    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, FetchError> {
        let resp = self
            .get(Self::WATCH_URL)
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        if resp.status().as_u16() == 429 {
            return Err(FetchError::Blocked);
        }
        Ok(resp.text().await?)
    }
}

/// Resolves the first caption track URL out of a watch page, mapping the
/// page's failure shapes onto the fetch error kinds.
fn first_track_url(page: &str, video_id: &str) -> Result<String, FetchError> {
    if page.contains("g-recaptcha") {
        return Err(FetchError::Blocked);
    }
    if page.contains(r#""status":"ERROR""#) || page.contains(r#""status":"UNPLAYABLE""#) {
        return Err(FetchError::VideoUnavailable {
            video_id: video_id.to_string(),
        });
    }

    let Some(raw_tracks) = CAPTION_TRACKS_RE
        .captures(page)
        .and_then(|cap| cap.get(1))
    else {
        // The player metadata distinguishes "captions turned off" from
        // "nothing uploaded": with captions disabled the tracklist renderer
        // is absent entirely.
        return Err(if page.contains("playerCaptionsTracklistRenderer") {
            FetchError::NoTranscriptFound {
                video_id: video_id.to_string(),
            }
        } else {
            FetchError::TranscriptsDisabled {
                video_id: video_id.to_string(),
            }
        });
    };

    let tracks: Value = serde_json::from_str(raw_tracks.as_str()).map_err(|e| {
        FetchError::Retrieval(format!("caption track metadata was not valid JSON: {e}"))
    })?;

    let base_url = tracks
        .get(0)
        .and_then(|track| track["baseUrl"].as_str())
        .ok_or_else(|| FetchError::NoTranscriptFound {
            video_id: video_id.to_string(),
        })?;

    // the URL is embedded in a JSON string, so ampersands arrive escaped
    Ok(base_url.replace("\\u0026", "&"))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

impl TranscriptProvider for TimedTextClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, FetchError> {
        let page = self.fetch_watch_page(video_id).await?;
        let track_url = first_track_url(&page, video_id)?;

        let xml = self.get(&track_url).send().await?.text().await?;

        let snippets: Vec<String> = TEXT_NODE_RE
            .captures_iter(&xml)
            .map(|cap| decode_entities(cap[1].trim()))
            .filter(|snippet| !snippet.is_empty())
            .collect();

        if snippets.is_empty() {
            return Err(FetchError::NoTranscriptFound {
                video_id: video_id.to_string(),
            });
        }
        Ok(snippets.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_track_url() {
        let page = r#"..."captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en","languageCode":"en"}]}}..."#;
        let url = first_track_url(page, "abc").unwrap();
        assert_eq!(url, "https://www.youtube.com/api/timedtext?v=abc&lang=en");
    }

    #[test]
    fn missing_tracklist_maps_to_disabled() {
        let result = first_track_url("<html>no captions here</html>", "abc");
        assert!(matches!(
            result,
            Err(FetchError::TranscriptsDisabled { .. })
        ));
    }

    #[test]
    fn empty_track_list_maps_to_not_found() {
        let page = r#""playerCaptionsTracklistRenderer":{"captionTracks":[]}"#;
        let result = first_track_url(page, "abc");
        assert!(matches!(result, Err(FetchError::NoTranscriptFound { .. })));
    }

    #[test]
    fn unplayable_page_maps_to_unavailable() {
        let page = r#""playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}"#;
        let result = first_track_url(page, "abc");
        assert!(matches!(result, Err(FetchError::VideoUnavailable { .. })));
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(
            decode_entities("Tom &amp; Jerry &#39;live&#39; &lt;now&gt;"),
            "Tom & Jerry 'live' <now>"
        );
    }
}

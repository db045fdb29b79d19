/// Failure kinds observed when fetching transcripts or feed metadata.
///
/// Callers match on the kind: interactive use surfaces it and stops the
/// current request, the monitor logs it and moves on to the next item.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transcripts are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error("no transcript found for video {video_id}")]
    NoTranscriptFound { video_id: String },

    #[error("transcript for video {video_id} cannot be translated")]
    NotTranslatable { video_id: String },

    #[error("video {video_id} is unavailable")]
    VideoUnavailable { video_id: String },

    #[error("the provider blocked this request (rate limit or IP block)")]
    Blocked,

    #[error("failed to retrieve data: {0}")]
    Retrieval(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
